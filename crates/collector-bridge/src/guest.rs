//! Lifecycle of the guest instance handle.

/// Presence of the guest instance, as seen by the bridge.
///
/// Guest exports are reachable only through [`GuestState::get`], which
/// returns `Some` in the `Ready` state alone.
///
/// # Examples
///
/// ```
/// use collector_bridge::GuestState;
///
/// let mut state = GuestState::Uninitialized;
/// assert!(state.get().is_none());
///
/// state = GuestState::Ready("instance");
/// assert_eq!(state.get(), Some(&"instance"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuestState<G> {
    /// Instantiation has not finished.
    #[default]
    Uninitialized,
    /// The guest is instantiated and its exports may be called.
    Ready(G),
    /// The guest was torn down; it must not be called again.
    TornDown,
}

impl<G> GuestState<G> {
    /// Returns the instance handle if the guest is ready.
    #[must_use]
    pub const fn get(&self) -> Option<&G> {
        match self {
            Self::Ready(handle) => Some(handle),
            Self::Uninitialized | Self::TornDown => None,
        }
    }

    /// Returns `true` in the `Ready` state.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Lowercase name of the state, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready(_) => "ready",
            Self::TornDown => "torn-down",
        }
    }
}
