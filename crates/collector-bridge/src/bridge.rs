//! Awaiting set and per-promise state machine.
//!
//! Per promise the bridge moves `Registered -> Awaiting -> Completed`.
//! `start_awaiting` only performs the first transition; the second happens
//! later, when the embedder drives [`PromiseBridge::next_settled`] and hands
//! the result to [`crate::complete`].

use crate::guest::GuestState;
use crate::promise::{HostPromise, Outcome};
use crate::value_table::ValueTable;
use collector_core::{Error, OutSlot, PromiseId, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Result of a `startAwaiting` call.
///
/// None of these are errors; the guest import returns nothing either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Continuations attached; the promise is now awaiting settlement.
    Awaiting,
    /// The guest instance is not ready. Nothing happened and the promise
    /// stays registered.
    InstanceAbsent,
    /// No pending promise under this id (never registered, or already
    /// awaited).
    UnknownPromise,
}

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    /// In the value table, not yet awaited.
    Registered,
    /// Awaited by the guest, not yet settled.
    Awaiting,
    /// Value stored and completion signaled.
    Completed,
    /// Still awaiting when the guest was torn down; never settled.
    Cancelled,
    /// Settled after the guest was torn down; result discarded.
    Dropped,
    /// Settled, but storing the value or signaling the guest failed.
    Failed,
}

/// A promise that settled and is ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    /// The awaited promise
    pub id: PromiseId,
    /// Where the guest expects the result handle
    pub slot: OutSlot,
    /// How it settled
    pub outcome: Outcome,
}

/// Bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// `startAwaiting` calls that attached continuations
    pub started: u64,
    /// Calls ignored because the guest was not ready
    pub instance_absent: u64,
    /// Calls ignored because no pending promise had the id
    pub unknown_promise: u64,
    /// Completions signaled with `success = true`
    pub fulfilled: u64,
    /// Completions signaled with `success = false`
    pub rejected: u64,
    /// Settlements discarded because the guest was gone
    pub dropped: u64,
    /// Awaiting promises cancelled by teardown
    pub cancelled: u64,
    /// Settlements whose store or signal returned an error
    pub failed: u64,
}

impl BridgeStats {
    /// Total completions signaled to the guest.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.fulfilled + self.rejected
    }
}

/// The host half of the promise protocol.
///
/// Generic over the guest handle `G` (a `wasmtime::Instance` in production,
/// `()` in tests). Owns the value table, the guest lifecycle and the set of
/// awaiting promises.
pub struct PromiseBridge<G> {
    guest: GuestState<G>,
    values: ValueTable,
    awaiting: FuturesUnordered<BoxFuture<'static, Settled>>,
    // One entry per awaited id, kept after it finishes so `state` can
    // answer for it. Lives as long as the bridge, which lives as long as
    // its guest session.
    states: HashMap<PromiseId, PromiseState>,
    stats: BridgeStats,
}

impl<G> fmt::Debug for PromiseBridge<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseBridge")
            .field("guest", &self.guest.name())
            .field("values", &self.values.len())
            .field("pending", &self.awaiting.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<G> Default for PromiseBridge<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> PromiseBridge<G> {
    /// Creates a bridge with an empty value table and no guest.
    #[must_use]
    pub fn new() -> Self {
        Self::with_values(ValueTable::new())
    }

    /// Creates a bridge over a pre-populated value table.
    #[must_use]
    pub fn with_values(values: ValueTable) -> Self {
        Self {
            guest: GuestState::Uninitialized,
            values,
            awaiting: FuturesUnordered::new(),
            states: HashMap::new(),
            stats: BridgeStats::default(),
        }
    }

    /// Marks the guest as instantiated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the guest is
    /// `Uninitialized`; the handle is written once.
    pub fn attach(&mut self, handle: G) -> Result<()> {
        if !matches!(self.guest, GuestState::Uninitialized) {
            return Err(Error::InvalidArgument(format!(
                "cannot attach guest in state {}",
                self.guest.name()
            )));
        }
        self.guest = GuestState::Ready(handle);
        tracing::debug!("Guest attached, promise bridge ready");
        Ok(())
    }

    /// Returns the guest handle if the guest is ready.
    #[must_use]
    pub const fn guest(&self) -> Option<&G> {
        self.guest.get()
    }

    /// Returns the guest lifecycle state.
    #[must_use]
    pub const fn guest_state(&self) -> &GuestState<G> {
        &self.guest
    }

    /// Shared value table.
    #[must_use]
    pub const fn values(&self) -> &ValueTable {
        &self.values
    }

    /// Mutable access to the shared value table.
    pub const fn values_mut(&mut self) -> &mut ValueTable {
        &mut self.values
    }

    /// Registers a promise under a freshly allocated id.
    pub fn register_promise(&mut self, promise: HostPromise) -> PromiseId {
        self.values.register_promise(promise)
    }

    /// Registers a promise under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// See [`ValueTable::insert_promise`].
    pub fn insert_promise(&mut self, id: PromiseId, promise: HostPromise) -> Result<()> {
        self.values.insert_promise(id, promise)
    }

    /// Handles the guest's `startAwaiting(promiseId, outSlot)` import call.
    ///
    /// Returns immediately. The promise is polled only from
    /// [`next_settled`](Self::next_settled), so even an already-resolved
    /// promise completes on a later turn of the host loop.
    pub fn start_awaiting(&mut self, id: PromiseId, slot: OutSlot) -> StartOutcome {
        if !self.guest.is_ready() {
            self.stats.instance_absent += 1;
            tracing::debug!(
                "startAwaiting({}, {}) ignored: guest {}",
                id,
                slot,
                self.guest.name()
            );
            return StartOutcome::InstanceAbsent;
        }

        let Some(promise) = self.values.take_promise(id) else {
            self.stats.unknown_promise += 1;
            tracing::warn!("startAwaiting({}, {}) ignored: no pending promise", id, slot);
            return StartOutcome::UnknownPromise;
        };

        self.awaiting.push(
            promise
                .map(move |outcome| Settled { id, slot, outcome })
                .boxed(),
        );
        self.states.insert(id, PromiseState::Awaiting);
        self.stats.started += 1;
        tracing::debug!("Awaiting promise {} into slot {}", id, slot);

        StartOutcome::Awaiting
    }

    /// Waits for the next awaiting promise to settle.
    ///
    /// Returns `None` once nothing is awaiting. Settlement order across
    /// promises is whatever order their futures finish in.
    pub async fn next_settled(&mut self) -> Option<Settled> {
        self.awaiting.next().await
    }

    /// Number of promises awaiting settlement.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.awaiting.len()
    }

    /// Lifecycle state of `id`, if the bridge has seen it.
    ///
    /// Finished promises keep their final state for the life of the bridge.
    #[must_use]
    pub fn state(&self, id: PromiseId) -> Option<PromiseState> {
        if self.values.has_promise(id) {
            return Some(PromiseState::Registered);
        }
        self.states.get(&id).copied()
    }

    /// Bridge counters.
    #[must_use]
    pub const fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Tears the guest down and cancels every awaiting promise.
    ///
    /// Cancelled futures are dropped without being polled again. Returns the
    /// number of promises cancelled.
    pub fn teardown(&mut self) -> usize {
        self.guest = GuestState::TornDown;

        let cancelled = self.awaiting.len();
        self.awaiting = FuturesUnordered::new();
        for state in self.states.values_mut() {
            if *state == PromiseState::Awaiting {
                *state = PromiseState::Cancelled;
            }
        }
        self.stats.cancelled += cancelled as u64;

        tracing::debug!("Guest torn down, {} awaiting promise(s) cancelled", cancelled);
        cancelled
    }

    pub(crate) fn mark_completed(&mut self, id: PromiseId, success: bool) {
        self.states.insert(id, PromiseState::Completed);
        if success {
            self.stats.fulfilled += 1;
        } else {
            self.stats.rejected += 1;
        }
    }

    pub(crate) fn mark_dropped(&mut self, id: PromiseId) {
        self.states.insert(id, PromiseState::Dropped);
        self.stats.dropped += 1;
    }

    pub(crate) fn mark_failed(&mut self, id: PromiseId) {
        self.states.insert(id, PromiseState::Failed);
        self.stats.failed += 1;
    }
}
