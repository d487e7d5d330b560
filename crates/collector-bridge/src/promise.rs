//! Host-side promises and their settled outcome.

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Settled state of a host promise.
///
/// Both variants carry a value that is stored the same way; only the
/// `success` flag handed to the guest tells them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation produced a value.
    Fulfilled(Value),
    /// The operation failed with a reason.
    Rejected(Value),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Fulfilled`].
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Returns the carried value or reason.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Fulfilled(value) | Self::Rejected(value) => value,
        }
    }

    /// Consumes the outcome, returning the carried value or reason.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Fulfilled(value) | Self::Rejected(value) => value,
        }
    }
}

impl From<Result<Value, Value>> for Outcome {
    fn from(result: Result<Value, Value>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}

/// A single-resolution host asynchronous operation.
///
/// Wraps any `Send` future producing `Result<Value, Value>`. The future is
/// polled only after the guest starts awaiting it, and at most once to
/// completion.
///
/// # Examples
///
/// ```
/// use collector_bridge::{HostPromise, Outcome};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let promise = HostPromise::new(async { Err(json!("boom")) });
/// assert_eq!(promise.await, Outcome::Rejected(json!("boom")));
/// # });
/// ```
pub struct HostPromise(BoxFuture<'static, Outcome>);

impl HostPromise {
    /// Wraps a future as a host promise.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Self(future.map(Outcome::from).boxed())
    }

    /// A promise that is already fulfilled with `value`.
    #[must_use]
    pub fn resolved(value: Value) -> Self {
        Self::new(future::ready(Ok(value)))
    }

    /// A promise that is already rejected with `reason`.
    #[must_use]
    pub fn rejected(reason: Value) -> Self {
        Self::new(future::ready(Err(reason)))
    }
}

impl Future for HostPromise {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        self.0.as_mut().poll(cx)
    }
}

impl fmt::Debug for HostPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPromise").finish_non_exhaustive()
    }
}
