//! Delivery of settled promises to the guest.
//!
//! [`GuestBinding`] is the seam between the protocol and whatever embeds the
//! guest. The wasm runtime implements it over a `wasmtime::Store`; tests
//! implement it with a recorder.

use crate::bridge::{PromiseBridge, Settled};
use crate::promise::Outcome;
use async_trait::async_trait;
use collector_core::{OutSlot, PromiseId, Result};
use serde_json::Value;

/// Access to the bridge and to the guest's side of the value protocol.
#[async_trait]
pub trait GuestBinding: Send {
    /// Handle of a ready guest instance.
    type Handle: Clone + Send + Sync + 'static;

    /// The bridge this binding drives.
    fn bridge(&mut self) -> &mut PromiseBridge<Self::Handle>;

    /// Makes `value` visible to the guest at `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if guest memory cannot be written.
    fn store_value(&mut self, guest: &Self::Handle, slot: OutSlot, value: Value) -> Result<()>;

    /// Calls the guest export `onPromiseCompleted(id, success)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the export is missing or traps.
    async fn on_promise_completed(
        &mut self,
        guest: &Self::Handle,
        id: PromiseId,
        success: bool,
    ) -> Result<()>;
}

/// What [`complete`] did with a settled promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Value stored, then the guest was signaled.
    Signaled {
        /// The flag passed to `onPromiseCompleted`
        success: bool,
    },
    /// The guest was gone at settlement time; nothing was touched.
    Dropped,
}

/// Delivers one settled promise.
///
/// Fulfillment and rejection share this path: the value (or reason) is
/// stored at the slot, then the guest is signaled with the success flag.
/// Guest presence is checked again here, not only at `startAwaiting` time.
///
/// The promise counts as completed only once the signal returns. If
/// storage or the signal fails it is marked `Failed` instead.
///
/// # Errors
///
/// Storage and signaling errors propagate unchanged.
pub async fn complete<B>(binding: &mut B, settled: Settled) -> Result<Delivery>
where
    B: GuestBinding + ?Sized,
{
    let Settled { id, slot, outcome } = settled;

    let Some(guest) = binding.bridge().guest().cloned() else {
        tracing::warn!("Promise {} settled after guest teardown, result dropped", id);
        binding.bridge().mark_dropped(id);
        return Ok(Delivery::Dropped);
    };

    let success = outcome.is_fulfilled();
    if let Err(err) = deliver(binding, &guest, id, slot, outcome).await {
        tracing::warn!("Delivery of promise {} failed: {}", id, err);
        binding.bridge().mark_failed(id);
        return Err(err);
    }
    binding.bridge().mark_completed(id, success);

    Ok(Delivery::Signaled { success })
}

async fn deliver<B>(
    binding: &mut B,
    guest: &B::Handle,
    id: PromiseId,
    slot: OutSlot,
    outcome: Outcome,
) -> Result<()>
where
    B: GuestBinding + ?Sized,
{
    let success = outcome.is_fulfilled();
    binding.store_value(guest, slot, outcome.into_value())?;

    tracing::debug!("Signaling onPromiseCompleted({}, {})", id, success);
    binding.on_promise_completed(guest, id, success).await
}

/// Completes settled promises until none are awaiting.
///
/// Returns the number of settlements processed, dropped ones included.
///
/// # Errors
///
/// Stops at the first delivery error.
pub async fn run_until_idle<B>(binding: &mut B) -> Result<usize>
where
    B: GuestBinding + ?Sized,
{
    let mut processed = 0;
    loop {
        let Some(settled) = binding.bridge().next_settled().await else {
            break;
        };
        complete(binding, settled).await?;
        processed += 1;
    }
    Ok(processed)
}
