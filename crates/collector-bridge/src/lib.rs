//! Promise bridge between a host event loop and a WASM guest.
//!
//! A guest cannot await a host future directly. Instead it calls the
//! `startAwaiting(promiseId, outSlot)` import and returns; once the host
//! future settles, the bridge stores the result handle at `outSlot` and then
//! calls the guest export `onPromiseCompleted(promiseId, success)`.
//!
//! This crate holds the runtime-agnostic half of that protocol:
//!
//! - [`ValueTable`] - shared table of marshaled values and pending promises
//! - [`GuestState`] - explicit `Uninitialized -> Ready -> TornDown` lifecycle
//! - [`PromiseBridge`] - the awaiting set and per-promise state machine
//! - [`GuestBinding`], [`complete`], [`run_until_idle`] - delivery of settled
//!   promises through whatever embeds the guest
//!
//! # Examples
//!
//! ```
//! use collector_bridge::{HostPromise, PromiseBridge, StartOutcome};
//! use collector_core::{OutSlot, PromiseId};
//! use serde_json::json;
//!
//! let mut bridge: PromiseBridge<()> = PromiseBridge::new();
//! let id = bridge.register_promise(HostPromise::resolved(json!("ok")));
//!
//! // Before the guest is attached, awaiting is a silent no-op.
//! assert_eq!(bridge.start_awaiting(id, OutSlot::new(100)), StartOutcome::InstanceAbsent);
//!
//! bridge.attach(()).unwrap();
//! assert_eq!(bridge.start_awaiting(id, OutSlot::new(100)), StartOutcome::Awaiting);
//! assert_eq!(bridge.pending(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod binding;
mod bridge;
mod guest;
mod promise;
mod value_table;

pub use binding::{Delivery, GuestBinding, complete, run_until_idle};
pub use bridge::{BridgeStats, PromiseBridge, PromiseState, Settled, StartOutcome};
pub use guest::GuestState;
pub use promise::{HostPromise, Outcome};
pub use value_table::ValueTable;
