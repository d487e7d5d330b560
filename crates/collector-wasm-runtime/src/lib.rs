//! Wasmtime host for the collector-web guest.
//!
//! Instantiates the guest with the `collector-web` import module, attaches
//! it to a [`collector_bridge::PromiseBridge`], and drives settled host
//! promises back into the guest through `onPromiseCompleted`.

#![warn(missing_docs, missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod epoch;
pub mod host_functions;
pub mod runtime;
pub mod session;

pub use config::RuntimeConfig;
pub use runtime::{ExecutionReport, Runtime};
pub use session::GuestSession;
