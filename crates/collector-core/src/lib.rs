//! Core types and errors for the collector host runtime.
//!
//! This crate provides the foundational types shared by the bridge, the
//! wasm host and the CLI.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong handle types (`PromiseId`, `OutSlot`, `ValueRef`)
//! - Error hierarchy with contextual information
//! - CLI value types (`ExitCode`, `OutputFormat`)

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod error;
mod types;

pub mod cli;

pub use error::{Error, Result};
pub use types::{OutSlot, PromiseId, ValueRef};
