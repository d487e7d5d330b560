//! Collector CLI library.
//!
//! Exposes the argument definitions, command handlers and formatters of the
//! `collector` binary so they can be tested.

#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod actions;
pub mod cli;
pub mod commands;
pub mod fixture;
pub mod formatters;
pub mod runner;

pub use actions::ConfigAction;
