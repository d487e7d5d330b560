//! Error types for the collector host runtime.
//!
//! One error enum is shared by every library crate in the workspace. Guest
//! conditions that the bridge treats as normal control flow (an absent
//! instance, a rejected promise) are not represented here.
//!
//! # Examples
//!
//! ```
//! use collector_core::{Error, Result};
//!
//! fn check_entry(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(Error::InvalidArgument("entry point cannot be empty".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_entry("").unwrap_err();
//! assert!(err.is_invalid_argument());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the collector host runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// Wasmtime engine, compilation, instantiation or trap failure.
    #[error("WASM error: {message}")]
    WasmError {
        /// Description of the failure
        message: String,
    },

    /// The guest does not export something the host depends on.
    ///
    /// Raised at settlement time when `onPromiseCompleted` or `memory` is
    /// missing. Not recovered by the bridge.
    #[error("Guest export not found: {name}")]
    MissingExport {
        /// Name of the missing export
        name: String,
    },

    /// Out-of-bounds or otherwise invalid access to guest memory.
    #[error("Invalid guest memory access at {address}: {message}")]
    GuestMemory {
        /// Guest address of the access
        address: u32,
        /// Description of the failure
        message: String,
    },

    /// A promise id is already occupied in the value table.
    #[error("Promise id already registered: {id}")]
    DuplicatePromise {
        /// The occupied id
        id: u32,
    },

    /// Timeout error.
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// Name of the operation that timed out
        operation: String,
        /// Duration in milliseconds before timeout occurred
        duration_ms: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system error with the path that caused it.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An external executable is not on `PATH`.
    #[error("{tool} was not found in $PATH")]
    ToolNotFound {
        /// Executable name
        tool: String,
    },

    /// `git rev-parse --show-toplevel` produced no root.
    #[error("no git root")]
    GitRootNotFound,
}

impl Error {
    /// Returns `true` if this is a wasm engine or guest trap error.
    #[must_use]
    pub const fn is_wasm_error(&self) -> bool {
        matches!(self, Self::WasmError { .. })
    }

    /// Returns `true` if the guest is missing a required export.
    ///
    /// # Examples
    ///
    /// ```
    /// use collector_core::Error;
    ///
    /// let err = Error::MissingExport {
    ///     name: "onPromiseCompleted".to_string(),
    /// };
    /// assert!(err.is_missing_export());
    /// ```
    #[must_use]
    pub const fn is_missing_export(&self) -> bool {
        matches!(self, Self::MissingExport { .. })
    }

    /// Returns `true` if this is a guest memory access error.
    #[must_use]
    pub const fn is_guest_memory_error(&self) -> bool {
        matches!(self, Self::GuestMemory { .. })
    }

    /// Returns `true` if this is a timeout error.
    ///
    /// # Examples
    ///
    /// ```
    /// use collector_core::Error;
    ///
    /// let err = Error::Timeout {
    ///     operation: "settle".to_string(),
    ///     duration_ms: 500,
    /// };
    /// assert!(err.is_timeout());
    /// ```
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns `true` if this is an invalid argument error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns `true` if an external tool could not be located.
    #[must_use]
    pub const fn is_tool_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }
}

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, Error>;
