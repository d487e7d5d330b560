//! Runtime limits for hosting the guest.
//!
//! # Examples
//!
//! ```
//! use collector_wasm_runtime::config::RuntimeConfig;
//! use std::time::Duration;
//!
//! let config = RuntimeConfig::builder()
//!     .memory_limit_mb(16)
//!     .settle_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.memory_limit_bytes(), 16 * 1024 * 1024);
//! assert!(config.validate().is_ok());
//! ```

use collector_core::{Error, Result};
use std::time::Duration;

/// Limits applied to each guest session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum linear memory for the guest, in MB
    memory_limit_mb: usize,

    /// Maximum time for the entry-point call
    entry_timeout: Duration,

    /// Maximum time to wait for awaiting promises to settle
    settle_timeout: Duration,

    /// Number of compiled modules kept in the cache
    module_cache_capacity: usize,
}

impl RuntimeConfig {
    /// Default memory limit: 64MB
    pub const DEFAULT_MEMORY_LIMIT_MB: usize = 64;

    /// Default entry-point timeout: 30 seconds
    pub const DEFAULT_ENTRY_TIMEOUT_SECS: u64 = 30;

    /// Default settle timeout: 30 seconds
    pub const DEFAULT_SETTLE_TIMEOUT_SECS: u64 = 30;

    /// Default module cache capacity
    pub const DEFAULT_CACHE_CAPACITY: usize = 32;

    /// Creates a new configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Returns the memory limit in bytes.
    #[inline]
    #[must_use]
    pub const fn memory_limit_bytes(&self) -> usize {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }

    /// Returns the entry-point timeout.
    #[inline]
    #[must_use]
    pub const fn entry_timeout(&self) -> Duration {
        self.entry_timeout
    }

    /// Returns the settle timeout.
    #[inline]
    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        self.settle_timeout
    }

    /// Returns the module cache capacity.
    #[inline]
    #[must_use]
    pub const fn module_cache_capacity(&self) -> usize {
        self.module_cache_capacity
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if any limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.memory_limit_mb == 0 {
            return Err(Error::ConfigError {
                message: "memory limit must be greater than zero".to_string(),
            });
        }
        if self.entry_timeout.is_zero() {
            return Err(Error::ConfigError {
                message: "entry timeout must be greater than zero".to_string(),
            });
        }
        if self.settle_timeout.is_zero() {
            return Err(Error::ConfigError {
                message: "settle timeout must be greater than zero".to_string(),
            });
        }
        if self.module_cache_capacity == 0 {
            return Err(Error::ConfigError {
                message: "module cache capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: Self::DEFAULT_MEMORY_LIMIT_MB,
            entry_timeout: Duration::from_secs(Self::DEFAULT_ENTRY_TIMEOUT_SECS),
            settle_timeout: Duration::from_secs(Self::DEFAULT_SETTLE_TIMEOUT_SECS),
            module_cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Builder for [`RuntimeConfig`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Sets the guest memory limit in MB.
    #[must_use]
    pub const fn memory_limit_mb(mut self, mb: usize) -> Self {
        self.config.memory_limit_mb = mb;
        self
    }

    /// Sets the entry-point timeout.
    #[must_use]
    pub const fn entry_timeout(mut self, timeout: Duration) -> Self {
        self.config.entry_timeout = timeout;
        self
    }

    /// Sets how long awaiting promises may take to settle.
    #[must_use]
    pub const fn settle_timeout(mut self, timeout: Duration) -> Self {
        self.config.settle_timeout = timeout;
        self
    }

    /// Sets the compiled-module cache capacity.
    #[must_use]
    pub const fn module_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.module_cache_capacity = capacity;
        self
    }

    /// Builds the configuration. Call [`RuntimeConfig::validate`] to check it.
    #[must_use]
    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
