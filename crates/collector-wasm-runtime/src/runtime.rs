//! Guest runtime using Wasmtime.
//!
//! # Examples
//!
//! ```no_run
//! use collector_bridge::{HostPromise, PromiseBridge};
//! use collector_core::PromiseId;
//! use collector_wasm_runtime::{Runtime, RuntimeConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Runtime::new(RuntimeConfig::default())?;
//!
//! let mut bridge = PromiseBridge::new();
//! bridge.insert_promise(PromiseId::new(7), HostPromise::resolved(json!("ok")))?;
//!
//! let wasm_bytes = std::fs::read("collector.wasm")?;
//! let report = runtime.execute(&wasm_bytes, "main", bridge).await?;
//! println!("settled {} promise(s)", report.settled);
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheStats, ModuleCache};
use crate::config::RuntimeConfig;
use crate::epoch::EpochTicker;
use crate::host_functions::{HostState, link_host_functions};
use crate::session::GuestSession;
use collector_bridge::{BridgeStats, PromiseBridge};
use collector_core::{Error, Result};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store, Strategy, WasmBacktraceDetails};

/// Summary of one [`Runtime::execute`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Value returned by the entry point
    pub exit_code: i32,
    /// Settlements processed after the entry point returned
    pub settled: usize,
    /// Bridge counters at the end of the run
    pub bridge: BridgeStats,
    /// Wall-clock time including settlement
    pub elapsed_ms: u64,
}

/// Wasmtime engine, linker and module cache shared by guest sessions.
///
/// # Thread Safety
///
/// `Runtime` is `Send + Sync`; each [`GuestSession`] it creates owns its
/// own store and is driven by one task at a time.
pub struct Runtime {
    engine: Engine,
    linker: Linker<HostState>,
    config: RuntimeConfig,
    module_cache: ModuleCache,
    _epoch: EpochTicker,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("module_cache", &self.module_cache)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Creates a runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the Wasmtime
    /// engine cannot be created.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let mut wasmtime_config = Config::new();
        wasmtime_config.wasm_backtrace_details(WasmBacktraceDetails::Enable);
        // Guest exports are called with `call_async` from the host loop.
        wasmtime_config.async_support(true);
        wasmtime_config.strategy(Strategy::Cranelift);
        // Lets timeouts preempt guests that never call back into the host.
        wasmtime_config.epoch_interruption(true);

        let engine = Engine::new(&wasmtime_config).map_err(|e| Error::WasmError {
            message: format!("Failed to create Wasmtime engine: {e}"),
        })?;

        let mut linker = Linker::new(&engine);
        link_host_functions(&mut linker)?;

        let capacity = NonZeroUsize::new(config.module_cache_capacity()).ok_or_else(|| {
            Error::ConfigError {
                message: "module cache capacity must be greater than zero".to_string(),
            }
        })?;

        let epoch = EpochTicker::spawn(engine.clone());

        Ok(Self {
            engine,
            linker,
            config,
            module_cache: ModuleCache::new(capacity),
            _epoch: epoch,
        })
    }

    /// Runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Module cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.module_cache.stats()
    }

    /// Compiles a module, binary or text format, reusing cached results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WasmError`] if the bytes are not a valid module.
    pub fn compile(&self, wasm_bytes: &[u8]) -> Result<Module> {
        let cache_key = ModuleCache::cache_key_for_code(wasm_bytes);
        if let Some(module) = self.module_cache.get(&cache_key) {
            tracing::debug!("Using cached WASM module: {}", cache_key.short());
            return Ok(module);
        }

        tracing::debug!("Compiling WASM module ({} bytes)", wasm_bytes.len());
        let compilation_start = Instant::now();
        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| Error::WasmError {
            message: format!("Failed to compile WASM module: {e}"),
        })?;
        tracing::info!("Module compiled in {:?}", compilation_start.elapsed());

        self.module_cache.insert(cache_key, module.clone());
        Ok(module)
    }

    /// Instantiates the guest and attaches it to `bridge`.
    ///
    /// The guest counts as present only after instantiation returns, so
    /// `startAwaiting` calls from the module's start function are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation or instantiation fails.
    pub async fn instantiate(
        &self,
        wasm_bytes: &[u8],
        bridge: PromiseBridge<Instance>,
    ) -> Result<GuestSession> {
        let module = self.compile(wasm_bytes)?;

        let mut store = Store::new(
            &self.engine,
            HostState::new(bridge, self.config.memory_limit_bytes()),
        );
        store.limiter(|data| &mut data.limiter);
        store.epoch_deadline_async_yield_and_update(1);

        let instance = self
            .linker
            .instantiate_async(&mut store, &module)
            .await
            .map_err(|e| Error::WasmError {
                message: format!("Failed to instantiate WASM module: {e}"),
            })?;
        store.data_mut().bridge.attach(instance)?;

        Ok(GuestSession::new(store))
    }

    /// Instantiates the guest, calls `entry_point`, then drives awaiting
    /// promises until none remain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the entry point or settlement exceeds
    /// its configured timeout, or any instantiation, trap or delivery error.
    /// Guest code yields at every epoch tick, so a looping entry point is
    /// cancelled too.
    pub async fn execute(
        &self,
        wasm_bytes: &[u8],
        entry_point: &str,
        bridge: PromiseBridge<Instance>,
    ) -> Result<ExecutionReport> {
        let start_time = Instant::now();
        let mut session = self.instantiate(wasm_bytes, bridge).await?;

        let entry_timeout = self.config.entry_timeout();
        let exit_code = tokio::time::timeout(entry_timeout, session.call(entry_point))
            .await
            .map_err(|_| timeout_error("WASM execution", entry_timeout))??;
        tracing::debug!("WASM function returned: {}", exit_code);

        let settle_timeout = self.config.settle_timeout();
        let settled = tokio::time::timeout(settle_timeout, session.run_until_idle())
            .await
            .map_err(|_| {
                tracing::error!(
                    "{} promise(s) still awaiting after {:?}",
                    session.promise_bridge().pending(),
                    settle_timeout
                );
                timeout_error("promise settlement", settle_timeout)
            })??;

        let elapsed = start_time.elapsed();
        tracing::info!(
            "WASM execution completed in {:?}, exit code: {}, settled: {}",
            elapsed,
            exit_code,
            settled
        );

        Ok(ExecutionReport {
            exit_code,
            settled,
            bridge: session.stats(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

fn timeout_error(operation: &str, duration: Duration) -> Error {
    tracing::error!("{} timed out after {:?}", operation, duration);
    Error::Timeout {
        operation: operation.to_string(),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}
