//! Host functions exposed to the guest.
//!
//! All imports live in the `collector-web` module:
//!
//! | Import | Signature |
//! |---|---|
//! | `startAwaiting` | `(promiseId: i32, outSlot: i32)` |
//! | `valueLength` | `(ref: i32) -> i32` |
//! | `readValue` | `(ref: i32, ptr: i32, cap: i32) -> i32` |
//! | `releaseValue` | `(ref: i32)` |
//! | `log` | `(ptr: i32, len: i32)` |
//!
//! Imports never trap. Invalid handles or pointers yield `-1` (or are
//! ignored for imports without a result) and are logged.

use collector_bridge::PromiseBridge;
use collector_core::{Error, OutSlot, PromiseId, Result, ValueRef};
use wasmtime::{Caller, Extern, Instance, Linker, Memory, ResourceLimiter};

/// Import module name the guest links against.
pub const IMPORT_MODULE: &str = "collector-web";

/// Guest export signaled when an awaited promise settles.
pub const ON_PROMISE_COMPLETED: &str = "onPromiseCompleted";

/// Guest memory export.
pub const MEMORY_EXPORT: &str = "memory";

/// Per-store host state.
#[derive(Debug)]
pub struct HostState {
    pub(crate) bridge: PromiseBridge<Instance>,
    pub(crate) limiter: MemoryLimiter,
}

impl HostState {
    /// Creates host state around a bridge, with a guest memory cap in bytes.
    #[must_use]
    pub const fn new(bridge: PromiseBridge<Instance>, max_memory_bytes: usize) -> Self {
        Self {
            bridge,
            limiter: MemoryLimiter { max_memory_bytes },
        }
    }
}

/// Caps guest linear memory growth.
#[derive(Debug)]
pub(crate) struct MemoryLimiter {
    max_memory_bytes: usize,
}

impl ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        if desired > self.max_memory_bytes {
            tracing::warn!(
                "Memory limit exceeded: {} > {}",
                desired,
                self.max_memory_bytes
            );
            Ok(false)
        } else {
            tracing::trace!("Memory growing: {} -> {} bytes", current, desired);
            Ok(true)
        }
    }

    fn table_growing(
        &mut self,
        _current: usize,
        _desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(true)
    }
}

/// Converts a guest pointer into a memory offset.
const fn offset(ptr: i32) -> usize {
    ptr.cast_unsigned() as usize
}

fn caller_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    let memory = caller.get_export(MEMORY_EXPORT).and_then(Extern::into_memory);
    if memory.is_none() {
        tracing::error!("WASM module has no memory export");
    }
    memory
}

/// JSON text of a table value, as the guest reads it.
fn encoded_value(caller: &Caller<'_, HostState>, handle: i32) -> Option<Vec<u8>> {
    let value = caller.data().bridge.values().value(ValueRef::from_wasm(handle))?;
    serde_json::to_vec(value).ok()
}

/// Links the `collector-web` imports into `linker`.
///
/// # Errors
///
/// Returns [`Error::WasmError`] if an import name is already defined.
pub fn link_host_functions(linker: &mut Linker<HostState>) -> Result<()> {
    linker
        .func_wrap(
            IMPORT_MODULE,
            "startAwaiting",
            |mut caller: Caller<'_, HostState>, promise_id: i32, out_slot: i32| {
                caller
                    .data_mut()
                    .bridge
                    .start_awaiting(PromiseId::from_wasm(promise_id), OutSlot::from_wasm(out_slot));
            },
        )
        .map_err(|e| link_error("startAwaiting", &e))?;

    linker
        .func_wrap(
            IMPORT_MODULE,
            "valueLength",
            |caller: Caller<'_, HostState>, handle: i32| -> i32 {
                encoded_value(&caller, handle)
                    .and_then(|bytes| i32::try_from(bytes.len()).ok())
                    .unwrap_or(-1)
            },
        )
        .map_err(|e| link_error("valueLength", &e))?;

    linker
        .func_wrap(
            IMPORT_MODULE,
            "readValue",
            |mut caller: Caller<'_, HostState>, handle: i32, ptr: i32, cap: i32| -> i32 {
                let Some(bytes) = encoded_value(&caller, handle) else {
                    tracing::debug!("readValue: unknown handle {}", handle);
                    return -1;
                };
                let Ok(len) = i32::try_from(bytes.len()) else {
                    return -1;
                };
                if len > cap {
                    tracing::debug!("readValue: buffer too small ({} < {})", cap, len);
                    return -1;
                }
                let Some(memory) = caller_memory(&mut caller) else {
                    return -1;
                };
                if let Err(e) = memory.write(&mut caller, offset(ptr), &bytes) {
                    tracing::error!("readValue: invalid memory access at {}: {}", ptr, e);
                    return -1;
                }
                len
            },
        )
        .map_err(|e| link_error("readValue", &e))?;

    linker
        .func_wrap(
            IMPORT_MODULE,
            "releaseValue",
            |mut caller: Caller<'_, HostState>, handle: i32| {
                let handle = ValueRef::from_wasm(handle);
                if !caller.data_mut().bridge.values_mut().release(handle) {
                    tracing::debug!("releaseValue: unknown handle {}", handle);
                }
            },
        )
        .map_err(|e| link_error("releaseValue", &e))?;

    linker
        .func_wrap(
            IMPORT_MODULE,
            "log",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                let Some(memory) = caller_memory(&mut caller) else {
                    return;
                };
                let data = memory.data(&caller);
                let start = offset(ptr);
                let Some(bytes) = start
                    .checked_add(offset(len))
                    .and_then(|end| data.get(start..end))
                else {
                    tracing::error!("Invalid memory access: ptr={}, len={}", ptr, len);
                    return;
                };
                match std::str::from_utf8(bytes) {
                    Ok(s) => tracing::info!("[WASM] {}", s),
                    Err(e) => tracing::error!("Invalid UTF-8 from WASM: {}", e),
                }
            },
        )
        .map_err(|e| link_error("log", &e))?;

    tracing::debug!(
        "Host functions linked: {}.{{startAwaiting, valueLength, readValue, releaseValue, log}}",
        IMPORT_MODULE
    );
    Ok(())
}

fn link_error(name: &str, e: &wasmtime::Error) -> Error {
    Error::WasmError {
        message: format!("Failed to link {IMPORT_MODULE}.{name}: {e}"),
    }
}
