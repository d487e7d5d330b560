//! A live guest instance and its host event loop.

use crate::host_functions::{HostState, MEMORY_EXPORT, ON_PROMISE_COMPLETED};
use async_trait::async_trait;
use collector_bridge::{BridgeStats, GuestBinding, PromiseBridge};
use collector_core::{Error, OutSlot, PromiseId, Result, ValueRef};
use serde_json::Value;
use wasmtime::{Instance, Memory, Store};

/// One instantiated guest with its store.
///
/// The session owns the `wasmtime::Store`, so every bridge transition and
/// every guest call happens on whichever task drives the session. Nothing
/// is shared, and nothing needs a lock.
///
/// Created by [`crate::Runtime::instantiate`].
pub struct GuestSession {
    store: Store<HostState>,
}

impl std::fmt::Debug for GuestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestSession")
            .field("bridge", &self.store.data().bridge)
            .finish_non_exhaustive()
    }
}

impl GuestSession {
    pub(crate) const fn new(store: Store<HostState>) -> Self {
        Self { store }
    }

    fn instance(&self) -> Result<Instance> {
        self.store
            .data()
            .bridge
            .guest()
            .copied()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "guest is {}",
                    self.store.data().bridge.guest_state().name()
                ))
            })
    }

    fn memory(&mut self, instance: Instance) -> Result<Memory> {
        instance
            .get_memory(&mut self.store, MEMORY_EXPORT)
            .ok_or_else(|| Error::MissingExport {
                name: MEMORY_EXPORT.to_string(),
            })
    }

    /// Calls a guest export of type `() -> i32`.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest was torn down, the export is missing or
    /// has another signature, or the call traps.
    pub async fn call(&mut self, entry_point: &str) -> Result<i32> {
        let instance = self.instance()?;
        let func = instance
            .get_typed_func::<(), i32>(&mut self.store, entry_point)
            .map_err(|e| Error::WasmError {
                message: format!("Entry point '{entry_point}' not found: {e}"),
            })?;

        tracing::debug!("Calling guest export {}", entry_point);
        func.call_async(&mut self.store, ())
            .await
            .map_err(|e| Error::WasmError {
                message: format!("WASM execution failed: {e}"),
            })
    }

    /// Completes settled promises until none are awaiting.
    ///
    /// Returns the number of settlements processed.
    ///
    /// # Errors
    ///
    /// Stops at the first storage or signaling error.
    pub async fn run_until_idle(&mut self) -> Result<usize> {
        collector_bridge::run_until_idle(self).await
    }

    /// Tears the guest down, cancelling awaiting promises.
    ///
    /// Returns the number of promises cancelled. Later calls into the guest
    /// fail; later settlements are dropped.
    pub fn teardown(&mut self) -> usize {
        self.store.data_mut().bridge.teardown()
    }

    /// The promise bridge of this session.
    #[must_use]
    pub fn promise_bridge(&self) -> &PromiseBridge<Instance> {
        &self.store.data().bridge
    }

    /// Mutable access to the promise bridge, e.g. to register more promises.
    pub fn promise_bridge_mut(&mut self) -> &mut PromiseBridge<Instance> {
        &mut self.store.data_mut().bridge
    }

    /// Bridge counters.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        *self.store.data().bridge.stats()
    }

    /// Looks up a marshaled value by handle.
    #[must_use]
    pub fn value(&self, handle: ValueRef) -> Option<&Value> {
        self.store.data().bridge.values().value(handle)
    }

    /// Reads a little-endian `u32` from guest memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest is gone, exports no memory, or the
    /// address is out of bounds.
    pub fn read_u32(&mut self, address: u32) -> Result<u32> {
        let instance = self.instance()?;
        let memory = self.memory(instance)?;
        let mut buf = [0u8; 4];
        memory
            .read(&self.store, address as usize, &mut buf)
            .map_err(|e| Error::GuestMemory {
                address,
                message: e.to_string(),
            })?;
        Ok(u32::from_le_bytes(buf))
    }
}

#[async_trait]
impl GuestBinding for GuestSession {
    type Handle = Instance;

    fn bridge(&mut self) -> &mut PromiseBridge<Instance> {
        &mut self.store.data_mut().bridge
    }

    fn store_value(&mut self, guest: &Instance, slot: OutSlot, value: Value) -> Result<()> {
        let memory = self.memory(*guest)?;
        let handle = self.store.data_mut().bridge.values_mut().intern(value);

        let address = slot.address() as usize;
        if let Err(e) = memory.write(&mut self.store, address, &handle.to_le_bytes()) {
            self.store.data_mut().bridge.values_mut().release(handle);
            return Err(Error::GuestMemory {
                address: slot.address(),
                message: e.to_string(),
            });
        }

        tracing::trace!("Stored value {} at slot {}", handle, slot);
        Ok(())
    }

    async fn on_promise_completed(
        &mut self,
        guest: &Instance,
        id: PromiseId,
        success: bool,
    ) -> Result<()> {
        let func = guest
            .get_typed_func::<(i32, i32), ()>(&mut self.store, ON_PROMISE_COMPLETED)
            .map_err(|_| Error::MissingExport {
                name: ON_PROMISE_COMPLETED.to_string(),
            })?;

        func.call_async(&mut self.store, (id.to_wasm(), i32::from(success)))
            .await
            .map_err(|e| Error::WasmError {
                message: format!("{ON_PROMISE_COMPLETED}({id}, {success}) failed: {e}"),
            })
    }
}
