//! Shared table of values marshaled across the host/guest boundary.
//!
//! Plain values and pending promises live in one id space, so a guest holds
//! a single kind of `i32` handle for both. Id `0` is the null handle.

use crate::promise::HostPromise;
use collector_core::{Error, PromiseId, Result, ValueRef};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug)]
enum Entry {
    Value(Value),
    Promise(HostPromise),
}

/// Handle table for values and promises.
///
/// # Examples
///
/// ```
/// use collector_bridge::{HostPromise, ValueTable};
/// use serde_json::json;
///
/// let mut table = ValueTable::new();
/// let value = table.intern(json!("ok"));
/// assert_eq!(table.value(value), Some(&json!("ok")));
///
/// let promise = table.register_promise(HostPromise::resolved(json!(1)));
/// assert!(table.has_promise(promise));
/// assert!(table.take_promise(promise).is_some());
/// assert!(table.take_promise(promise).is_none());
/// ```
#[derive(Debug)]
pub struct ValueTable {
    entries: HashMap<u32, Entry>,
    next_id: u32,
}

impl Default for ValueTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Registers a promise under a freshly allocated id.
    pub fn register_promise(&mut self, promise: HostPromise) -> PromiseId {
        let id = self.allocate();
        self.entries.insert(id, Entry::Promise(promise));
        tracing::trace!("Registered promise {}", id);
        PromiseId::new(id)
    }

    /// Registers a promise under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for the null id and
    /// [`Error::DuplicatePromise`] if the id is occupied.
    pub fn insert_promise(&mut self, id: PromiseId, promise: HostPromise) -> Result<()> {
        if id.get() == 0 {
            return Err(Error::InvalidArgument(
                "promise id 0 is the null handle".to_string(),
            ));
        }
        if self.entries.contains_key(&id.get()) {
            return Err(Error::DuplicatePromise { id: id.get() });
        }
        self.entries.insert(id.get(), Entry::Promise(promise));
        tracing::trace!("Registered promise {}", id);
        Ok(())
    }

    /// Returns `true` if `id` holds a promise nobody has started awaiting.
    #[must_use]
    pub fn has_promise(&self, id: PromiseId) -> bool {
        matches!(self.entries.get(&id.get()), Some(Entry::Promise(_)))
    }

    /// Removes and returns the promise registered under `id`.
    ///
    /// Returns `None` if the id is unknown, already taken, or holds a plain
    /// value (which is left in place).
    pub fn take_promise(&mut self, id: PromiseId) -> Option<HostPromise> {
        match self.entries.remove(&id.get())? {
            Entry::Promise(promise) => Some(promise),
            value @ Entry::Value(_) => {
                self.entries.insert(id.get(), value);
                None
            }
        }
    }

    /// Stores a value and returns its handle.
    pub fn intern(&mut self, value: Value) -> ValueRef {
        let id = self.allocate();
        self.entries.insert(id, Entry::Value(value));
        ValueRef::new(id)
    }

    /// Looks up a plain value.
    #[must_use]
    pub fn value(&self, handle: ValueRef) -> Option<&Value> {
        if handle.is_null() {
            return None;
        }
        match self.entries.get(&handle.get())? {
            Entry::Value(value) => Some(value),
            Entry::Promise(_) => None,
        }
    }

    /// Frees a handle. Returns `false` if it was not in use.
    ///
    /// Releasing [`ValueRef::NULL`] is a no-op.
    pub fn release(&mut self, handle: ValueRef) -> bool {
        if handle.is_null() {
            return false;
        }
        self.entries.remove(&handle.get()).is_some()
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
