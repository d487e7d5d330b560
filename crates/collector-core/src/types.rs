//! Strong handle types shared across the host/guest boundary.
//!
//! Every handle the guest passes through an import is a raw `i32`. These
//! newtypes keep promise ids, memory addresses and value handles from being
//! mixed up once they reach host code.
//!
//! # Examples
//!
//! ```
//! use collector_core::{OutSlot, PromiseId};
//!
//! let id = PromiseId::from_wasm(7);
//! let slot = OutSlot::from_wasm(100);
//! assert_eq!(id.get(), 7);
//! assert_eq!(slot.address(), 100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of one in-flight host-side asynchronous operation.
///
/// Shares its id space with [`ValueRef`]: both index the same value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromiseId(u32);

impl PromiseId {
    /// Creates a promise id from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Reinterprets a raw wasm `i32` argument as a promise id.
    ///
    /// # Examples
    ///
    /// ```
    /// use collector_core::PromiseId;
    ///
    /// assert_eq!(PromiseId::from_wasm(-1).get(), u32::MAX);
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_wasm(raw: i32) -> Self {
        Self(raw.cast_unsigned())
    }

    /// Returns the id as the `i32` passed back to the guest.
    #[inline]
    #[must_use]
    pub const fn to_wasm(self) -> i32 {
        self.0.cast_signed()
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PromiseId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Guest memory address receiving a settled value's handle.
///
/// Owned by the guest; the host writes to it once and never retains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutSlot(u32);

impl OutSlot {
    /// Creates a slot from a linear-memory address.
    #[inline]
    #[must_use]
    pub const fn new(address: u32) -> Self {
        Self(address)
    }

    /// Reinterprets a raw wasm `i32` pointer as a slot address.
    #[inline]
    #[must_use]
    pub const fn from_wasm(raw: i32) -> Self {
        Self(raw.cast_unsigned())
    }

    /// Returns the linear-memory address.
    #[inline]
    #[must_use]
    pub const fn address(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OutSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handle of a marshaled value in the shared value table.
///
/// `0` is the null handle and is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueRef(u32);

impl ValueRef {
    /// The reserved null handle.
    pub const NULL: Self = Self(0);

    /// Creates a value handle from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Reinterprets a raw wasm `i32` argument as a value handle.
    #[inline]
    #[must_use]
    pub const fn from_wasm(raw: i32) -> Self {
        Self(raw.cast_unsigned())
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns `true` for the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Encodes the handle as written into guest memory (little-endian `u32`).
    ///
    /// # Examples
    ///
    /// ```
    /// use collector_core::ValueRef;
    ///
    /// assert_eq!(ValueRef::new(3).to_le_bytes(), [3, 0, 0, 0]);
    /// ```
    #[inline]
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<PromiseId> for ValueRef {
    fn from(id: PromiseId) -> Self {
        Self(id.get())
    }
}
