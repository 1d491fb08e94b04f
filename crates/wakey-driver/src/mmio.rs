// SPDX-License-Identifier: AGPL-3.0-only

//! Volatile access to the configuration register block
//!
//! On the management core the block sits at a fixed Wishbone address and is
//! reached through a raw pointer. [`MmioBus`] is the single place that
//! pointer is dereferenced; nothing else in the crate performs volatile
//! access on it.

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_ptr_alignment)]

use crate::backend::{BackendType, RegisterBus};
use std::ptr::NonNull;

/// Register block reached through a raw bus address.
pub struct MmioBus {
    /// Start of the register block
    ptr: NonNull<u8>,
    /// Bytes addressable from `ptr`
    size: usize,
    /// Reported backend type (bare pointer or host mapping)
    kind: BackendType,
}

impl std::fmt::Debug for MmioBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmioBus")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .field("kind", &self.kind)
            .finish()
    }
}

// SAFETY: Send - MmioBus is the exclusive handle on the register block. Moving it
// between threads does not invalidate the address. No thread-local state.
unsafe impl Send for MmioBus {}

impl MmioBus {
    /// Wrap the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at device registers valid for volatile 32-bit reads
    /// and writes over `size` bytes for as long as the returned value lives,
    /// `base` must be 4-byte aligned, and no other code may access the block
    /// while this handle exists.
    ///
    /// # Panics
    ///
    /// Panics if `base` is null.
    pub unsafe fn from_raw(base: *mut u8, size: usize) -> Self {
        Self {
            ptr: NonNull::new(base).expect("register block address must be non-null"),
            size,
            kind: BackendType::Mmio,
        }
    }

    /// Wrap the register block at a bus address.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw`](Self::from_raw).
    pub unsafe fn at_address(address: usize, size: usize) -> Self {
        // SAFETY: forwarded to the caller's contract
        unsafe { Self::from_raw(address as *mut u8, size) }
    }

    /// Re-label the backend type; used by the host mapping.
    pub(crate) fn with_kind(mut self, kind: BackendType) -> Self {
        self.kind = kind;
        self
    }

    /// Start of the block.
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn check(&self, offset: usize) {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.size,
            "Register offset {offset:#x} out of bounds (window {:#x})",
            self.size
        );
    }
}

impl RegisterBus for MmioBus {
    /// # Panics
    ///
    /// Panics if `offset` is misaligned or `offset + 4` exceeds the window.
    fn read32(&mut self, offset: usize) -> u32 {
        self.check(offset);
        // SAFETY: read_volatile necessary for MMIO - the data registers change
        // under hardware control. Invariants: (1) ptr valid for self.size per the
        // from_raw contract; (2) offset+4 <= size and offset aligned (checked);
        // (3) exclusive access via &mut self.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        value
    }

    /// # Panics
    ///
    /// Panics if `offset` is misaligned or `offset + 4` exceeds the window.
    fn write32(&mut self, offset: usize, value: u32) {
        self.check(offset);
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        // SAFETY: write_volatile necessary for MMIO - a control write triggers the
        // transaction. Invariants: (1) ptr valid for self.size; (2) offset in bounds
        // and aligned (checked); (3) exclusive access via &mut self.
        unsafe {
            self.ptr.as_ptr().add(offset).cast::<u32>().write_volatile(value);
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn backend_type(&self) -> BackendType {
        self.kind
    }
}
