// SPDX-License-Identifier: AGPL-3.0-only

//! Register bus abstraction
//!
//! The transport only ever needs two primitives: write one 32-bit register
//! and read one 32-bit register of the configuration block. Everything that
//! reaches the block (a raw pointer on the management core, a `/dev/mem`
//! mapping on a host, a simulation in CI) implements [`RegisterBus`].

use crate::config::TransportConfig;
use crate::error::Result;
use std::fmt::Debug;

/// 32-bit register access to the configuration block.
///
/// Offsets are relative to the start of the block. Both methods take
/// `&mut self`: reads of the data registers are only meaningful after the
/// command that filled them, so a bus is never shared.
pub trait RegisterBus: Debug {
    /// Read the register at `offset`.
    fn read32(&mut self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`.
    fn write32(&mut self, offset: usize, value: u32);

    /// Size of the accessible window in bytes.
    fn size(&self) -> usize;

    /// Backend type for diagnostics.
    fn backend_type(&self) -> BackendType;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read32(&mut self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Volatile access at a fixed bus address (bare metal)
    Mmio,

    /// Host mapping of the block through a memory device
    Mmap,

    /// Simulated configuration memory, no hardware required
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mmio => write!(f, "MMIO"),
            Self::Mmap => write!(f, "mmap"),
            Self::Software => write!(f, "Software (simulated memory)"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSelection {
    /// Map the hardware block, fall back to software if that fails
    Auto,

    /// Force the host memory-device mapping
    Mmap,

    /// Force the simulated memory
    Software,
}

/// Open a register bus according to `selection`.
///
/// # Errors
///
/// Returns error if the requested backend cannot be opened.
pub fn select_backend(
    selection: BackendSelection,
    config: &TransportConfig,
) -> Result<Box<dyn RegisterBus>> {
    use crate::backends::mmap::MmapBus;
    use crate::backends::software::SoftwareBackend;

    match selection {
        BackendSelection::Auto => match MmapBus::open(config) {
            Ok(bus) => {
                tracing::info!("Using mmap backend at {:#x}", config.base_address);
                Ok(Box::new(bus))
            }
            Err(e) => {
                tracing::info!("mmap unavailable ({e}), using software backend");
                Ok(Box::new(SoftwareBackend::new(config.register_map)))
            }
        },

        BackendSelection::Mmap => MmapBus::open(config).map(|b| Box::new(b) as Box<dyn RegisterBus>),

        BackendSelection::Software => Ok(Box::new(SoftwareBackend::new(config.register_map))),
    }
}
