// SPDX-License-Identifier: AGPL-3.0-only

//! Register bus backends
//!
//! Two backends live here, next to the bare-metal [`crate::mmio::MmioBus`]:
//! - **mmap**: maps the block through a host memory device (`/dev/mem`)
//! - **Software**: simulated configuration memory, no hardware required

pub mod mmap;
pub mod software;

pub use mmap::MmapBus;
pub use software::{Access, Command, Fault, SoftwareBackend};
