// SPDX-License-Identifier: AGPL-3.0-only

//! Register transport and region verifier for the Wakey Wakey
//! configuration memory.
//!
//! The configuration memory holds the weights and biases of the chip's
//! keyword-spotting network. It is reached only through an address register,
//! a control register and four data registers; this crate drives that
//! protocol and checks, region by region, that the memory keeps what is
//! written to it.
//!
//! # Layers
//!
//! ```text
//! verify      — write/readback sweep per region, first-mismatch report
//!   └ transport — one store or one load, command sequencing, settle delay
//!       └ RegisterBus — MmioBus (bare metal) | MmapBus (/dev/mem) | SoftwareBackend
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use wakey_driver::{select_backend, verify_all, BackendSelection, CfgTransport, TransportConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransportConfig::from_env()?;
//! let bus = select_backend(BackendSelection::Mmap, &config)?;
//! let mut transport = CfgTransport::new(bus, &config)?;
//!
//! let result = verify_all(&mut transport);
//! for report in result.reports() {
//!     println!("{}: {}", report.region.name, if report.passed() { "PASS" } else { "FAIL" });
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
pub mod config;
mod error;
pub mod mmio;
pub mod transport;
pub mod verify;

pub use backend::{select_backend, BackendSelection, BackendType, RegisterBus};
pub use backends::{MmapBus, SoftwareBackend};
pub use config::TransportConfig;
pub use error::{CfgError, Result};
pub use mmio::MmioBus;
pub use transport::CfgTransport;
pub use verify::{verify_all, verify_region, verify_regions, Mismatch, RegionReport, SelfTest, Verdict};

/// Silicon model (re-exported from wakey-chip).
pub use wakey_chip as chip;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        verify_all, verify_region, CfgError, CfgTransport, RegionReport, RegisterBus, Result,
        SelfTest, SoftwareBackend, TransportConfig,
    };
    pub use wakey_chip::{Region, Words, REGIONS};
}
