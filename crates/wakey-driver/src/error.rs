// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for configuration-memory access setup
//!
//! Transactions themselves never fail: a defective memory shows up as wrong
//! data on readback, reported by the verifier. These errors cover getting a
//! register bus in the first place.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, CfgError>;

/// Errors that can occur while opening or configuring the register bus
#[derive(Debug, Error)]
pub enum CfgError {
    /// Memory device not found at the expected path
    #[error("Memory device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// I/O error while opening the memory device
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Mapping the register block failed
    #[error("Failed to map register block: {reason}")]
    MapFailed {
        /// Reason for failure
        reason: String,
    },

    /// A register of the map lies outside the bus window
    #[error("Register offset {offset:#x} outside bus window of {limit:#x} bytes")]
    RegisterOutOfBounds {
        /// Offending register offset
        offset: usize,
        /// Size of the bus window
        limit: usize,
    },

    /// Configuration value could not be used
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },
}

impl CfgError {
    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create a map failed error
    pub fn map_failed(reason: impl Into<String>) -> Self {
        Self::MapFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
