// SPDX-License-Identifier: AGPL-3.0-only

//! Transport configuration
//!
//! Everything platform-specific the core needs is handed to it here: where
//! the register block lives, which offsets the registers sit at, and how
//! long a load needs to settle. Defaults describe the Wakey Wakey block on
//! the Caravel Wishbone bus; environment variables override them.

use crate::error::{CfgError, Result};
use clap_num::maybe_hex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use wakey_chip::regs::{BLOCK_SIZE, WISHBONE_BASE};
use wakey_chip::RegisterMap;

/// Environment variable overriding the register block bus address.
pub const ENV_BASE: &str = "WAKEY_CFG_BASE";
/// Environment variable overriding the load settling delay, in nanoseconds.
pub const ENV_SETTLE_NS: &str = "WAKEY_SETTLE_NS";
/// Environment variable overriding the memory device path.
pub const ENV_MEM_DEVICE: &str = "WAKEY_MEM_DEVICE";

/// Settling delay between a load command and the first data read.
///
/// One cycle of the slowest clock the block has been run at (10 MHz).
pub const DEFAULT_SETTLE: Duration = Duration::from_nanos(100);

/// Register transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bus address of the register block
    pub base_address: u64,

    /// Bytes of bus window to map; must cover the register map
    pub window_size: usize,

    /// Register offsets inside the block
    pub register_map: RegisterMap,

    /// Minimum delay between issuing a load and reading the data registers
    pub settle: Duration,

    /// Memory device used for host-side mapping
    pub mem_device: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_address: WISHBONE_BASE,
            window_size: BLOCK_SIZE,
            register_map: RegisterMap::WAKEY,
            settle: DEFAULT_SETTLE,
            mem_device: PathBuf::from("/dev/mem"),
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `WAKEY_CFG_BASE`, `WAKEY_SETTLE_NS` and
    /// `WAKEY_MEM_DEVICE` when set.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a looked-up value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BASE) {
            config.base_address = maybe_hex::<u64>(raw.trim())
                .map_err(|e| CfgError::invalid_config(format!("{ENV_BASE}: {e}")))?;
        }
        if let Some(raw) = lookup(ENV_SETTLE_NS) {
            let ns = maybe_hex::<u64>(raw.trim())
                .map_err(|e| CfgError::invalid_config(format!("{ENV_SETTLE_NS}: {e}")))?;
            config.settle = Duration::from_nanos(ns);
        }
        if let Some(raw) = lookup(ENV_MEM_DEVICE) {
            config.mem_device = PathBuf::from(raw);
        }

        config.validate()?;
        debug!(
            "Transport config: base={:#x} window={:#x} settle={:?} device={}",
            config.base_address,
            config.window_size,
            config.settle,
            config.mem_device.display()
        );
        Ok(config)
    }

    /// Replace the settling delay.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Check the register map fits the window and the block is word aligned.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is inconsistent.
    pub fn validate(&self) -> Result<()> {
        if self.base_address % 4 != 0 {
            return Err(CfgError::invalid_config(format!(
                "register block address {:#x} is not word aligned",
                self.base_address
            )));
        }
        if let Some(offset) = self.register_map.misaligned() {
            return Err(CfgError::invalid_config(format!(
                "register offset {offset:#x} is not word aligned"
            )));
        }
        for offset in self.register_map.offsets() {
            if offset + 4 > self.window_size {
                return Err(CfgError::RegisterOutOfBounds {
                    offset,
                    limit: self.window_size,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_describe_wishbone_block() {
        let config = TransportConfig::default();
        assert_eq!(config.base_address, 0x3000_0000);
        assert_eq!(config.register_map, RegisterMap::WAKEY);
        assert!(config.settle > Duration::ZERO);
        config.validate().unwrap();
    }

    #[test]
    fn env_overrides() {
        let config = TransportConfig::from_lookup(lookup(&[
            (ENV_BASE, "0x30001000"),
            (ENV_SETTLE_NS, "2500"),
            (ENV_MEM_DEVICE, "/dev/uio0"),
        ]))
        .unwrap();
        assert_eq!(config.base_address, 0x3000_1000);
        assert_eq!(config.settle, Duration::from_nanos(2500));
        assert_eq!(config.mem_device, PathBuf::from("/dev/uio0"));
    }

    #[test]
    fn bad_env_value_rejected() {
        let err = TransportConfig::from_lookup(lookup(&[(ENV_SETTLE_NS, "soon")])).unwrap_err();
        assert!(matches!(err, CfgError::InvalidConfig { .. }));
        assert!(err.to_string().contains(ENV_SETTLE_NS));
    }

    #[test]
    fn misaligned_base_rejected() {
        let err = TransportConfig::from_lookup(lookup(&[(ENV_BASE, "0x30000002")])).unwrap_err();
        assert!(matches!(err, CfgError::InvalidConfig { .. }));
    }

    #[test]
    fn window_must_cover_registers() {
        let config = TransportConfig {
            window_size: 0x10,
            ..TransportConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CfgError::RegisterOutOfBounds { offset: 0x10, limit: 0x10 })
        ));
    }

    #[test]
    fn env_numbers_in_hex_or_decimal() {
        let config = TransportConfig::from_lookup(lookup(&[
            (ENV_BASE, "805310464"),
            (ENV_SETTLE_NS, "0x64"),
        ]))
        .unwrap();
        assert_eq!(config.base_address, 0x3000_1000);
        assert_eq!(config.settle, Duration::from_nanos(100));

        let err = TransportConfig::from_lookup(lookup(&[(ENV_BASE, "fc")])).unwrap_err();
        assert!(err.to_string().contains(ENV_BASE));
    }

    #[test]
    fn misaligned_register_map_rejected() {
        let config = TransportConfig {
            register_map: RegisterMap {
                data: [0x08, 0x0C, 0x11, 0x14],
                ..RegisterMap::WAKEY
            },
            ..TransportConfig::default()
        };
        assert!(matches!(config.validate(), Err(CfgError::InvalidConfig { .. })));
    }
}
