// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration-memory register transport
//!
//! One [`store`](CfgTransport::store) or [`load`](CfgTransport::load) is one
//! transaction against the configuration memory. The block has a single
//! address latch and a single set of data registers with no transaction
//! identifier, so the transport owns the bus and every operation takes
//! `&mut self`.
//!
//! ```text
//! store:  ADDR ← address
//!         DATA_0 ← w0, DATA_1 ← w1, DATA_2 ← w2, DATA_3 ← w3
//!         CTRL ← STORE                  (latches address and data)
//!
//! load:   ADDR ← address
//!         CTRL ← LOAD
//!         wait ≥ settle                 (data valid one bus clock later)
//!         w0 ← DATA_0, …, w3 ← DATA_3
//! ```
//!
//! Neither operation can fail. A defective memory shows up as wrong data on
//! a later load.

use crate::backend::RegisterBus;
use crate::config::TransportConfig;
use crate::error::{CfgError, Result};
use std::time::{Duration, Instant};
use tracing::trace;
use wakey_chip::regs::cmd;
use wakey_chip::{RegisterMap, Words};

/// Exclusive handle on the configuration register block
#[derive(Debug)]
pub struct CfgTransport<B: RegisterBus> {
    bus: B,
    map: RegisterMap,
    settle: Duration,
}

impl<B: RegisterBus> CfgTransport<B> {
    /// Take ownership of `bus` and drive it with the register map and
    /// settling delay from `config`.
    ///
    /// # Errors
    ///
    /// Returns error if a register of the map is not word aligned or lies
    /// outside the bus window.
    pub fn new(bus: B, config: &TransportConfig) -> Result<Self> {
        Self::with_map(bus, config.register_map, config.settle)
    }

    /// Same as [`new`](Self::new) with an explicit map and settle bound.
    ///
    /// # Errors
    ///
    /// Returns error if a register of the map is not word aligned or lies
    /// outside the bus window.
    pub fn with_map(bus: B, map: RegisterMap, settle: Duration) -> Result<Self> {
        if let Some(offset) = map.misaligned() {
            return Err(CfgError::invalid_config(format!(
                "register offset {offset:#x} is not word aligned"
            )));
        }
        let limit = bus.size();
        if let Some(offset) = map.offsets().find(|&o| o + 4 > limit) {
            return Err(CfgError::RegisterOutOfBounds { offset, limit });
        }
        tracing::debug!(
            "Config transport on {} bus, settle={settle:?}",
            bus.backend_type()
        );
        Ok(Self { bus, map, settle })
    }

    /// Store `words` at configuration-memory `address`.
    ///
    /// The control write comes last: it latches the whole transaction.
    pub fn store(&mut self, address: u32, words: &Words) {
        trace!("cfg store {address:#05x} <- [{words}]");
        self.bus.write32(self.map.addr, address);
        for (&offset, &word) in self.map.data.iter().zip(words.as_array()) {
            self.bus.write32(offset, word);
        }
        self.bus.write32(self.map.ctrl, cmd::STORE);
    }

    /// Load the four words at configuration-memory `address`.
    pub fn load(&mut self, address: u32) -> Words {
        self.bus.write32(self.map.addr, address);
        self.bus.write32(self.map.ctrl, cmd::LOAD);
        self.wait_settle();
        let mut words = Words::ZERO;
        for (word, &offset) in words.0.iter_mut().zip(&self.map.data) {
            *word = self.bus.read32(offset);
        }
        trace!("cfg load  {address:#05x} -> [{words}]");
        words
    }

    /// Busy-wait for the settling bound on the monotonic clock.
    ///
    /// The block has no status bit to poll; only elapsed time says the data
    /// registers are valid.
    fn wait_settle(&self) {
        let start = Instant::now();
        loop {
            std::hint::spin_loop();
            if start.elapsed() >= self.settle {
                break;
            }
        }
    }

    /// Settling delay applied to every load.
    pub const fn settle(&self) -> Duration {
        self.settle
    }

    /// Register map in use.
    pub const fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Borrow the bus.
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus.
    pub fn into_inner(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::software::{Access, SoftwareBackend};
    use crate::mmio::MmioBus;
    use wakey_chip::regs::{CFG_ADDR, CFG_CTRL, CFG_DATA_0, CFG_DATA_1, CFG_DATA_2, CFG_DATA_3};

    fn transport(backend: SoftwareBackend) -> CfgTransport<SoftwareBackend> {
        CfgTransport::with_map(backend, RegisterMap::WAKEY, Duration::ZERO).unwrap()
    }

    #[test]
    fn store_then_load_conv1_entry() {
        let mut t = transport(SoftwareBackend::default());
        t.store(0x15, &Words::from_msb_first(8, 7, 6, 5));
        let got = t.load(0x15);
        assert_eq!(got.as_array(), &[5, 6, 7, 8]);
    }

    #[test]
    fn store_writes_control_last() {
        let mut t = transport(SoftwareBackend::default().with_access_log());
        t.store(0x15, &Words::new([5, 6, 7, 8]));
        let log = t.bus().accesses().unwrap();
        assert_eq!(
            log,
            &[
                Access::Write { offset: CFG_ADDR, value: 0x15 },
                Access::Write { offset: CFG_DATA_0, value: 5 },
                Access::Write { offset: CFG_DATA_1, value: 6 },
                Access::Write { offset: CFG_DATA_2, value: 7 },
                Access::Write { offset: CFG_DATA_3, value: 8 },
                Access::Write { offset: CFG_CTRL, value: cmd::STORE },
            ]
        );
    }

    #[test]
    fn load_reads_data_in_store_order() {
        let mut t = transport(SoftwareBackend::default());
        t.store(0x02, &Words::pattern(2));
        let mut t = transport(t.into_inner().with_access_log());
        t.load(0x02);
        let log = t.bus().accesses().unwrap();
        assert_eq!(log[0], Access::Write { offset: CFG_ADDR, value: 0x02 });
        assert_eq!(log[1], Access::Write { offset: CFG_CTRL, value: cmd::LOAD });
        let reads: Vec<usize> = log[2..]
            .iter()
            .map(|a| match *a {
                Access::Read { offset, .. } => offset,
                Access::Write { offset, .. } => panic!("unexpected write to {offset:#x}"),
            })
            .collect();
        assert_eq!(reads, vec![CFG_DATA_0, CFG_DATA_1, CFG_DATA_2, CFG_DATA_3]);
    }

    #[test]
    fn settle_delay_makes_load_data_valid() {
        let settle = Duration::from_millis(2);
        let backend = SoftwareBackend::default().with_settle(settle);
        let mut t = CfgTransport::with_map(backend, RegisterMap::WAKEY, settle).unwrap();
        t.store(0x20, &Words::pattern(0));
        t.store(0x21, &Words::pattern(1));
        assert_eq!(t.load(0x20), Words::pattern(0));
    }

    #[test]
    fn skipping_settle_reads_stale_data() {
        let backend = SoftwareBackend::default().with_settle(Duration::from_secs(60));
        let mut t = transport(backend);
        t.store(0x20, &Words::pattern(0));
        t.store(0x21, &Words::pattern(1));
        // data registers still hold the last store
        assert_eq!(t.load(0x20), Words::pattern(1));
    }

    #[test]
    fn register_map_must_fit_bus() {
        let map = RegisterMap {
            data: [0x08, 0x0C, 0x10, 0x100],
            ..RegisterMap::WAKEY
        };
        let err = CfgTransport::with_map(SoftwareBackend::default(), map, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, CfgError::RegisterOutOfBounds { offset: 0x100, .. }));
    }

    #[test]
    fn misaligned_register_map_rejected_before_any_access() {
        let mut backing = [0u32; 8];
        // SAFETY: backing is aligned, 32 bytes, and outlives the bus
        let bus = unsafe { MmioBus::from_raw(backing.as_mut_ptr().cast(), 32) };
        let map = RegisterMap {
            addr: 0x02,
            ..RegisterMap::WAKEY
        };
        let err = CfgTransport::with_map(bus, map, Duration::ZERO).unwrap_err();
        assert!(matches!(err, CfgError::InvalidConfig { .. }));
        assert!(err.to_string().contains("0x2"));
        assert_eq!(backing, [0; 8]);
    }

    #[test]
    fn config_settle_and_map_carried_into_transport() {
        let config = TransportConfig::default().with_settle(Duration::from_nanos(250));
        let t = CfgTransport::new(SoftwareBackend::default(), &config).unwrap();
        assert_eq!(t.settle(), Duration::from_nanos(250));
        assert_eq!(t.register_map(), &RegisterMap::WAKEY);
    }
}
