// SPDX-License-Identifier: AGPL-3.0-only

//! Software (simulated configuration memory) backend
//!
//! Decodes the same register protocol the hardware block does, so the
//! transport and the verifier run unmodified without a chip:
//!
//! - one address latch and four data registers shared by store and load;
//! - a write of [`cmd::STORE`] to the control register latches the data
//!   registers into the cell at the latched address;
//! - a write of [`cmd::LOAD`] schedules the cell's contents into the data
//!   registers, where they become visible once the settle time has passed.
//!   Reads before that return whatever the data registers held before.
//!
//! Cells keep only the words their region's width retains; the remaining
//! words read back as zero, like the narrow SRAMs behind conv2 and fc.
//! Addresses outside every region have no cell: stores are dropped and loads
//! return zero.
//!
//! [`Fault`]s can be injected to exercise the verifier's failure paths.

use crate::backend::{BackendType, RegisterBus};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wakey_chip::regs::{cmd, BLOCK_SIZE};
use wakey_chip::{region, RegisterMap, Words};

/// Injected misbehaviour of the simulated memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Loads from `address` always return `words`.
    StuckAt {
        /// Affected address
        address: u32,
        /// Value every load returns
        words: Words,
    },
    /// Loads from `address` return the stored value with word `word` replaced.
    CorruptWord {
        /// Affected address
        address: u32,
        /// Word index (0 = LSB)
        word: usize,
        /// Value read back in that word
        value: u32,
    },
    /// Stores to `address` also land at `shadow`.
    Alias {
        /// Address whose stores leak
        address: u32,
        /// Address that receives the leaked value
        shadow: u32,
    },
}

/// Configuration-memory command decoded from a control write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Store of `words` to `address`
    Store {
        /// Latched address
        address: u32,
        /// Latched data
        words: Words,
    },
    /// Load from `address`
    Load {
        /// Latched address
        address: u32,
    },
}

/// One register access as seen by the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Write of `value` at `offset`
    Write {
        /// Register offset
        offset: usize,
        /// Written value
        value: u32,
    },
    /// Read at `offset` returning `value`
    Read {
        /// Register offset
        offset: usize,
        /// Returned value
        value: u32,
    },
}

/// Simulated configuration memory behind the register block.
#[derive(Debug)]
pub struct SoftwareBackend {
    map: RegisterMap,
    /// Minimum time between a load command and valid data registers
    settle: Duration,

    addr_latch: u32,
    ctrl: u32,
    data: [u32; 4],
    /// Load result not yet visible in the data registers
    pending: Option<(Instant, Words)>,

    cells: BTreeMap<u32, Words>,
    faults: Vec<Fault>,

    commands: Vec<Command>,
    accesses: Option<Vec<Access>>,
}

impl SoftwareBackend {
    /// Empty memory behind a block laid out as `map`, with instant settling.
    pub fn new(map: RegisterMap) -> Self {
        Self {
            map,
            settle: Duration::ZERO,
            addr_latch: 0,
            ctrl: 0,
            data: [0; 4],
            pending: None,
            cells: BTreeMap::new(),
            faults: Vec::new(),
            commands: Vec::new(),
            accesses: None,
        }
    }

    /// Require `settle` between a load command and valid data.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Record every register access (see [`accesses`](Self::accesses)).
    #[must_use]
    pub fn with_access_log(mut self) -> Self {
        self.accesses = Some(Vec::new());
        self
    }

    /// Add a fault; faults apply in insertion order.
    pub fn inject(&mut self, fault: Fault) {
        debug!("SoftwareBackend: injecting {fault:?}");
        self.faults.push(fault);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Cell contents at `address`, bypassing the register protocol.
    pub fn peek(&self, address: u32) -> Option<Words> {
        self.cells.get(&address).copied()
    }

    /// Commands decoded so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Register accesses so far, if logging was enabled.
    pub fn accesses(&self) -> Option<&[Access]> {
        self.accesses.as_deref()
    }

    /// Drop the command and access logs.
    pub fn clear_logs(&mut self) {
        self.commands.clear();
        if let Some(log) = self.accesses.as_mut() {
            log.clear();
        }
    }

    /// Cells written so far.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn data_index(&self, offset: usize) -> Option<usize> {
        self.map.data.iter().position(|&o| o == offset)
    }

    fn settle_pending(&mut self) {
        if let Some((issued, words)) = self.pending {
            if issued.elapsed() >= self.settle {
                self.data = words.0;
                self.pending = None;
            }
        }
    }

    fn store(&mut self, address: u32, words: Words) {
        self.commands.push(Command::Store { address, words });
        self.write_cell(address, words);
        let shadows: Vec<u32> = self
            .faults
            .iter()
            .filter_map(|f| match *f {
                Fault::Alias { address: a, shadow } if a == address => Some(shadow),
                _ => None,
            })
            .collect();
        for shadow in shadows {
            self.write_cell(shadow, words);
        }
    }

    fn write_cell(&mut self, address: u32, words: Words) {
        match region::locate(address) {
            Some((r, _)) => {
                self.cells
                    .insert(address, words.truncated(r.significant_words()));
            }
            None => debug!("SoftwareBackend: store to unmapped address {address:#x} dropped"),
        }
    }

    fn load(&mut self, address: u32) {
        self.commands.push(Command::Load { address });
        let mut words = self.peek(address).unwrap_or_default();
        for fault in &self.faults {
            match *fault {
                Fault::StuckAt { address: a, words: w } if a == address => words = w,
                Fault::CorruptWord { address: a, word, value } if a == address && word < 4 => {
                    words.0[word] = value;
                }
                _ => {}
            }
        }
        self.pending = Some((Instant::now(), words));
        self.settle_pending();
    }

    fn log(&mut self, access: Access) {
        if let Some(log) = self.accesses.as_mut() {
            log.push(access);
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new(RegisterMap::WAKEY)
    }
}

impl RegisterBus for SoftwareBackend {
    fn read32(&mut self, offset: usize) -> u32 {
        self.settle_pending();
        let value = if offset == self.map.addr {
            self.addr_latch
        } else if offset == self.map.ctrl {
            self.ctrl
        } else if let Some(n) = self.data_index(offset) {
            self.data[n]
        } else {
            warn!("SoftwareBackend: read of unknown register {offset:#x}");
            0
        };
        self.log(Access::Read { offset, value });
        value
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.settle_pending();
        self.log(Access::Write { offset, value });
        if offset == self.map.addr {
            self.addr_latch = value;
        } else if offset == self.map.ctrl {
            self.ctrl = value;
            match value {
                cmd::STORE => self.store(self.addr_latch, Words(self.data)),
                cmd::LOAD => self.load(self.addr_latch),
                other => warn!("SoftwareBackend: unknown command {other:#x} ignored"),
            }
        } else if let Some(n) = self.data_index(offset) {
            self.data[n] = value;
        } else {
            warn!("SoftwareBackend: write to unknown register {offset:#x} ignored");
        }
    }

    fn size(&self) -> usize {
        self.map.span().max(BLOCK_SIZE)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wakey_chip::regs::{CFG_ADDR, CFG_CTRL, CFG_DATA_0, CFG_DATA_1, CFG_DATA_2, CFG_DATA_3};

    fn raw_store(b: &mut SoftwareBackend, address: u32, words: [u32; 4]) {
        b.write32(CFG_ADDR, address);
        b.write32(CFG_DATA_0, words[0]);
        b.write32(CFG_DATA_1, words[1]);
        b.write32(CFG_DATA_2, words[2]);
        b.write32(CFG_DATA_3, words[3]);
        b.write32(CFG_CTRL, cmd::STORE);
    }

    fn raw_load(b: &mut SoftwareBackend, address: u32) -> [u32; 4] {
        b.write32(CFG_ADDR, address);
        b.write32(CFG_CTRL, cmd::LOAD);
        [
            b.read32(CFG_DATA_0),
            b.read32(CFG_DATA_1),
            b.read32(CFG_DATA_2),
            b.read32(CFG_DATA_3),
        ]
    }

    #[test]
    fn full_width_cell_keeps_all_words() {
        let mut b = SoftwareBackend::default();
        raw_store(&mut b, 0x15, [5, 6, 7, 8]);
        assert_eq!(raw_load(&mut b, 0x15), [5, 6, 7, 8]);
    }

    #[test]
    fn narrow_cells_drop_high_words() {
        let mut b = SoftwareBackend::default();
        raw_store(&mut b, 0x50, [1, 2, 3, 4]);
        raw_store(&mut b, 0x100, [1, 2, 3, 4]);
        assert_eq!(raw_load(&mut b, 0x50), [1, 2, 0, 0]);
        assert_eq!(raw_load(&mut b, 0x100), [1, 0, 0, 0]);
    }

    #[test]
    fn unmapped_address_has_no_cell() {
        let mut b = SoftwareBackend::default();
        raw_store(&mut b, 0x2F0, [1, 2, 3, 4]);
        assert_eq!(b.cell_count(), 0);
        assert_eq!(raw_load(&mut b, 0x2F0), [0, 0, 0, 0]);
    }

    #[test]
    fn commands_decoded_in_order() {
        let mut b = SoftwareBackend::default();
        raw_store(&mut b, 0x03, [3, 4, 5, 6]);
        raw_load(&mut b, 0x03);
        assert_eq!(
            b.commands(),
            &[
                Command::Store { address: 0x03, words: Words::pattern(3) },
                Command::Load { address: 0x03 },
            ]
        );
    }

    #[test]
    fn early_read_returns_stale_data() {
        let mut b = SoftwareBackend::default().with_settle(Duration::from_secs(60));
        raw_store(&mut b, 0x01, [1, 2, 3, 4]);
        // data registers still hold the stored words; load result not yet visible
        raw_store(&mut b, 0x02, [9, 9, 9, 9]);
        assert_eq!(raw_load(&mut b, 0x01), [9, 9, 9, 9]);
    }

    #[test]
    fn faults_apply_on_load_and_store() {
        let mut b = SoftwareBackend::default();
        b.inject(Fault::CorruptWord { address: 0x04, word: 3, value: 0xFF });
        b.inject(Fault::Alias { address: 0x05, shadow: 0x16 });
        raw_store(&mut b, 0x04, [4, 5, 6, 7]);
        raw_store(&mut b, 0x05, [5, 6, 7, 8]);
        assert_eq!(raw_load(&mut b, 0x04), [4, 5, 6, 0xFF]);
        assert_eq!(b.peek(0x16), Some(Words::pattern(5)));

        b.clear_faults();
        assert_eq!(raw_load(&mut b, 0x04), [4, 5, 6, 7]);
    }

    #[test]
    fn access_log_is_opt_in() {
        let mut b = SoftwareBackend::default();
        raw_load(&mut b, 0);
        assert!(b.accesses().is_none());

        let mut b = SoftwareBackend::default().with_access_log();
        raw_load(&mut b, 0);
        assert_eq!(b.accesses().map(<[Access]>::len), Some(6));
    }

    #[test]
    fn clearing_logs_keeps_memory() {
        let mut b = SoftwareBackend::default().with_access_log();
        raw_store(&mut b, 0x15, [5, 6, 7, 8]);
        b.clear_logs();
        assert!(b.commands().is_empty());
        assert_eq!(b.accesses().map(<[Access]>::len), Some(0));
        assert_eq!(b.peek(0x15), Some(Words::pattern(5)));
    }
}
