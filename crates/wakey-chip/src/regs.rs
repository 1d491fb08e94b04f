// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration register block of the Wakey Wakey user project.
//!
//! The configuration memory is not directly addressable from the management
//! core. It sits behind six 32-bit Wishbone registers in the Caravel user
//! area:
//!
//! ```text
//! 0x3000_0000  CFG_ADDR    — configuration-memory address for the next command
//! 0x3000_0004  CFG_CTRL    — command register (store = 0x1, load = 0x2)
//! 0x3000_0008  CFG_DATA_0  — data word 0 (LSB)
//! 0x3000_000C  CFG_DATA_1  — data word 1
//! 0x3000_0010  CFG_DATA_2  — data word 2
//! 0x3000_0014  CFG_DATA_3  — data word 3 (MSB)
//! ```
//!
//! Writing a command code to `CFG_CTRL` latches whatever sits in the address
//! and data registers at that moment. Load data becomes valid one bus clock
//! after the load command.

// ── Bus placement ────────────────────────────────────────────────────────────

/// Wishbone address of the register block on the Caravel user area.
pub const WISHBONE_BASE: u64 = 0x3000_0000;

/// Bytes spanned by the register block.
pub const BLOCK_SIZE: usize = 0x18;

// ── Register offsets ─────────────────────────────────────────────────────────

/// Address register.
pub const CFG_ADDR: usize = 0x00;
/// Control (command) register.
pub const CFG_CTRL: usize = 0x04;
/// Data word 0 (LSB).
pub const CFG_DATA_0: usize = 0x08;
/// Data word 1.
pub const CFG_DATA_1: usize = 0x0C;
/// Data word 2.
pub const CFG_DATA_2: usize = 0x10;
/// Data word 3 (MSB).
pub const CFG_DATA_3: usize = 0x14;

// ── Command codes ────────────────────────────────────────────────────────────

/// Command codes written to [`CFG_CTRL`].
pub mod cmd {
    /// Write the latched data words to the latched address.
    pub const STORE: u32 = 0x1;
    /// Read the latched address into the data registers.
    pub const LOAD: u32 = 0x2;
}

/// Register offsets handed to the transport at initialization.
///
/// Offsets are relative to the start of the register block, so the same map
/// works whether the block is reached through a raw pointer, a `/dev/mem`
/// mapping, or a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// Address register offset.
    pub addr: usize,
    /// Control register offset.
    pub ctrl: usize,
    /// Data register offsets, word 0 (LSB) first.
    pub data: [usize; 4],
}

impl RegisterMap {
    /// Layout of the Wakey Wakey block.
    pub const WAKEY: Self = Self {
        addr: CFG_ADDR,
        ctrl: CFG_CTRL,
        data: [CFG_DATA_0, CFG_DATA_1, CFG_DATA_2, CFG_DATA_3],
    };

    /// Every register offset in the map.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        [self.addr, self.ctrl].into_iter().chain(self.data)
    }

    /// One past the last byte touched by any register.
    #[must_use]
    pub fn span(&self) -> usize {
        self.offsets().map(|o| o + 4).max().unwrap_or(0)
    }

    /// First register offset that is not 32-bit aligned, if any.
    #[must_use]
    pub fn misaligned(&self) -> Option<usize> {
        self.offsets().find(|o| o % 4 != 0)
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::WAKEY
    }
}
