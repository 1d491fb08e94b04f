// SPDX-License-Identifier: AGPL-3.0-only

//! Address layout of the configuration memory.
//!
//! Three regions back the weights and biases of the keyword-spotting
//! network. Each holds a number of equally sized banks (weights, then
//! bias) followed by one or more single-entry shift slots:
//!
//! ```text
//! Region  Base   Banks × Entries  Stride  Shift slot(s)   Cell width
//! ─────── ────── ──────────────── ─────── ─────────────── ──────────
//! conv1   0x000  4 × 8            0x10    0x040           32 bit
//! conv2   0x050  4 × 16           0x10    0x090           16 bit
//! fc      0x100  2 × 208          0x100   0x300, 0x400    8 bit
//! ```
//!
//! The layout is fixed for this chip revision.

use std::fmt;

/// Effective width of the memory cells behind a region.
///
/// The register interface always transfers four 32-bit words. Narrower
/// cells keep only the low words; the rest read back as don't-care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWidth {
    /// All four words retained.
    Full32,
    /// Words 0 and 1 retained.
    Half16,
    /// Word 0 retained.
    Byte8,
}

impl DataWidth {
    /// Number of transferred words that carry meaningful data.
    #[must_use]
    pub const fn significant_words(self) -> usize {
        match self {
            Self::Full32 => 4,
            Self::Half16 => 2,
            Self::Byte8 => 1,
        }
    }
}

/// Where inside a region an entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Ordinary entry of bank `n`.
    Bank(u32),
    /// Shift slot `n` (fc has one per bank).
    Shift(u32),
}

/// One addressable entry of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Configuration-memory address.
    pub address: u32,
    /// Index inside the bank; also the test-pattern seed. Zero for shift slots.
    pub index: u32,
    /// Bank or shift slot.
    pub slot: Slot,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Slot::Bank(b) => write!(f, "{:#05x} (bank {b}, entry {})", self.address, self.index),
            Slot::Shift(n) => write!(f, "{:#05x} (shift slot {n})", self.address),
        }
    }
}

/// A contiguous span of configuration memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Short name, as printed by the self-test.
    pub name: &'static str,
    /// Address of bank 0, entry 0.
    pub base: u32,
    /// Number of banks.
    pub bank_count: u32,
    /// Address increment between banks.
    pub bank_stride: u32,
    /// Entries in every bank.
    pub entries_per_bank: u32,
    /// Single-entry shift slots after the last bank.
    pub shift_slots: &'static [u32],
    /// Effective cell width.
    pub width: DataWidth,
}

/// First convolution layer: 3 weight banks + 1 bias bank, 8 entries each.
pub const CONV1: Region = Region {
    name: "conv1",
    base: 0x00,
    bank_count: 4,
    bank_stride: 0x10,
    entries_per_bank: 8,
    shift_slots: &[0x40],
    width: DataWidth::Full32,
};

/// Second convolution layer: 3 weight banks + 1 bias bank, 16 entries each.
pub const CONV2: Region = Region {
    name: "conv2",
    base: 0x50,
    bank_count: 4,
    bank_stride: 0x10,
    entries_per_bank: 16,
    shift_slots: &[0x90],
    width: DataWidth::Half16,
};

/// Fully connected layer: 2 weight banks of 208 entries, one bias slot per bank.
pub const FC: Region = Region {
    name: "fc",
    base: 0x100,
    bank_count: 2,
    bank_stride: 0x100,
    entries_per_bank: 0xD0,
    shift_slots: &[0x300, 0x400],
    width: DataWidth::Byte8,
};

/// Every region, in self-test order.
pub static REGIONS: [Region; 3] = [CONV1, CONV2, FC];

impl Region {
    /// Look a region up by name, ignoring case.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Self> {
        REGIONS.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Number of words compared on readback.
    #[must_use]
    pub const fn significant_words(&self) -> usize {
        self.width.significant_words()
    }

    /// Address of entry `index` in bank `bank`.
    #[must_use]
    pub const fn bank_address(&self, bank: u32, index: u32) -> u32 {
        self.base + bank * self.bank_stride + index
    }

    /// One past the last bank address.
    #[must_use]
    pub const fn banks_end(&self) -> u32 {
        self.base + self.bank_count * self.bank_stride
    }

    /// Total entries, shift slots included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        (self.bank_count * self.entries_per_bank) as usize + self.shift_slots.len()
    }

    /// Every bank entry in bank order, followed by the shift slots.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        let banks = (0..self.bank_count).flat_map(move |bank| {
            (0..self.entries_per_bank).map(move |index| Entry {
                address: self.bank_address(bank, index),
                index,
                slot: Slot::Bank(bank),
            })
        });
        let shifts = (0u32..).zip(self.shift_slots).map(|(n, &address)| Entry {
            address,
            index: 0,
            slot: Slot::Shift(n),
        });
        banks.chain(shifts)
    }

    /// Map an address back to its entry, if it belongs to this region.
    #[must_use]
    pub fn locate(&self, address: u32) -> Option<Entry> {
        if let Some(n) = self.shift_slots.iter().position(|&a| a == address) {
            return Some(Entry {
                address,
                index: 0,
                slot: Slot::Shift(n as u32),
            });
        }
        if address < self.base || address >= self.banks_end() {
            return None;
        }
        let offset = address - self.base;
        let index = offset % self.bank_stride;
        (index < self.entries_per_bank).then_some(Entry {
            address,
            index,
            slot: Slot::Bank(offset / self.bank_stride),
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} base={:#05x} banks={}x{} stride={:#x} shift=",
            self.name, self.base, self.bank_count, self.entries_per_bank, self.bank_stride
        )?;
        for (n, slot) in self.shift_slots.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }
            write!(f, "{slot:#05x}")?;
        }
        write!(f, " words={}", self.significant_words())
    }
}

/// Find the region and entry an address belongs to.
#[must_use]
pub fn locate(address: u32) -> Option<(&'static Region, Entry)> {
    REGIONS
        .iter()
        .find_map(|r| r.locate(address).map(|e| (r, e)))
}
