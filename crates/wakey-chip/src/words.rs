// SPDX-License-Identifier: AGPL-3.0-only

//! The 4-word payload moved by every configuration-memory transaction.

use std::fmt;

/// Four 32-bit data words; index 0 is the least significant.
///
/// The transport always moves all four words. How many of them a memory
/// cell actually retains depends on the region (see [`crate::DataWidth`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Words(pub [u32; 4]);

impl Words {
    /// All-zero payload.
    pub const ZERO: Self = Self([0; 4]);

    /// Build from words in LSB-first order.
    #[must_use]
    pub const fn new(words: [u32; 4]) -> Self {
        Self(words)
    }

    /// Build from words in MSB-first order, as the bring-up firmware's
    /// store routine takes them: `(data_3, data_2, data_1, data_0)`.
    #[must_use]
    pub const fn from_msb_first(w3: u32, w2: u32, w1: u32, w0: u32) -> Self {
        Self([w0, w1, w2, w3])
    }

    /// Sequential test pattern for entry `index`: `{i, i+1, i+2, i+3}`.
    #[must_use]
    pub const fn pattern(index: u32) -> Self {
        Self::from_msb_first(
            index.wrapping_add(3),
            index.wrapping_add(2),
            index.wrapping_add(1),
            index,
        )
    }

    /// Word `n` (0 = LSB).
    ///
    /// # Panics
    ///
    /// Panics if `n >= 4`.
    #[must_use]
    pub const fn word(&self, n: usize) -> u32 {
        self.0[n]
    }

    /// Words in LSB-first order.
    #[must_use]
    pub const fn as_array(&self) -> &[u32; 4] {
        &self.0
    }

    /// True when the first `count` words match. `count` is clamped to 4.
    #[must_use]
    pub fn agrees_within(&self, other: &Self, count: usize) -> bool {
        let n = count.min(4);
        self.0[..n] == other.0[..n]
    }

    /// Copy with every word at or above `count` cleared.
    #[must_use]
    pub fn truncated(&self, count: usize) -> Self {
        let mut out = *self;
        for w in out.0.iter_mut().skip(count) {
            *w = 0;
        }
        out
    }

    /// Hex rendering of the first `count` words, LSB first, space separated.
    #[must_use]
    pub fn display_within(&self, count: usize) -> String {
        self.0[..count.min(4)]
            .iter()
            .map(|w| format!("{w:X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<[u32; 4]> for Words {
    fn from(words: [u32; 4]) -> Self {
        Self(words)
    }
}

impl fmt::Display for Words {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_within(4))
    }
}
