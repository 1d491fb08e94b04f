// SPDX-License-Identifier: AGPL-3.0-only

//! Silicon model for the Wakey Wakey keyword-spotting accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the parts of the chip the bring-up tooling talks to: the
//! configuration register block and the layout of the configuration memory
//! behind it.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Wishbone register block, offsets, command codes |
//! | [`region`] | conv1 / conv2 / fc region table, entry enumeration |
//! | [`words`] | The 4-word transfer payload |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod region;
pub mod regs;
pub mod words;

pub use region::{DataWidth, Entry, Region, Slot, CONV1, CONV2, FC, REGIONS};
pub use regs::RegisterMap;
pub use words::Words;
