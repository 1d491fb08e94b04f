// SPDX-License-Identifier: AGPL-3.0-only

//! Region verifier
//!
//! Sweeps a region with a sequential pattern and reads it back:
//!
//! 1. every bank entry `i` is stored `{i, i+1, i+2, i+3}` (word 0 = `i`),
//!    every shift slot the `i = 0` pattern;
//! 2. every entry is loaded in the same order and compared against its
//!    pattern, **restricted to the region's significant words**;
//! 3. the first disagreement ends the sweep and is reported.
//!
//! The transport always moves four words; conv2 cells keep two of them and
//! fc cells one, so comparing all four would fail healthy memory.

use crate::backend::RegisterBus;
use crate::transport::CfgTransport;
use std::fmt;
use tracing::{debug, info, warn};
use wakey_chip::{Entry, Region, Words, REGIONS};

/// First entry whose readback disagreed with its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Offending entry
    pub entry: Entry,
    /// Pattern that was stored
    pub expected: Words,
    /// Words that came back
    pub observed: Words,
    /// Words taking part in the comparison
    pub compared: usize,
}

impl Mismatch {
    /// Address of the offending entry.
    pub const fn address(&self) -> u32 {
        self.entry.address
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mismatch at {}", self.entry)?;
        writeln!(f, "EXP: {}", self.expected.display_within(self.compared))?;
        write!(f, "OBS: {}", self.observed.display_within(self.compared))
    }
}

/// Outcome of one region sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every entry read back its pattern.
    Pass {
        /// Entries compared
        entries: usize,
    },
    /// Sweep stopped at the first mismatch.
    Fail(Mismatch),
}

/// Verdict for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionReport {
    /// Region swept
    pub region: Region,
    /// Result of the sweep
    pub verdict: Verdict,
}

impl RegionReport {
    /// True when the region passed.
    pub const fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass { .. })
    }

    /// First mismatch, if the region failed.
    pub const fn mismatch(&self) -> Option<&Mismatch> {
        match &self.verdict {
            Verdict::Fail(m) => Some(m),
            Verdict::Pass { .. } => None,
        }
    }
}

/// Write every entry of `region` with its pattern, then read each back.
///
/// Returns at the first entry that disagrees within the region's
/// significant words; no later entry is loaded.
pub fn verify_region<B: RegisterBus>(transport: &mut CfgTransport<B>, region: &Region) -> RegionReport {
    let compared = region.significant_words();
    info!(
        "Verifying {} ({} entries, {} significant words)",
        region.name,
        region.entry_count(),
        compared
    );

    for entry in region.entries() {
        transport.store(entry.address, &Words::pattern(entry.index));
    }
    debug!("{}: write phase done", region.name);

    let mut checked = 0;
    for entry in region.entries() {
        let expected = Words::pattern(entry.index);
        let observed = transport.load(entry.address);
        if !expected.agrees_within(&observed, compared) {
            let mismatch = Mismatch {
                entry,
                expected,
                observed,
                compared,
            };
            warn!(
                "{}: {} (expected [{}], observed [{}])",
                region.name,
                entry,
                expected.display_within(compared),
                observed.display_within(compared)
            );
            return RegionReport {
                region: *region,
                verdict: Verdict::Fail(mismatch),
            };
        }
        checked += 1;
    }

    info!("{}: PASS ({checked} entries)", region.name);
    RegionReport {
        region: *region,
        verdict: Verdict::Pass { entries: checked },
    }
}

/// Reports of a full self-test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfTest {
    reports: Vec<RegionReport>,
}

impl SelfTest {
    /// Per-region reports in the order they ran.
    pub fn reports(&self) -> &[RegionReport] {
        &self.reports
    }

    /// True when every region passed.
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(RegionReport::passed)
    }

    /// Report for region `name`.
    pub fn report(&self, name: &str) -> Option<&RegionReport> {
        self.reports.iter().find(|r| r.region.name == name)
    }

    /// Regions that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RegionReport> {
        self.reports.iter().filter(|r| !r.passed())
    }
}

/// Verify `regions` one after another.
pub fn verify_regions<'a, B, I>(transport: &mut CfgTransport<B>, regions: I) -> SelfTest
where
    B: RegisterBus,
    I: IntoIterator<Item = &'a Region>,
{
    SelfTest {
        reports: regions
            .into_iter()
            .map(|region| verify_region(transport, region))
            .collect(),
    }
}

/// Verify conv1, conv2 and fc, in that order.
pub fn verify_all<B: RegisterBus>(transport: &mut CfgTransport<B>) -> SelfTest {
    verify_regions(transport, &REGIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::software::{Command, Fault, SoftwareBackend};
    use std::time::Duration;
    use wakey_chip::{RegisterMap, Slot, CONV1, CONV2, FC};

    fn transport() -> CfgTransport<SoftwareBackend> {
        CfgTransport::with_map(SoftwareBackend::default(), RegisterMap::WAKEY, Duration::ZERO)
            .unwrap()
    }

    #[test]
    fn healthy_memory_passes_every_region() {
        let mut t = transport();
        let result = verify_all(&mut t);
        assert!(result.all_passed());
        assert_eq!(result.reports().len(), 3);
        assert_eq!(
            result.report("fc").map(|r| r.verdict),
            Some(Verdict::Pass { entries: 418 })
        );
    }

    #[test]
    fn stuck_entry_reports_first_failure_and_stops() {
        let mut t = transport();
        t.bus_mut().inject(Fault::StuckAt {
            address: CONV1.base + 3,
            words: Words::new([9, 9, 9, 9]),
        });
        let report = verify_region(&mut t, &CONV1);
        let m = report.mismatch().expect("conv1 must fail");
        assert_eq!(m.address(), 0x03);
        assert_eq!(m.expected, Words::new([3, 4, 5, 6]));
        assert_eq!(m.observed, Words::new([9, 9, 9, 9]));

        let last_load = t
            .bus()
            .commands()
            .iter()
            .rev()
            .find_map(|c| match *c {
                Command::Load { address } => Some(address),
                Command::Store { .. } => None,
            });
        assert_eq!(last_load, Some(0x03));
    }

    #[test]
    fn mismatch_renders_exp_obs() {
        let mut t = transport();
        t.bus_mut().inject(Fault::CorruptWord { address: 0x51, word: 1, value: 0x7F });
        let report = verify_region(&mut t, &CONV2);
        let text = report.mismatch().unwrap().to_string();
        assert_eq!(text, "mismatch at 0x051 (bank 0, entry 1)\nEXP: 1 2\nOBS: 1 7F");
    }

    #[test]
    fn shift_slot_failure_is_located() {
        let mut t = transport();
        t.bus_mut().inject(Fault::CorruptWord { address: 0x400, word: 0, value: 1 });
        let report = verify_region(&mut t, &FC);
        let m = report.mismatch().unwrap();
        assert_eq!(m.entry.slot, Slot::Shift(1));
        assert_eq!(m.compared, 1);
    }
}
