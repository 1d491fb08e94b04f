// SPDX-License-Identifier: AGPL-3.0-only

//! `wakey` — bring-up tool for the Wakey Wakey configuration memory.
//!
//! ```text
//! USAGE:
//!   wakey selftest [--region <name>]...   Verify conv1 / conv2 / fc
//!   wakey store <addr> <w3> <w2> <w1> <w0> Store one entry (MSB first)
//!   wakey load <addr>                      Load one entry (printed LSB first)
//!   wakey regions                          Print the region layout
//!
//!   --sw          use a fresh simulated memory instead of the hardware block
//!   --settle-ns   override the load settling delay
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wakey_driver::chip::{region, Region, Words, REGIONS};
use wakey_driver::{
    select_backend, verify_regions, BackendSelection, CfgTransport, RegisterBus, TransportConfig,
};

#[derive(Parser)]
#[command(name = "wakey", about = "Wakey Wakey configuration memory bring-up", version)]
struct Cli {
    /// Use the simulated configuration memory (no hardware required).
    ///
    /// Every invocation starts from an empty simulated memory, so a lone
    /// `load` reads zeros and a lone `store` is not kept.
    #[arg(long, global = true)]
    sw: bool,

    /// Load settling delay in nanoseconds (overrides WAKEY_SETTLE_NS).
    #[arg(long, global = true)]
    settle_ns: Option<u64>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write and read back every region, report PASS/FAIL per region.
    Selftest {
        /// Only verify these regions (conv1, conv2, fc).
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// Store one entry; words are given MSB first.
    Store {
        /// Configuration-memory address (e.g. 0x15).
        #[arg(value_parser = maybe_hex::<u32>)]
        address: u32,
        /// Data word 3 (MSB).
        #[arg(value_parser = maybe_hex::<u32>)]
        w3: u32,
        /// Data word 2.
        #[arg(value_parser = maybe_hex::<u32>)]
        w2: u32,
        /// Data word 1.
        #[arg(value_parser = maybe_hex::<u32>)]
        w1: u32,
        /// Data word 0 (LSB).
        #[arg(value_parser = maybe_hex::<u32>)]
        w0: u32,
    },
    /// Load one entry and print its words LSB first.
    Load {
        /// Configuration-memory address (e.g. 0x15).
        #[arg(value_parser = maybe_hex::<u32>)]
        address: u32,
    },
    /// Print the configuration-memory region layout.
    Regions,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = TransportConfig::from_env().context("reading WAKEY_* environment")?;
    if let Some(ns) = cli.settle_ns {
        config = config.with_settle(Duration::from_nanos(ns));
    }
    let selection = if cli.sw {
        BackendSelection::Software
    } else {
        BackendSelection::Mmap
    };

    match cli.command {
        Cmd::Selftest { regions } => cmd_selftest(&config, selection, &regions)?,
        Cmd::Store { address, w3, w2, w1, w0 } => {
            cmd_store(&config, selection, address, Words::from_msb_first(w3, w2, w1, w0))?;
        }
        Cmd::Load { address } => cmd_load(&config, selection, address)?,
        Cmd::Regions => cmd_regions(),
    }

    Ok(())
}

fn open(
    config: &TransportConfig,
    selection: BackendSelection,
) -> Result<CfgTransport<Box<dyn RegisterBus>>> {
    let bus = select_backend(selection, config).with_context(|| {
        format!(
            "opening configuration block at {:#x} via {}",
            config.base_address,
            config.mem_device.display()
        )
    })?;
    tracing::debug!("Using {} backend", bus.backend_type());
    Ok(CfgTransport::new(bus, config)?)
}

fn cmd_selftest(
    config: &TransportConfig,
    selection: BackendSelection,
    names: &[String],
) -> Result<()> {
    let regions: Vec<&Region> = if names.is_empty() {
        REGIONS.iter().collect()
    } else {
        names
            .iter()
            .map(|n| Region::by_name(n).ok_or_else(|| anyhow::anyhow!("Unknown region: {n}")))
            .collect::<Result<_>>()?
    };

    let mut transport = open(config, selection)?;
    let result = verify_regions(&mut transport, regions);

    for report in result.reports() {
        let label = format!("{:>5} MEM: ", report.region.name.to_uppercase());
        match report.mismatch() {
            None => println!("{label}PASS"),
            Some(m) => {
                println!("{label}FAIL");
                println!("{m}");
            }
        }
    }

    if !result.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_store(
    config: &TransportConfig,
    selection: BackendSelection,
    address: u32,
    words: Words,
) -> Result<()> {
    note_region(address);
    let mut transport = open(config, selection)?;
    transport.store(address, &words);
    println!("{address:#05x} <- {words}");
    Ok(())
}

fn cmd_load(config: &TransportConfig, selection: BackendSelection, address: u32) -> Result<()> {
    let significant = note_region(address);
    let mut transport = open(config, selection)?;
    let words = transport.load(address);
    println!("{address:#05x} -> {words}");
    if significant < 4 {
        println!("         ({significant} significant: {})", words.display_within(significant));
    }
    Ok(())
}

/// Print where `address` lives and return its significant word count.
fn note_region(address: u32) -> usize {
    match region::locate(address) {
        Some((r, entry)) => {
            println!("{}: {entry}", r.name);
            r.significant_words()
        }
        None => {
            eprintln!("warning: {address:#05x} is outside every region");
            4
        }
    }
}

fn cmd_regions() {
    for r in &REGIONS {
        println!("{r}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn store_takes_words_msb_first() {
        let cli = Cli::parse_from(["wakey", "--sw", "store", "0x15", "8", "7", "6", "5"]);
        assert!(cli.sw);
        match cli.command {
            Cmd::Store { address, w3, w0, .. } => {
                assert_eq!(address, 0x15);
                assert_eq!(w3, 8);
                assert_eq!(w0, 5);
            }
            _ => panic!("expected store"),
        }
    }

    #[test]
    fn addresses_and_words_accept_hex_or_decimal() {
        let cli = Cli::parse_from(["wakey", "store", "0x400", "255", "0", "0", "0xff"]);
        match cli.command {
            Cmd::Store { address, w3, w0, .. } => {
                assert_eq!(address, 0x400);
                assert_eq!(w3, 255);
                assert_eq!(w0, 0xFF);
            }
            _ => panic!("expected store"),
        }
        assert!(Cli::try_parse_from(["wakey", "load", "0x100000000"]).is_err());
        assert!(Cli::try_parse_from(["wakey", "load", "fc"]).is_err());
    }

    #[test]
    fn sw_help_warns_memory_starts_empty() {
        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|a| a.get_id() == "sw")
            .and_then(|a| a.get_long_help())
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(help.contains("empty simulated memory"));
    }

    #[test]
    fn selftest_accepts_region_filter() {
        let cli = Cli::parse_from(["wakey", "selftest", "--region", "fc", "--region", "conv2"]);
        match cli.command {
            Cmd::Selftest { regions } => assert_eq!(regions, vec!["fc", "conv2"]),
            _ => panic!("expected selftest"),
        }
    }

    #[test]
    fn unknown_region_rejected() {
        let config = TransportConfig::default().with_settle(Duration::ZERO);
        let err = cmd_selftest(&config, BackendSelection::Software, &["conv9".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("conv9"));
    }
}
