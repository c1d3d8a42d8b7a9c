//! Command line interface for the `uart-over-can` binary.
//!
//! The binary bridges standard streams and candump-style frame text:
//! `encode` chunks stdin into frame lines, `decode` reassembles frame lines
//! back into the byte stream.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Command line arguments for the `uart-over-can` binary.
#[derive(Debug, Parser)]
#[command(
    name = "uart-over-can",
    version,
    about = "Tunnel a byte stream through CAN frame text"
)]
pub struct Cli {
    #[command(flatten)]
    pub tunnel: TunnelArgs,

    /// Increase log verbosity; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied on top of the configuration file.
#[derive(Debug, Args)]
pub struct TunnelArgs {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Identifier to send chunks on, in hex.
    #[arg(long, value_parser = parse_hex_id, global = true)]
    pub tx_channel: Option<u32>,

    /// Identifier to receive chunks on, in hex.
    #[arg(long, value_parser = parse_hex_id, global = true)]
    pub rx_channel: Option<u32>,

    /// Reassembly buffer slots.
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Largest payload per outbound chunk.
    #[arg(long, global = true)]
    pub chunk_cap: Option<usize>,
}

/// Operations offered by the binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read bytes from stdin and write chunk frames to stdout.
    Encode,
    /// Read frame lines from stdin and write the reassembled bytes to stdout.
    ///
    /// Only frames on the receive channel (default 701) are decoded. To decode
    /// output of `encode` with the same settings, pass `--rx-channel 700`.
    Decode,
}

fn parse_hex_id(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|err| format!("invalid hex identifier {text:?}: {err}"))
}
