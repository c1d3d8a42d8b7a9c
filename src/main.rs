//! `uart-over-can` binary: bridge standard streams and frame text.
//!
//! `encode` reads raw bytes from stdin and prints one candump-style frame
//! per chunk. `decode` reads frame lines, such as `candump` output, and
//! writes the reassembled stream to stdout.

mod cli;

use std::{
    error::Error,
    io::{self, BufRead, Read, Write},
    num::NonZeroUsize,
};

use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use uart_over_can::{CanFrame, ChannelId, TextSink, TunnelConfig};

use crate::cli::{Cli, Command, TunnelArgs};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    // Logs go to stderr so they never interleave with tunnel data on stdout.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level_for(cli.verbose))
        .init();

    let config = resolve_config(&cli.tunnel)?;
    debug!(?config, "resolved tunnel configuration");

    let stdin = io::stdin();
    let stdout = io::stdout();
    match cli.command {
        Command::Encode => {
            let frames = encode(&config, stdin.lock(), stdout.lock())?;
            info!(frames, channel = %config.tx_channel, "encoded input");
        }
        Command::Decode => {
            let summary = decode(&config, stdin.lock(), stdout.lock())?;
            info!(
                frames = summary.frames,
                consumed = summary.consumed,
                messages = summary.messages,
                channel = %config.rx_channel,
                "decoded input"
            );
        }
    }
    Ok(())
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn resolve_config(args: &TunnelArgs) -> Result<TunnelConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => TunnelConfig::load(path)?,
        None => TunnelConfig::default(),
    };
    if let Some(id) = args.tx_channel {
        config.tx_channel = ChannelId::new(id);
    }
    if let Some(id) = args.rx_channel {
        config.rx_channel = ChannelId::new(id);
    }
    if let Some(capacity) = args.capacity {
        config.buffer_capacity =
            NonZeroUsize::new(capacity).ok_or("buffer capacity must be non-zero")?;
    }
    if let Some(cap) = args.chunk_cap {
        config.chunk_payload_cap = cap;
    }
    config.validate()?;
    Ok(config)
}

/// Chunk everything read from `input` and write one frame line per chunk.
fn encode(
    config: &TunnelConfig,
    mut input: impl Read,
    output: impl Write,
) -> Result<usize, Box<dyn Error>> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    let mut sink = TextSink::new(output);
    let frames = config.fragmenter().send(&data, &mut sink)?;
    sink.into_inner().flush()?;
    Ok(frames)
}

/// Counts reported by [`decode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct DecodeSummary {
    /// Lines that parsed as frames.
    frames: usize,
    /// Frames accepted by the reassembler.
    consumed: usize,
    /// Chunks carrying the last-chunk marker.
    messages: u64,
}

/// Feed frame lines from `input` through a reassembler, streaming the
/// recovered bytes to `output`.
///
/// The frame is taken from the last whitespace-separated token of each line,
/// so plain `701#...` lines and `candump` logs are both accepted.
fn decode(
    config: &TunnelConfig,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<DecodeSummary, Box<dyn Error>> {
    let mut reassembler = config.reassembler();
    let mut summary = DecodeSummary::default();
    for line in input.lines() {
        let line = line?;
        let Some(token) = line.split_whitespace().last() else {
            continue;
        };
        match token.parse::<CanFrame>() {
            Ok(frame) => {
                summary.frames += 1;
                if reassembler.handle_frame(&frame) {
                    summary.consumed += 1;
                }
            }
            Err(err) => {
                warn!(error = %err, "skipping unparsable line");
                continue;
            }
        }
        let bytes = reassembler.read_bytes(usize::MAX);
        if !bytes.is_empty() {
            output.write_all(&bytes)?;
        }
    }
    output.flush()?;

    if summary.frames > 0 && summary.consumed == 0 {
        warn!(
            frames = summary.frames,
            rx = %config.rx_channel,
            "no frame matched the receive channel; set --rx-channel to the sender's channel"
        );
    }
    summary.messages = reassembler.completed_messages();
    Ok(summary)
}
