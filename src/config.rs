//! Tunnel endpoint configuration.
//!
//! [`TunnelConfig`] names the two channels of a tunnel, sizes the
//! reassembly buffer, and tunes the outbound pacing. It deserialises from
//! TOML with every field optional:
//!
//! ```toml
//! tx_channel = 0x700
//! rx_channel = 0x701
//! buffer_capacity = 256
//! chunk_payload_cap = 7
//! inter_chunk_delay_us = 0
//! ```

use std::{
    fs,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    frame::{ChannelId, DEFAULT_RX_CHANNEL, DEFAULT_TX_CHANNEL},
    tunnel::{Fragmenter, MAX_CHUNK_PAYLOAD, Reassembler},
};

/// Reassembly buffer slots used when none are configured.
pub const DEFAULT_BUFFER_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(255);

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration text is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// Both directions use the same identifier.
    #[error("tx and rx channels must differ, both are {0}")]
    SameChannel(ChannelId),
    /// The buffer cannot hold a single full chunk.
    #[error("buffer capacity {0} cannot hold a {MAX_CHUNK_PAYLOAD}-byte chunk")]
    BufferTooSmall(usize),
    /// The chunk cap lies outside `1..=MAX_CHUNK_PAYLOAD`.
    #[error("chunk payload cap {0} must be between 1 and {MAX_CHUNK_PAYLOAD}")]
    ChunkCap(usize),
}

/// Settings for one tunnel endpoint.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TunnelConfig {
    /// Identifier this endpoint sends chunks on.
    pub tx_channel: ChannelId,
    /// Identifier this endpoint receives chunks on.
    pub rx_channel: ChannelId,
    /// Reassembly buffer slots; one slot always stays free.
    pub buffer_capacity: NonZeroUsize,
    /// Largest payload per outbound chunk.
    pub chunk_payload_cap: usize,
    /// Pause between outbound chunks, in microseconds. Zero disables it.
    pub inter_chunk_delay_us: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            tx_channel: DEFAULT_TX_CHANNEL,
            rx_channel: DEFAULT_RX_CHANNEL,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            chunk_payload_cap: MAX_CHUNK_PAYLOAD,
            inter_chunk_delay_us: 0,
        }
    }
}

impl TunnelConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and any error from
    /// [`TunnelConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`TunnelConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the settings are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SameChannel`] when both directions share an
    /// identifier, [`ConfigError::BufferTooSmall`] when a full chunk cannot
    /// fit, and [`ConfigError::ChunkCap`] for an out-of-range chunk cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tx_channel == self.rx_channel {
            return Err(ConfigError::SameChannel(self.tx_channel));
        }
        if self.buffer_capacity.get() <= MAX_CHUNK_PAYLOAD {
            return Err(ConfigError::BufferTooSmall(self.buffer_capacity.get()));
        }
        if !(1..=MAX_CHUNK_PAYLOAD).contains(&self.chunk_payload_cap) {
            return Err(ConfigError::ChunkCap(self.chunk_payload_cap));
        }
        Ok(())
    }

    /// Configuration for the peer endpoint: channels swapped, rest kept.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            tx_channel: self.rx_channel,
            rx_channel: self.tx_channel,
            ..*self
        }
    }

    /// Pause between outbound chunks, if any.
    #[must_use]
    pub fn inter_chunk_delay(&self) -> Option<Duration> {
        Some(Duration::from_micros(self.inter_chunk_delay_us)).filter(|delay| !delay.is_zero())
    }

    /// Build the outbound half described by this configuration.
    #[must_use]
    pub fn fragmenter(&self) -> Fragmenter {
        let mut fragmenter = Fragmenter::new(self.tx_channel);
        if let Some(cap) = NonZeroUsize::new(self.chunk_payload_cap) {
            fragmenter = fragmenter.with_chunk_payload_cap(cap);
        }
        if let Some(delay) = self.inter_chunk_delay() {
            fragmenter = fragmenter.with_inter_chunk_delay(delay);
        }
        fragmenter
    }

    /// Build the inbound half described by this configuration.
    #[must_use]
    pub fn reassembler(&self) -> Reassembler {
        Reassembler::new(self.rx_channel, self.buffer_capacity)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = TunnelConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(config, TunnelConfig::default());
        assert_eq!(config.tx_channel, ChannelId::new(0x700));
        assert_eq!(config.rx_channel, ChannelId::new(0x701));
        assert_eq!(config.buffer_capacity.get(), 256);
        assert_eq!(config.inter_chunk_delay(), None);
    }

    #[test]
    fn parses_all_fields() {
        let config = TunnelConfig::from_toml_str(
            "tx_channel = 0x601\nrx_channel = 0x600\nbuffer_capacity = 512\n\
             chunk_payload_cap = 6\ninter_chunk_delay_us = 250\n",
        )
        .expect("valid config");
        assert_eq!(config.tx_channel, ChannelId::new(0x601));
        assert_eq!(config.rx_channel, ChannelId::new(0x600));
        assert_eq!(config.buffer_capacity.get(), 512);
        assert_eq!(config.fragmenter().chunk_payload_cap().get(), 6);
        assert_eq!(config.inter_chunk_delay(), Some(Duration::from_micros(250)));
    }

    #[rstest]
    #[case("tx_channel = 0x701")]
    #[case("buffer_capacity = 7")]
    #[case("chunk_payload_cap = 0")]
    #[case("chunk_payload_cap = 8")]
    fn rejects_inconsistent_settings(#[case] text: &str) {
        let err = TunnelConfig::from_toml_str(text).expect_err("invalid config");
        assert!(
            matches!(
                err,
                ConfigError::SameChannel(_)
                    | ConfigError::BufferTooSmall(_)
                    | ConfigError::ChunkCap(_)
            ),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    #[case("buffer_capacity = 0")]
    #[case("unknown = 1")]
    #[case("tx_channel = \"700\"")]
    fn rejects_malformed_documents(#[case] text: &str) {
        let err = TunnelConfig::from_toml_str(text).expect_err("malformed config");
        assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TunnelConfig::load("/nonexistent/uart-over-can.toml").expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn mirrored_swaps_channels() {
        let config = TunnelConfig::default();
        let peer = config.mirrored();
        assert_eq!(peer.tx_channel, config.rx_channel);
        assert_eq!(peer.rx_channel, config.tx_channel);
        assert_eq!(peer.buffer_capacity, config.buffer_capacity);
    }
}
