//! Command-line parsing and capture configuration.

use crate::backend::CaptureOptions;
use crate::error::VuError;
use anyhow::{bail, Result};
use clap::Parser;

pub const MAX_CHANNELS: usize = 128;
pub const MAX_SAMPLE_RATE: u32 = 1_000_000;
pub const MAX_BLOCK_SIZE: usize = 1_000_000;

const DEFAULT_CHANNELS: usize = 2;
const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_UPDATES_PER_SECOND: u32 = 25;
const MIN_CLI_SAMPLE_RATE: u32 = 128;
const MAX_UPDATES_PER_SECOND: u32 = 200;

/// One capture session's shape. Immutable while the session runs; changing
/// any field requires a stop/start cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of interleaved channels, 1..=128.
    pub channels: usize,
    /// Samples per second per channel, 1..=1_000_000.
    pub sample_rate: u32,
    /// Samples per channel per update block, 1..=1_000_000.
    pub block_size: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), VuError> {
        if !(1..=MAX_CHANNELS).contains(&self.channels) {
            return Err(VuError::InvalidConfig(
                "channel count must be between 1 and 128",
            ));
        }
        if !(1..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(VuError::InvalidConfig(
                "sample rate must be between 1 and 1000000 Hz",
            ));
        }
        if !(1..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(VuError::InvalidConfig(
                "block size must be between 1 and 1000000 samples",
            ));
        }
        Ok(())
    }

    /// Interleaved samples in one block across all channels.
    pub fn samples_per_block(&self) -> usize {
        self.channels * self.block_size
    }
}

/// CLI options for the terminal meter binary.
#[derive(Debug, Parser, Clone)]
#[command(about = "Terminal peak-level meter for a PulseAudio source", version)]
pub struct MeterConfig {
    /// PulseAudio server to connect to; empty or "default" for the system default
    #[arg(long)]
    pub server: Option<String>,

    /// Source device to monitor; empty or "default" for the system default
    #[arg(long)]
    pub device: Option<String>,

    /// Number of channels to meter
    #[arg(long, default_value_t = DEFAULT_CHANNELS)]
    pub channels: usize,

    /// Sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub rate: u32,

    /// Peak updates per second; determines the capture block size
    #[arg(long, default_value_t = DEFAULT_UPDATES_PER_SECOND)]
    pub updates: u32,

    /// Enable debug logging on stderr
    #[arg(long)]
    pub verbose: bool,
}

impl MeterConfig {
    /// Check CLI values before any stream is opened.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CHANNELS).contains(&self.channels) {
            bail!(
                "--channels must be between 1 and {MAX_CHANNELS}, got {}",
                self.channels
            );
        }
        if !(MIN_CLI_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.rate) {
            bail!(
                "--rate must be between {MIN_CLI_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.rate
            );
        }
        if !(1..=MAX_UPDATES_PER_SECOND).contains(&self.updates) {
            bail!(
                "--updates must be between 1 and {MAX_UPDATES_PER_SECOND}, got {}",
                self.updates
            );
        }
        self.engine_config().validate()?;
        Ok(())
    }

    /// Derive the session shape; one block per display update.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            channels: self.channels,
            sample_rate: self.rate,
            block_size: (self.rate / self.updates).max(1) as usize,
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions::new("vumeter", "Peak monitor")
            .with_server(self.server.clone())
            .with_device(self.device.clone())
    }
}
