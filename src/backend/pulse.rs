//! PulseAudio record stream over the blocking `psimple` API.

use super::{CaptureBackend, CaptureOptions};
use crate::config::EngineConfig;
use crate::error::VuError;
use libpulse_binding::def::BufferAttr;
use libpulse_binding::sample::{Format, Spec};
use libpulse_binding::stream::Direction;
use libpulse_simple_binding::Simple;
use std::mem;
use tracing::debug;

/// One open record stream. Not `Send`: it is opened and read entirely on
/// the capture worker thread.
pub struct PulseCapture {
    stream: Simple,
    bytes: Vec<u8>,
}

impl PulseCapture {
    /// Open a record stream sized so each read delivers exactly one block.
    pub fn open(options: &CaptureOptions, config: &EngineConfig) -> Result<Self, VuError> {
        config.validate()?;
        options.validate()?;

        let spec = Spec {
            format: Format::S32NE,
            channels: config.channels as u8,
            rate: config.sample_rate,
        };
        if !spec.is_valid() {
            return Err(VuError::InvalidConfig("unsupported sample specification"));
        }

        let byte_len = config.samples_per_block() * mem::size_of::<i32>();
        let attr = BufferAttr {
            maxlength: u32::MAX,
            tlength: u32::MAX,
            prebuf: u32::MAX,
            minreq: u32::MAX,
            fragsize: byte_len as u32,
        };

        let stream = Simple::new(
            options.server(),
            &options.app_name,
            Direction::Record,
            options.device(),
            &options.stream_label,
            &spec,
            None,
            Some(&attr),
        )
        .map_err(|err| VuError::BackendOpen(format!("{err}")))?;

        debug!(
            channels = config.channels,
            rate = config.sample_rate,
            fragment_bytes = byte_len,
            "opened PulseAudio record stream"
        );

        Ok(Self {
            stream,
            bytes: vec![0u8; byte_len],
        })
    }
}

impl CaptureBackend for PulseCapture {
    fn read_block(&mut self, block: &mut [i32]) -> Result<(), VuError> {
        debug_assert_eq!(block.len() * mem::size_of::<i32>(), self.bytes.len());
        self.stream
            .read(&mut self.bytes)
            .map_err(|err| VuError::BackendRead(format!("{err}")))?;
        for (sample, chunk) in block.iter_mut().zip(self.bytes.chunks_exact(4)) {
            *sample = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }
}
