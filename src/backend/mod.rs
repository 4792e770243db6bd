//! Capture backends feeding the metering engine.
//!
//! A backend is a blocking record stream that fills fixed-size blocks of
//! interleaved signed 32-bit samples. The engine talks to it through the
//! [`CaptureBackend`] trait so tests can substitute scripted sources for
//! the real PulseAudio stream.

mod pulse;

pub use pulse::PulseCapture;

use crate::error::VuError;

/// Blocking record stream yielding fixed-size sample blocks.
pub trait CaptureBackend {
    /// Fill `block` with exactly one block of interleaved signed 32-bit
    /// samples, blocking until the backend has delivered all of it.
    fn read_block(&mut self, block: &mut [i32]) -> Result<(), VuError>;
}

/// Identifies what to record and how the stream announces itself to the
/// sound server.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Server to connect to; `None`, empty, or `"default"` means the
    /// system default.
    pub server: Option<String>,
    /// Application name shown in the server's client list.
    pub app_name: String,
    /// Source device to record from; `None`, empty, or `"default"` means
    /// the system default.
    pub device: Option<String>,
    /// Descriptive stream name shown in mixer UIs.
    pub stream_label: String,
}

impl CaptureOptions {
    pub fn new(app_name: impl Into<String>, stream_label: impl Into<String>) -> Self {
        Self {
            server: None,
            app_name: app_name.into(),
            device: None,
            stream_label: stream_label.into(),
        }
    }

    pub fn with_server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), VuError> {
        if self.app_name.is_empty() {
            return Err(VuError::InvalidConfig("application name must not be empty"));
        }
        if self.stream_label.is_empty() {
            return Err(VuError::InvalidConfig("stream label must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn server(&self) -> Option<&str> {
        normalize_identity(self.server.as_deref())
    }

    pub(crate) fn device(&self) -> Option<&str> {
        normalize_identity(self.device.as_deref())
    }
}

/// Empty or the literal "default" collapses to `None` so the backend picks
/// the system default.
fn normalize_identity(value: Option<&str>) -> Option<&str> {
    value.filter(|identity| !identity.is_empty() && *identity != "default")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identities_collapse_to_none() {
        assert_eq!(normalize_identity(None), None);
        assert_eq!(normalize_identity(Some("")), None);
        assert_eq!(normalize_identity(Some("default")), None);
        assert_eq!(
            normalize_identity(Some("alsa_input.usb-mic")),
            Some("alsa_input.usb-mic")
        );
    }

    #[test]
    fn options_normalize_server_and_device() {
        let options = CaptureOptions::new("vumeter", "Peak monitor")
            .with_server(Some("default".into()))
            .with_device(Some("".into()));
        assert_eq!(options.server(), None);
        assert_eq!(options.device(), None);
    }

    #[test]
    fn options_require_names() {
        assert!(CaptureOptions::new("", "Peak monitor").validate().is_err());
        assert!(CaptureOptions::new("vumeter", "").validate().is_err());
        assert!(CaptureOptions::new("vumeter", "Peak monitor")
            .validate()
            .is_ok());
    }
}
