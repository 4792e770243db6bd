//! Error domain for the capture engine.

use thiserror::Error;

/// Errors surfaced by [`crate::VuEngine::start`] and recorded as session
/// faults when a read fails mid-capture.
#[derive(Debug, Clone, Error)]
pub enum VuError {
    /// Configuration bounds violation, detected synchronously at start.
    #[error("invalid capture configuration: {0}")]
    InvalidConfig(&'static str),

    /// The backend refused to open the record stream. Carries the backend's
    /// own error text verbatim.
    #[error("cannot open audio source: {0}")]
    BackendOpen(String),

    /// A blocking read failed mid-session. Terminal: the session is over.
    #[error("audio read failed: {0}")]
    BackendRead(String),

    /// The capture worker could not be brought up.
    #[error("out of resources: {0}")]
    OutOfResources(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_their_domain() {
        let err = VuError::InvalidConfig("channel count must be between 1 and 128");
        assert!(err.to_string().contains("invalid capture configuration"));

        let err = VuError::BackendOpen("Connection refused".into());
        assert!(err.to_string().contains("Connection refused"));

        let err = VuError::BackendRead("Broken pipe".into());
        assert!(err.to_string().starts_with("audio read failed"));
    }
}
