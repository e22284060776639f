use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the capture pipeline
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No phrase was set before a session was requested
    #[error("no phrase set; call set_phrase before starting a session")]
    MissingPhrase,

    /// Phrase cannot be used as a path component
    #[error("invalid phrase {0:?}: must be non-empty and contain no path separators")]
    InvalidPhrase(String),

    /// Data root is empty or could not be prepared
    #[error("data root is not configured or unusable: {0}")]
    MissingRoot(String),

    /// Other configuration value is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Directory creation or file write failed
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image encoding failed
    #[error("failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Raw frame buffer does not match the configured dimensions
    #[error("{kind} frame has {actual} elements, expected {expected}")]
    FrameSize {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Commit aborted part way through; the partial output was rolled back
    #[error("commit of session {session_id} failed after {frames_written} frames: {source}")]
    CommitFailed {
        session_id: u32,
        frames_written: usize,
        #[source]
        source: Box<CaptureError>,
    },

    /// The sensor is not available
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
}

impl CaptureError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
