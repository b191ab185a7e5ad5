//! Error types for the mSBC SCO bridge

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("PCM error: {0}")]
    Pcm(#[from] PcmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec session errors
///
/// The `Display` output is the human-readable mapping used in the
/// worker loop diagnostics.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Codec initialization failed: {0}")]
    Init(String),

    #[error("Codec not initialized")]
    NotInitialized,

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid SBC frame size: {0}")]
    InvalidFrameSize(usize),

    #[error("Missing SBC syncword")]
    SyncLost,
}

/// PCM endpoint I/O errors
#[derive(Error, Debug)]
pub enum PcmError {
    /// The PCM stream was dropped or resynchronized by its controller;
    /// anything staged from it is no longer valid.
    #[error("PCM stream is stale")]
    Stale,

    #[error("PCM I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PcmError {
    /// Whether this error only reports that a poll ended without data
    /// (read timeout or signal interruption).
    pub fn is_interrupted(&self) -> bool {
        match self {
            PcmError::Io(e) => is_interrupted(e),
            PcmError::Stale => false,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    DirNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Returns true for the error kinds a blocking poll reports when it comes
/// back without data or a failure.
pub(crate) fn is_interrupted(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
    )
}
