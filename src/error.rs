//! Error types for the vibrato client
//!
//! Grammar errors are returned synchronously to whoever is configuring a
//! parameter; nothing on the per-block audio path produces a recoverable
//! error. A port that cannot be resolved is not an error at all, it is the
//! normal state of a source whose provider has not started yet.

use std::fmt;

/// Client-level error type
#[derive(Debug)]
pub enum VibratoError {
    /// A parameter specification token matched none of the grammar rules
    ParseSpec(String),
    /// No audio output device is available
    NoOutputDevice,
    /// The output device reported a sample format we cannot render to
    UnsupportedSampleFormat(String),
    /// Building or starting the output stream failed
    Stream(String),
}

impl fmt::Display for VibratoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VibratoError::ParseSpec(token) => {
                write!(f, "could not parse parameter spec: {:?}", token)
            }
            VibratoError::NoOutputDevice => write!(f, "no audio output device found"),
            VibratoError::UnsupportedSampleFormat(format) => {
                write!(f, "unsupported sample format: {}", format)
            }
            VibratoError::Stream(msg) => write!(f, "audio stream error: {}", msg),
        }
    }
}

impl std::error::Error for VibratoError {}

/// Result type for vibrato operations
pub type Result<T> = std::result::Result<T, VibratoError>;
