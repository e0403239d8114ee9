//! Error taxonomy for the generation pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Rewrite,
    Image,
    Audio,
    Render,
    Concat,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Rewrite => "rewrite",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Render => "render",
            Self::Concat => "concat",
        };
        f.write_str(name)
    }
}

/// Generation pipeline errors
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no API credential configured")]
    NoCredential,

    #[error("no prompt was set before building segments")]
    NoPrompt,

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("transient {stage} failure: {message}")]
    Transient { stage: Stage, message: String },

    #[error("{stage} request rejected ({status}): {message}")]
    Remote {
        stage: Stage,
        status: u16,
        message: String,
    },

    #[error("{stage} failed after {attempts} attempts")]
    RetryExhausted { stage: Stage, attempts: u32 },

    #[error("audio generation for segment {segment} failed after {attempts} attempts")]
    AudioGenerationExhausted { segment: usize, attempts: u32 },

    #[error("cannot render segment {segment}: missing {missing}")]
    PreconditionFailure {
        segment: usize,
        missing: &'static str,
    },

    #[error("image source is neither a URL nor an existing file: {0}")]
    InvalidImageSource(PathBuf),

    #[error("run is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("FFmpeg error: {0}")]
    Media(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    /// Whether a fresh attempt of the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Stage the error belongs to, when it is tied to one.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Fetch { .. } => Some(Stage::Fetch),
            Self::Transient { stage, .. }
            | Self::Remote { stage, .. }
            | Self::RetryExhausted { stage, .. } => Some(*stage),
            Self::AudioGenerationExhausted { .. } => Some(Stage::Audio),
            Self::PreconditionFailure { .. } => Some(Stage::Render),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
