//! Collaborators shared by every segment of a run.

use std::path::PathBuf;
use std::sync::Arc;

use crate::media::MediaEncoder;
use crate::provider::{Fetcher, ImageGenerator, SpeechSynthesizer, TextGenerator};

/// Default size requested from the image endpoint.
pub const DEFAULT_IMAGE_SIZE: &str = "1792x1024";

/// Remote endpoints, local encoder and scratch directory used by a run.
///
/// Cloning is cheap; each [`GenerationRun`](crate::GenerationRun) keeps its
/// own clone so runs never share mutable state.
#[derive(Clone)]
pub struct Toolkit {
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub fetcher: Arc<dyn Fetcher>,
    pub media: Arc<dyn MediaEncoder>,
    /// Directory that holds every temporary artifact
    pub work_dir: PathBuf,
    /// Size passed to the image endpoint (e.g. "1792x1024")
    pub image_size: String,
}

impl Toolkit {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        fetcher: Arc<dyn Fetcher>,
        media: Arc<dyn MediaEncoder>,
    ) -> Self {
        Self {
            text,
            images,
            speech,
            fetcher,
            media,
            work_dir: std::env::temp_dir().join("vidmaker"),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }

    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_image_size(mut self, size: &str) -> Self {
        self.image_size = size.to_string();
        self
    }
}
