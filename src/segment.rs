//! One narrated unit of the final video.
//!
//! A [`Segment`] holds a passage of text plus the image, audio and video
//! files produced for it. The `request_*` methods only borrow the segment
//! and return a fresh artifact, so a caller can retry them freely and attach
//! the winner afterwards; the mutating methods wrap a single attempt.

use std::path::Path;

use futures::StreamExt;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument};

use crate::artifact::{create_temp, discard, reserve_temp, ImageArtifact, ImageSource};
use crate::error::{GenerationError, Result, Stage};
use crate::provider::ApiKey;
use crate::toolkit::Toolkit;

/// A passage of narration and the media generated for it.
#[derive(Debug)]
pub struct Segment {
    index: usize,
    text: String,
    credential: Option<ApiKey>,
    image: Option<ImageArtifact>,
    audio: Option<TempPath>,
    video: Option<TempPath>,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>, credential: Option<ApiKey>) -> Self {
        Self {
            index,
            text: text.into(),
            credential,
            image: None,
            audio: None,
            video: None,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    #[must_use]
    pub fn image_path(&self) -> Option<&Path> {
        self.image.as_ref().map(ImageArtifact::path)
    }

    #[must_use]
    pub fn audio_path(&self) -> Option<&Path> {
        self.audio.as_deref()
    }

    #[must_use]
    pub fn video_path(&self) -> Option<&Path> {
        self.video.as_deref()
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Prompt sent to the image endpoint for this segment.
    #[must_use]
    pub fn image_prompt(&self) -> String {
        format!(
            "Digital art that envisions the following prompt: \"{}\"",
            self.text
        )
    }

    fn key(&self) -> Result<&ApiKey> {
        self.credential.as_ref().ok_or(GenerationError::NoCredential)
    }

    /// Attach an image, releasing any previous one.
    pub fn set_image(&mut self, image: ImageArtifact) {
        if let Some(old) = self.image.replace(image) {
            old.release();
        }
    }

    /// Attach an audio file, releasing any previous one.
    pub fn set_audio(&mut self, audio: TempPath) {
        if let Some(old) = self.audio.replace(audio) {
            discard(old);
        }
    }

    /// Download `url` into an owned temp file.
    pub async fn download_image(&self, url: &str, kit: &Toolkit) -> Result<ImageArtifact> {
        let doc = kit.fetcher.fetch(url).await?;
        if doc.bytes.is_empty() {
            return Err(GenerationError::Transient {
                stage: Stage::Image,
                message: format!("empty image body from {url}"),
            });
        }
        let suffix = image_suffix(&doc.content_type, url);
        let temp = create_temp(&kit.work_dir, suffix)?;
        let (file, path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&doc.bytes).await?;
        file.flush().await?;
        debug!(segment = self.index, bytes = doc.bytes.len(), "Image saved to {:?}", &*path);
        Ok(ImageArtifact::Owned(path))
    }

    /// Generate an image for the text and download it. One attempt.
    #[instrument(skip_all, fields(segment = self.index))]
    pub async fn request_image(&self, kit: &Toolkit) -> Result<ImageArtifact> {
        let key = self.key()?;
        let url = kit
            .images
            .generate(&self.image_prompt(), &kit.image_size, key)
            .await?;
        self.download_image(&url, kit).await
    }

    /// Synthesize narration for the text into an owned `.mp3`. One attempt.
    #[instrument(skip_all, fields(segment = self.index))]
    pub async fn request_audio(&self, kit: &Toolkit) -> Result<TempPath> {
        let key = self.key()?;
        let mut stream = kit.speech.synthesize(&self.text, key).await?;

        let temp = create_temp(&kit.work_dir, ".mp3")?;
        let (file, path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(GenerationError::Transient {
                stage: Stage::Audio,
                message: "speech endpoint returned no audio".to_string(),
            });
        }
        debug!(bytes = written, "Audio saved to {:?}", &*path);
        Ok(path)
    }

    /// Attach an image from `source`, or generate one when there is none.
    ///
    /// URLs are downloaded into owned files; local paths must exist and are
    /// referenced in place.
    pub async fn acquire_image(
        &mut self,
        source: Option<&ImageSource>,
        kit: &Toolkit,
    ) -> Result<()> {
        let image = match source {
            Some(ImageSource::Url(url)) => self.download_image(url, kit).await?,
            Some(ImageSource::Path(path)) => ImageArtifact::reference(path)?,
            None => return self.generate_image(kit).await,
        };
        self.set_image(image);
        Ok(())
    }

    /// Generate and attach an image in a single attempt.
    ///
    /// On failure the image stays unset.
    pub async fn generate_image(&mut self, kit: &Toolkit) -> Result<()> {
        match self.request_image(kit).await {
            Ok(image) => {
                self.set_image(image);
                Ok(())
            }
            Err(e) => {
                error!(segment = self.index, "Image failed to generate: {}", e);
                Err(e)
            }
        }
    }

    /// Synthesize and attach narration in a single attempt.
    ///
    /// On failure the audio stays unset.
    pub async fn generate_audio(&mut self, kit: &Toolkit) -> Result<()> {
        match self.request_audio(kit).await {
            Ok(audio) => {
                self.set_audio(audio);
                Ok(())
            }
            Err(e) => {
                error!(segment = self.index, "Audio failed to generate: {}", e);
                Err(e)
            }
        }
    }

    /// Render the attached image as a still clip lasting exactly as long as
    /// the attached audio.
    #[instrument(skip_all, fields(segment = self.index))]
    pub async fn render(&mut self, kit: &Toolkit) -> Result<()> {
        let missing = |what| GenerationError::PreconditionFailure {
            segment: self.index,
            missing: what,
        };
        let image = self.image.as_ref().ok_or_else(|| missing("image"))?;
        let audio = self.audio.as_deref().ok_or_else(|| missing("audio"))?;

        let duration = kit.media.probe_duration(audio).await?;
        let output = reserve_temp(&kit.work_dir, ".mp4")?;
        kit.media
            .render_still(image.path(), audio, duration, &output)
            .await?;
        info!(duration, "Rendered clip {:?}", &*output);

        if let Some(old) = self.video.replace(output) {
            discard(old);
        }
        Ok(())
    }

    /// Delete the owned image and the audio file. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(image) = self.image.take() {
            image.release();
        }
        if let Some(audio) = self.audio.take() {
            discard(audio);
        }
    }

    /// [`release`](Self::release) plus the rendered clip.
    pub fn release_all(&mut self) {
        self.release();
        if let Some(video) = self.video.take() {
            discard(video);
        }
    }
}

/// File suffix for a downloaded image, from its content type or URL.
fn image_suffix(content_type: &str, url: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" => return ".jpg",
        "image/webp" => return ".webp",
        "image/png" => return ".png",
        _ => {}
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => ".jpg",
        "webp" => ".webp",
        _ => ".png",
    }
}
