//! Run orchestration: prompt → segments → media → final video.
//!
//! A [`VideoGenerator`] holds the collaborators and retry policy; each call
//! to [`VideoGenerator::create_run`] yields an independent [`GenerationRun`]
//! that walks the stages strictly in order, one segment at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use vidmaker::{ApiKey, VideoGenerator, VidmakerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let generator = VideoGenerator::from_config(&VidmakerConfig::default())?;
//! let mut run = generator.create_run(ApiKey::new("sk-..."), Some(9));
//! run.set_prompt("Volcanoes form where magma reaches the surface.")?;
//! let video = run.run().await?;
//! println!("{}", video.display());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::artifact::{reserve_temp, ImageSource};
use crate::config::VidmakerConfig;
use crate::content;
use crate::error::{GenerationError, Result, Stage};
use crate::http_client::HttpClient;
use crate::media::Compositor;
use crate::provider::{ApiKey, OpenAiClient};
use crate::retry::{retry, RetryError, RetryPolicy};
use crate::rewrite::TextRewriter;
use crate::segment::Segment;
use crate::toolkit::Toolkit;

/// Separator between paragraphs of a prompt.
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

/// Split `text` on blank lines, keeping empty pieces.
pub fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_DELIMITER)
}

/// Stage a [`GenerationRun`] has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PromptSet,
    SegmentsBuilt,
    AudioReady,
    VideoReady,
    Concatenated,
    Failed,
}

impl RunState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PromptSet => "prompt-set",
            Self::SegmentsBuilt => "segments-built",
            Self::AudioReady => "audio-ready",
            Self::VideoReady => "video-ready",
            Self::Concatenated => "concatenated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Factory for generation runs.
#[derive(Clone)]
pub struct VideoGenerator {
    toolkit: Toolkit,
    retry: RetryPolicy,
}

impl VideoGenerator {
    pub fn new(toolkit: Toolkit, retry: RetryPolicy) -> Self {
        Self { toolkit, retry }
    }

    /// Wire the production collaborators: `OpenAI` endpoints, an HTTP fetcher
    /// and the ffmpeg compositor.
    pub fn from_config(config: &VidmakerConfig) -> Result<Self> {
        let openai = Arc::new(OpenAiClient::new(config.openai.clone())?);
        let toolkit = Toolkit::new(
            openai.clone(),
            openai.clone(),
            openai,
            Arc::new(HttpClient::new()?),
            Arc::new(Compositor::with_config(config.render.clone())),
        )
        .with_work_dir(&config.work_dir)
        .with_image_size(&config.openai.image_size);
        Ok(Self::new(toolkit, config.retry.policy()))
    }

    #[must_use]
    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Start a new run. `age` tunes the wording of the rewritten text.
    pub fn create_run(&self, credential: Option<ApiKey>, age: Option<u32>) -> GenerationRun {
        GenerationRun {
            id: Uuid::new_v4(),
            toolkit: self.toolkit.clone(),
            retry: self.retry,
            credential,
            audience_age: age,
            prompt: None,
            segments: Vec::new(),
            image_sources: BTreeMap::new(),
            output: None,
            state: RunState::Idle,
        }
    }
}

/// One prompt's journey to a finished video.
///
/// Temporary artifacts live in the segments and are deleted when the run
/// finishes, fails, or is dropped.
pub struct GenerationRun {
    id: Uuid,
    toolkit: Toolkit,
    retry: RetryPolicy,
    credential: Option<ApiKey>,
    audience_age: Option<u32>,
    prompt: Option<String>,
    segments: Vec<Segment>,
    image_sources: BTreeMap<usize, ImageSource>,
    output: Option<PathBuf>,
    state: RunState,
}

impl GenerationRun {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments, for editing text or credentials between stages.
    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    #[must_use]
    pub fn audience_age(&self) -> Option<u32> {
        self.audience_age
    }

    /// Use `source` instead of a generated image for segment `index`.
    #[must_use]
    pub fn with_image_source(mut self, index: usize, source: ImageSource) -> Self {
        self.set_image_source(index, source);
        self
    }

    pub fn set_image_source(&mut self, index: usize, source: ImageSource) {
        self.image_sources.insert(index, source);
    }

    /// Write the final video to `path` instead of a file in the work directory.
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    fn expect_state(&self, expected: RunState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GenerationError::InvalidState {
                expected: expected.name(),
                actual: self.state.name(),
            })
        }
    }

    fn expect_prompt_settable(&self) -> Result<()> {
        match self.state {
            RunState::Idle | RunState::PromptSet => Ok(()),
            other => Err(GenerationError::InvalidState {
                expected: RunState::Idle.name(),
                actual: other.name(),
            }),
        }
    }

    /// Use `text` as the prompt. Windows line endings are normalised so
    /// paragraphs still split on blank lines.
    pub fn set_prompt(&mut self, text: impl Into<String>) -> Result<()> {
        self.expect_prompt_settable()?;
        self.prompt = Some(text.into().replace("\r\n", "\n"));
        self.state = RunState::PromptSet;
        Ok(())
    }

    /// Fetch `url` and use its visible text as the prompt.
    #[instrument(skip(self), fields(run = %self.id))]
    pub async fn set_prompt_from_url(&mut self, url: &str) -> Result<()> {
        self.expect_prompt_settable()?;
        let text = content::fetch_prompt(self.toolkit.fetcher.as_ref(), url).await?;
        self.set_prompt(text)
    }

    /// Release every artifact and move to `Failed`.
    fn fail(&mut self, err: GenerationError) -> GenerationError {
        for segment in &mut self.segments {
            segment.release_all();
        }
        error!(run = %self.id, from = %self.state, "Video creation failed: {}", err);
        self.state = RunState::Failed;
        err
    }

    /// Rewrite each paragraph for the audience and split the result into
    /// segments.
    #[instrument(skip(self), fields(run = %self.id))]
    pub async fn build_segments(&mut self) -> Result<&[Segment]> {
        match self.state {
            RunState::PromptSet => {}
            RunState::Idle => {
                error!("No prompt was set");
                return Err(GenerationError::NoPrompt);
            }
            other => {
                return Err(GenerationError::InvalidState {
                    expected: RunState::PromptSet.name(),
                    actual: other.name(),
                })
            }
        }

        let prompt = self.prompt.clone().unwrap_or_default();
        let rewriter = TextRewriter::new(self.toolkit.text.clone());
        let mut segments = Vec::new();

        for (n, paragraph) in split_paragraphs(&prompt).enumerate() {
            let text = match self.rewrite_paragraph(&rewriter, n, paragraph).await {
                Ok(text) => text,
                Err(e) => return Err(self.fail(e)),
            };
            for piece in split_paragraphs(&text) {
                segments.push(Segment::new(
                    segments.len(),
                    piece,
                    self.credential.clone(),
                ));
            }
        }

        info!(segments = segments.len(), "Segments built");
        self.segments = segments;
        self.state = RunState::SegmentsBuilt;

        let unmatched = self.unmatched_image_sources();
        if !unmatched.is_empty() {
            warn!(
                segments = self.segments.len(),
                "Image sources for segments {:?} have no matching segment and will not be used",
                unmatched
            );
        }
        Ok(&self.segments)
    }

    /// Indices of supplied image sources past the last built segment.
    #[must_use]
    pub fn unmatched_image_sources(&self) -> Vec<usize> {
        self.image_sources
            .range(self.segments.len()..)
            .map(|(index, _)| *index)
            .collect()
    }

    /// Rewrite under the retry policy, falling back to the input text.
    async fn rewrite_paragraph(
        &self,
        rewriter: &TextRewriter,
        index: usize,
        paragraph: &str,
    ) -> Result<String> {
        let key = self.credential.as_ref();
        let age = self.audience_age;
        let outcome = retry(
            self.retry,
            Stage::Rewrite,
            GenerationError::is_transient,
            move |_| rewriter.rewrite(paragraph, age, key),
        )
        .await;

        match outcome {
            Ok(text) => Ok(text),
            Err(RetryError::Fatal(GenerationError::NoCredential)) => {
                Err(GenerationError::NoCredential)
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                warn!(
                    paragraph = index,
                    "Server failed to respond after {attempts} attempts, using the original text"
                );
                Ok(paragraph.to_string())
            }
            Err(RetryError::Fatal(e)) => {
                warn!(paragraph = index, "Rewrite rejected ({e}), using the original text");
                Ok(paragraph.to_string())
            }
        }
    }

    /// Synthesize narration for every segment, then render every clip.
    #[instrument(skip(self), fields(run = %self.id))]
    pub async fn generate_media(&mut self) -> Result<()> {
        self.expect_state(RunState::SegmentsBuilt)?;

        info!(segments = self.segments.len(), "Generating audio");
        for index in 0..self.segments.len() {
            if let Err(e) = self.attach_audio(index).await {
                return Err(self.fail(e));
            }
        }
        self.state = RunState::AudioReady;

        info!(segments = self.segments.len(), "Rendering clips");
        for index in 0..self.segments.len() {
            if let Err(e) = self.render_segment(index).await {
                return Err(self.fail(e));
            }
        }
        self.state = RunState::VideoReady;
        Ok(())
    }

    async fn attach_audio(&mut self, index: usize) -> Result<()> {
        let segment = &self.segments[index];
        let kit = &self.toolkit;
        let outcome = retry(
            self.retry,
            Stage::Audio,
            GenerationError::is_transient,
            move |_| segment.request_audio(kit),
        )
        .await;

        match outcome {
            Ok(audio) => {
                self.segments[index].set_audio(audio);
                Ok(())
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                error!(
                    segment = index,
                    "Server failed to respond after {attempts} attempts, video creation failed!"
                );
                Err(GenerationError::AudioGenerationExhausted {
                    segment: index,
                    attempts,
                })
            }
            Err(RetryError::Fatal(e)) => Err(e),
        }
    }

    async fn attach_image(&mut self, index: usize) -> Result<()> {
        if let Some(source) = self.image_sources.get(&index) {
            return self.segments[index]
                .acquire_image(Some(source), &self.toolkit)
                .await;
        }

        let segment = &self.segments[index];
        let kit = &self.toolkit;
        let outcome = retry(
            self.retry,
            Stage::Image,
            GenerationError::is_transient,
            move |_| segment.request_image(kit),
        )
        .await;

        match outcome {
            Ok(image) => {
                self.segments[index].set_image(image);
                Ok(())
            }
            Err(RetryError::Exhausted { attempts, .. }) => Err(GenerationError::RetryExhausted {
                stage: Stage::Image,
                attempts,
            }),
            Err(RetryError::Fatal(e)) => Err(e),
        }
    }

    async fn render_segment(&mut self, index: usize) -> Result<()> {
        if !self.segments[index].has_image() {
            self.attach_image(index).await?;
        }
        self.segments[index].render(&self.toolkit).await
    }

    /// Join the rendered clips in order and release every artifact.
    #[instrument(skip(self), fields(run = %self.id))]
    pub async fn finalize(&mut self) -> Result<PathBuf> {
        self.expect_state(RunState::VideoReady)?;

        let outcome = self.concatenate().await;
        for segment in &mut self.segments {
            segment.release_all();
        }

        match outcome {
            Ok(path) => {
                self.state = RunState::Concatenated;
                info!("Video created successfully: {}", path.display());
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn concatenate(&self) -> Result<PathBuf> {
        let mut inputs: Vec<&Path> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let clip = segment
                .video_path()
                .ok_or(GenerationError::PreconditionFailure {
                    segment: segment.index(),
                    missing: "video",
                })?;
            inputs.push(clip);
        }

        let media = &self.toolkit.media;
        match &self.output {
            Some(path) => {
                media.concat(&inputs, path).await?;
                Ok(path.clone())
            }
            None => {
                let output = reserve_temp(&self.toolkit.work_dir, ".mp4")?;
                media.concat(&inputs, &output).await?;
                output.keep().map_err(|e| GenerationError::Io(e.error))
            }
        }
    }

    /// Drive every remaining stage and return the final video path.
    #[instrument(skip(self), fields(run = %self.id))]
    pub async fn run(&mut self) -> Result<PathBuf> {
        self.build_segments().await?;
        self.generate_media().await?;
        self.finalize().await
    }
}
