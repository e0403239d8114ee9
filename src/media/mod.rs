//! Audio probing, still-image clip rendering and clip concatenation.
//!
//! # Features
//!
//! - **Duration probe** - play length of a synthesized audio file
//! - **Still rendering** - one image held for the audio's length, audio muxed in
//! - **Concatenation** - ordered clips joined into the final video
//!
//! The production implementation is [`Compositor`], which shells out to
//! ffmpeg and ffprobe.

pub mod compositor;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use compositor::{Compositor, CompositorConfig, MediaDurations};

/// Local audio/video encoding toolkit.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Play length of an audio file, in seconds.
    async fn probe_duration(&self, audio: &Path) -> Result<f64>;

    /// Render `image` as a static clip of exactly `duration` seconds with
    /// `audio` as its soundtrack.
    async fn render_still(
        &self,
        image: &Path,
        audio: &Path,
        duration: f64,
        output: &Path,
    ) -> Result<()>;

    /// Join `inputs` in order into `output`.
    async fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()>;
}
