//! `vidmaker` - Narrated videos from a text prompt
//!
//! # Features
//!
//! - **Prompt sources**: literal text, or the visible text of a web page
//! - **Audience rewriting**: each paragraph rephrased for a target age
//! - **Narration**: one speech track per segment
//! - **Illustration**: one generated (or caller-supplied) still per segment
//! - **Composition**: ffmpeg renders each segment and joins them in order
//!
//! # Example
//!
//! ```rust,no_run
//! use vidmaker::{ApiKey, VideoGenerator, VidmakerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let generator = VideoGenerator::from_config(&VidmakerConfig::load()?)?;
//!     let mut run = generator.create_run(ApiKey::new("sk-..."), Some(10));
//!     run.set_prompt_from_url("https://example.com/article").await?;
//!     let video = run.run().await?;
//!     println!("Wrote {}", video.display());
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod http_client;
pub mod media;
pub mod provider;
pub mod retry;
pub mod rewrite;
pub mod segment;
pub mod toolkit;

pub use artifact::{ImageArtifact, ImageSource};
pub use config::VidmakerConfig;
pub use content::{extract_text, fetch_prompt, ContentRouter};
pub use error::{GenerationError, Result, Stage};
pub use generator::{GenerationRun, RunState, VideoGenerator};
pub use http_client::HttpClient;
pub use media::{Compositor, CompositorConfig, MediaDurations, MediaEncoder};
pub use provider::{ApiKey, OpenAiClient, OpenAiConfig};
pub use retry::{RetryError, RetryPolicy};
pub use rewrite::TextRewriter;
pub use segment::Segment;
pub use toolkit::Toolkit;

/// Version of vidmaker
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
