//! Remote collaborators of the pipeline.
//!
//! Each remote capability sits behind an async trait so the pipeline can be
//! driven by [`OpenAiClient`] in production and by in-memory fakes in tests.
//! Every call takes the credential explicitly; no client carries one around.
//!
//! # Example
//!
//! ```rust,no_run
//! use vidmaker::provider::{ApiKey, OpenAiClient, TextGenerator};
//!
//! # async fn example() -> vidmaker::Result<()> {
//! let client = OpenAiClient::new(Default::default())?;
//! let key = ApiKey::new("sk-...").expect("non-empty key");
//! let text = client.complete("Tell me about otters.", &key).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod openai;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;

pub use openai::{OpenAiClient, OpenAiConfig};

/// Secret used to authenticate remote calls.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// The raw secret, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Chunked audio body of a speech synthesis response.
pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// Raw document returned by a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Bytes,
    /// Full `Content-Type` header value, empty when the server sent none.
    pub content_type: String,
}

/// Text-generation endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` in a single attempt.
    async fn complete(&self, prompt: &str, key: &ApiKey) -> Result<String>;
}

/// Image-generation endpoint.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return the URL it can be downloaded from.
    async fn generate(&self, prompt: &str, size: &str, key: &ApiKey) -> Result<String>;
}

/// Speech-synthesis endpoint.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, key: &ApiKey) -> Result<AudioStream>;
}

/// Plain GET of documents and images.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument>;
}
