//! `OpenAI` REST client covering chat completions, image generation and
//! speech synthesis.
//!
//! Rate limiting (429), server errors (5xx), timeouts and connection
//! failures are reported as [`GenerationError::Transient`]; any other
//! non-success status becomes [`GenerationError::Remote`] and is not retried.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ApiKey, AudioStream, ImageGenerator, SpeechSynthesizer, TextGenerator};
use crate::error::{GenerationError, Result, Stage};

/// Models and endpoint used by [`OpenAiClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Chat model used to rewrite paragraphs
    pub text_model: String,
    /// Image model
    pub image_model: String,
    /// Image size requested per segment (e.g. "1792x1024")
    pub image_size: String,
    /// Image quality ("standard" or "hd")
    pub image_quality: String,
    /// Speech model
    pub speech_model: String,
    /// Narrator voice
    pub voice: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            text_model: "gpt-3.5-turbo".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: crate::toolkit::DEFAULT_IMAGE_SIZE.to_string(),
            image_quality: "standard".to_string(),
            speech_model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            timeout_secs: 120,
        }
    }
}

/// HTTP client for the `OpenAI` API.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Remote {
                stage: Stage::Fetch,
                status: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post(
        &self,
        stage: Stage,
        path: &str,
        key: &ApiKey,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        debug!(%stage, %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(stage, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(stage, status, &body))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.text_model))]
    async fn complete(&self, prompt: &str, key: &ApiKey) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.text_model,
            "messages": [{
                "role": "user",
                "content": prompt,
            }],
        });

        let response: ChatResponse = self
            .post(Stage::Rewrite, "chat/completions", key, &body)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(Stage::Rewrite, &e))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.image_model, %size))]
    async fn generate(&self, prompt: &str, size: &str, key: &ApiKey) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "size": size,
            "quality": self.config.image_quality,
            "n": 1,
        });

        let response: ImageResponse = self
            .post(Stage::Image, "images/generations", key, &body)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(Stage::Image, &e))?;

        response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| GenerationError::Remote {
                stage: Stage::Image,
                status: StatusCode::OK.as_u16(),
                message: "response carried no image URL".to_string(),
            })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.config.speech_model, voice = %self.config.voice))]
    async fn synthesize(&self, text: &str, key: &ApiKey) -> Result<AudioStream> {
        let body = serde_json::json!({
            "model": self.config.speech_model,
            "voice": self.config.voice,
            "input": text,
            "response_format": "mp3",
        });

        let response = self.post(Stage::Audio, "audio/speech", key, &body).await?;

        Ok(response
            .bytes_stream()
            .map_err(|e| transport_error(Stage::Audio, &e))
            .boxed())
    }
}

/// Map an HTTP status to the pipeline taxonomy.
fn status_error(stage: Stage, status: StatusCode, body: &str) -> GenerationError {
    let message = api_error_message(body).unwrap_or_else(|| status.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GenerationError::Transient { stage, message }
    } else {
        GenerationError::Remote {
            stage,
            status: status.as_u16(),
            message,
        }
    }
}

fn transport_error(stage: Stage, e: &reqwest::Error) -> GenerationError {
    if e.is_timeout() || e.is_connect() {
        return GenerationError::Transient {
            stage,
            message: e.to_string(),
        };
    }

    match e.status() {
        Some(status) => status_error(stage, status, ""),
        None => GenerationError::Remote {
            stage,
            status: 0,
            message: e.to_string(),
        },
    }
}

/// Pull `error.message` out of an `OpenAI` error body.
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(String::from)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}
