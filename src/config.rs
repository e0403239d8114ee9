//! Configuration loaded from `~/.config/vidmaker/config.toml`.
//!
//! The file is optional and every field has a default. API credentials are
//! never read from it.
//!
//! ```toml
//! work_dir = "/var/tmp/vidmaker"
//!
//! [openai]
//! text_model = "gpt-4o-mini"
//! voice = "nova"
//!
//! [retry]
//! max_attempts = 4
//! delay_secs = 5
//!
//! [render]
//! fps = 1
//! video_codec = "mpeg4"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::media::CompositorConfig;
use crate::provider::OpenAiConfig;
use crate::retry::RetryPolicy;

/// Retry budget as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Seconds to wait between attempts.
    pub delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_secs: policy.delay.as_secs_f64(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        let delay = Duration::try_from_secs_f64(self.delay_secs.max(0.0))
            .unwrap_or_else(|_| RetryPolicy::default().delay);
        RetryPolicy::new(self.max_attempts, delay)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VidmakerConfig {
    pub openai: OpenAiConfig,
    pub retry: RetryConfig,
    pub render: CompositorConfig,
    /// Directory for temporary artifacts and unnamed outputs
    pub work_dir: PathBuf,
}

impl Default for VidmakerConfig {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            retry: RetryConfig::default(),
            render: CompositorConfig::default(),
            work_dir: std::env::temp_dir().join("vidmaker"),
        }
    }
}

impl VidmakerConfig {
    /// Load from the default location.
    ///
    /// Returns the defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path`, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidmaker")
        .join("config.toml")
}
