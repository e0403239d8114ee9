//! Audience-aware rewriting of prompt paragraphs.

use std::sync::Arc;

use tracing::debug;

use crate::error::{GenerationError, Result, Stage};
use crate::provider::{ApiKey, TextGenerator};

/// Instruction prepended to every paragraph sent for rewriting.
#[must_use]
pub fn instruction_prefix(age: Option<u32>) -> String {
    match age {
        Some(age) if age < 18 => format!("Phrase your response for a child aged {age}. "),
        Some(age) => format!("Phrase your response for an adult aged {age}. "),
        None => "Phrase your response for a child. ".to_string(),
    }
}

/// Single-attempt paragraph rewriter; retries are the caller's business.
#[derive(Clone)]
pub struct TextRewriter {
    generator: Arc<dyn TextGenerator>,
}

impl TextRewriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Rewrite one paragraph for the audience.
    ///
    /// Fails with [`GenerationError::NoCredential`] without calling out when
    /// `key` is absent. An empty completion counts as a transient failure.
    pub async fn rewrite(
        &self,
        paragraph: &str,
        age: Option<u32>,
        key: Option<&ApiKey>,
    ) -> Result<String> {
        let key = key.ok_or(GenerationError::NoCredential)?;
        let prompt = format!("{}{}", instruction_prefix(age), paragraph);
        let text = self.generator.complete(&prompt, key).await?;
        if text.trim().is_empty() {
            return Err(GenerationError::Transient {
                stage: Stage::Rewrite,
                message: "empty completion".to_string(),
            });
        }
        debug!(input = paragraph.len(), output = text.len(), "Paragraph rewritten");
        Ok(text)
    }
}
