//! Model-backed generation of topics, outlines, article content and elaborations.
//!
//! Every operation builds a prompt, asks the [`LlmClient`], then holds the reply to a declared
//! contract. Unreachable models and malformed replies are reported as different errors.

mod content;
mod elaborate;
mod outline;
mod topic;
pub mod validate;

use std::sync::Arc;

use async_trait::async_trait;

use crate::openai::extract_json_object;
use crate::search::CachedSearch;

pub use content::{BlogContentGenerationParams, ContentStyle, ContentTone};
pub use elaborate::{ElaborateRequest, ElaborateResponse};
pub use outline::{Customization, KeywordStrategy, OutlineGenerationParams, OutlineStyle};
pub use topic::{ContentLength, TopicGenerationParams};
pub use validate::{Validate, Validated};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("generation service failed: {0}")]
    Collaborator(String),
    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },
}

impl GenerationError {
    fn validation(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }
}

/// One model call: standing instructions plus the task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub instructions: String,
    pub input: String,
    pub max_output_tokens: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &Completion) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmClient>,
    search: Option<Arc<CachedSearch>>,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, search: None }
    }

    pub fn with_search(mut self, search: Arc<CachedSearch>) -> Self {
        self.search = Some(search);
        self
    }

    async fn ask(&self, request: Completion) -> Result<String, GenerationError> {
        self.llm.complete(&request).await.map_err(|err| {
            tracing::warn!(error = %format!("{err:#}"), "model call failed");
            GenerationError::Collaborator(format!("{err:#}"))
        })
    }

    /// Asks for a JSON object and returns it parsed but not yet validated.
    async fn ask_json(&self, request: Completion) -> Result<serde_json::Value, GenerationError> {
        let raw = self.ask(request).await?;
        let parse_failure = |detail: String| {
            tracing::warn!(reply_chars = raw.len(), %detail, "model reply is not a JSON object");
            GenerationError::validation("failed to parse the generated reply", vec![detail])
        };
        let json = extract_json_object(&raw).map_err(|err| parse_failure(format!("{err:#}")))?;
        serde_json::from_str(json).map_err(|err| parse_failure(err.to_string()))
    }
}
