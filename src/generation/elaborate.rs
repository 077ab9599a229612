use serde::{Deserialize, Serialize};

use super::{Completion, GenerationError, Generator};
use crate::text;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElaborateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub original_content: String,
    #[serde(default)]
    pub target_word_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElaborateResponse {
    pub content: String,
    pub word_count: u32,
}

const ELABORATE_INSTRUCTIONS: &str = "You are an expert blog content writer. Elaborate and expand on \
the given section while keeping its style, tone and key points. Add details, examples and \
explanations that deepen it. Reply with the rewritten markdown only.";

impl Generator {
    pub async fn elaborate(
        &self,
        request: &ElaborateRequest,
    ) -> Result<ElaborateResponse, GenerationError> {
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("prompt is required".to_owned()));
        }

        let mut input = request.prompt.trim().to_owned();
        if !request.original_content.trim().is_empty() {
            input.push_str("\n\nOriginal section:\n");
            input.push_str(request.original_content.trim());
        }
        if let Some(target) = request.target_word_count {
            input.push_str(&format!("\n\nAim for about {target} words."));
        }

        let content = self
            .ask(Completion {
                instructions: ELABORATE_INSTRUCTIONS.to_owned(),
                input,
                max_output_tokens: None,
            })
            .await?
            .trim()
            .to_owned();
        if content.is_empty() {
            return Err(GenerationError::validation(
                "elaboration is empty",
                vec!["content: must not be empty".to_owned()],
            ));
        }

        let word_count = text::count_words(&content);
        tracing::info!(word_count, target = ?request.target_word_count, "section elaborated");
        Ok(ElaborateResponse {
            content,
            word_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedLlm;

    #[tokio::test]
    async fn elaboration_returns_trimmed_text_with_word_count() -> anyhow::Result<()> {
        let llm = ScriptedLlm::replying(["\n\nGoroutines are cheap threads managed by the runtime.\n"]);
        let generator = Generator::new(llm.clone());
        let out = generator
            .elaborate(&ElaborateRequest {
                prompt: "Expand on goroutines".to_owned(),
                original_content: "Goroutines are cheap.".to_owned(),
                target_word_count: Some(300),
            })
            .await?;

        assert_eq!(out.content, "Goroutines are cheap threads managed by the runtime.");
        assert_eq!(out.word_count, 8);
        let input = llm.last_input();
        assert!(input.contains("Original section:\nGoroutines are cheap."));
        assert!(input.contains("about 300 words"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let generator = Generator::new(ScriptedLlm::replying(["unused"]));
        let err = generator.elaborate(&ElaborateRequest::default()).await;
        assert!(matches!(err, Err(GenerationError::InvalidRequest(_))));
    }
}
