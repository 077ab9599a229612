use serde::{Deserialize, Serialize};

use super::validate::{Validated, validate};
use super::{Completion, GenerationError, Generator};
use crate::formats::{Outline, TopicIdea};
use crate::outline::{OutlineEdit, ensure_section_ids};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutlineStyle {
    Academic,
    #[default]
    Conversational,
    Tutorial,
    Listicle,
}

impl OutlineStyle {
    fn guide(self) -> (&'static str, &'static str) {
        match self {
            Self::Academic => (
                "formal and research-based",
                "Abstract, Introduction, Literature Review, Methodology, Results, Discussion, Conclusion",
            ),
            Self::Conversational => (
                "friendly and engaging",
                "Hook, Context, Main Points, Examples, Takeaways",
            ),
            Self::Tutorial => (
                "instructional and step-by-step",
                "Overview, Prerequisites, Steps, Common Issues, Next Steps",
            ),
            Self::Listicle => (
                "concise and scannable",
                "Introduction, List Items, Summary, Resources",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeywordStrategy {
    Aggressive,
    #[default]
    Balanced,
    Conservative,
}

impl KeywordStrategy {
    fn density(self) -> &'static str {
        match self {
            Self::Aggressive => "3-4%",
            Self::Balanced => "1.5-2.5%",
            Self::Conservative => "0.5-1.5%",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineGenerationParams {
    pub selected_topic: TopicIdea,
    #[serde(default)]
    pub style: Option<OutlineStyle>,
    #[serde(default)]
    pub depth: Option<u8>,
    #[serde(default)]
    pub include_intro_conclusion: Option<bool>,
    #[serde(default, rename = "includeFAQ")]
    pub include_faq: Option<bool>,
    #[serde(default)]
    pub keyword_strategy: Option<KeywordStrategy>,
}

/// What the caller wants changed: a structured edit, or free-form instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Customization {
    Edit(OutlineEdit),
    Instruction(String),
}

const OUTLINE_INSTRUCTIONS: &str = "You are an expert content strategist and SEO specialist.\n\
Respond with a single valid JSON object and nothing else.";

const CUSTOMIZE_INSTRUCTIONS: &str = "You are an expert content strategist and SEO specialist.\n\
Modify outlines while keeping their SEO structure and keyword distribution.\n\
Always return valid JSON in the same format as the input outline.";

const OUTLINE_SCHEMA: &str = "{\"sections\":[{\"id\":\"...\",\"title\":\"...\",\"type\":\"h2\",\"content\":\"...\",\"keyPoints\":[\"...\"],\"recommendedWordCount\":0,\"keywords\":{\"primary\":[],\"secondary\":[],\"semantic\":[]},\"children\":[]}],\"metadata\":{\"totalWordCount\":0,\"keywordDensity\":{},\"readabilityScore\":0,\"seoScore\":0},\"seoGuidance\":{\"keywordPlacements\":{},\"contentGaps\":[],\"competitorInsights\":{\"averageSectionCount\":0,\"commonHeadings\":[],\"missingTopics\":[]}}}";

fn outline_prompt(params: &OutlineGenerationParams, depth: u8) -> Result<String, GenerationError> {
    let topic = serde_json::to_string_pretty(&params.selected_topic)
        .map_err(|err| GenerationError::InvalidRequest(format!("serialize topic: {err}")))?;
    let (tone, sections) = params.style.unwrap_or_default().guide();
    let mut extras = Vec::new();
    if params.include_intro_conclusion.unwrap_or(true) {
        extras.push("Include an introduction and a conclusion.");
    }
    if params.include_faq.unwrap_or(true) {
        extras.push("Include an FAQ section.");
    }

    Ok(format!(
        "Create a blog post outline for this topic:\n{topic}\n\n\
Tone: {tone}\n\
Typical sections: {sections}\n\
Nest sections at most {depth} levels deep (h2 to h{deepest}).\n\
Target keyword density: {density}\n\
{extras}\n\n\
Reply with JSON of this shape:\n{OUTLINE_SCHEMA}\n",
        deepest = (depth + 1).min(4),
        density = params.keyword_strategy.unwrap_or_default().density(),
        extras = extras.join("\n"),
    ))
}

fn checked_outline(value: serde_json::Value) -> Result<Outline, GenerationError> {
    let mut outline: Outline = serde_json::from_value(value).map_err(|err| {
        GenerationError::validation("invalid outline structure", vec![err.to_string()])
    })?;
    outline.sections = ensure_section_ids(&outline.sections);
    match validate(outline) {
        Validated::Valid(outline) => Ok(outline),
        Validated::Invalid(errors) => Err(GenerationError::validation(
            "invalid outline structure",
            errors,
        )),
    }
}

impl Generator {
    pub async fn generate_outline(
        &self,
        params: &OutlineGenerationParams,
    ) -> Result<Outline, GenerationError> {
        if params.selected_topic.title.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("no topic selected".to_owned()));
        }
        let depth = params.depth.unwrap_or(2);
        if !(1..=4).contains(&depth) {
            return Err(GenerationError::InvalidRequest(format!(
                "depth must be between 1 and 4 (got {depth})"
            )));
        }

        tracing::info!(topic = %params.selected_topic.title, depth, "generating outline");
        let reply = self
            .ask_json(Completion {
                instructions: OUTLINE_INSTRUCTIONS.to_owned(),
                input: outline_prompt(params, depth)?,
                max_output_tokens: None,
            })
            .await?;
        let outline = checked_outline(reply)?;
        tracing::info!(sections = outline.section_ids().len(), "outline generated");
        Ok(outline)
    }

    /// Model-driven rework of an outline. Metadata the model drops is carried over from `outline`.
    pub async fn customize_outline(
        &self,
        outline: &Outline,
        customization: &Customization,
    ) -> Result<Outline, GenerationError> {
        if outline.sections.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "outline has no sections".to_owned(),
            ));
        }
        let request = match customization {
            Customization::Instruction(text) if text.trim().is_empty() => {
                return Err(GenerationError::InvalidRequest(
                    "customization is empty".to_owned(),
                ));
            }
            Customization::Instruction(text) => text.trim().to_owned(),
            Customization::Edit(edit) => serde_json::to_string_pretty(edit)
                .map_err(|err| GenerationError::InvalidRequest(format!("serialize edit: {err}")))?,
        };
        let current = serde_json::to_string_pretty(outline)
            .map_err(|err| GenerationError::InvalidRequest(format!("serialize outline: {err}")))?;

        let reply = self
            .ask_json(Completion {
                instructions: CUSTOMIZE_INSTRUCTIONS.to_owned(),
                input: format!(
                    "Current outline:\n{current}\n\nRequested change:\n{request}\n\n\
Return the complete updated outline. Keep the ids of sections you do not remove.\n"
                ),
                max_output_tokens: None,
            })
            .await?;

        let mut customized = checked_outline(reply)?;
        if customized.metadata.is_none() {
            customized.metadata = outline.metadata.clone();
        }
        if customized.seo_guidance.is_none() {
            customized.seo_guidance = outline.seo_guidance.clone();
        }
        Ok(customized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{OutlineMetadata, SeoGuidance};
    use crate::generation::testing::ScriptedLlm;

    fn topic() -> TopicIdea {
        serde_json::from_str(
            r#"{"title":"Golang basics","description":"d","targetKeywords":["golang"],"difficulty":"beginner","estimatedWordCount":1500,"competitorInsights":{"averageWordCount":1,"commonSubtopics":[],"keywordGaps":[]}}"#,
        )
        .unwrap()
    }

    fn params(depth: Option<u8>) -> OutlineGenerationParams {
        OutlineGenerationParams {
            selected_topic: topic(),
            style: Some(OutlineStyle::Tutorial),
            depth,
            include_intro_conclusion: None,
            include_faq: Some(false),
            keyword_strategy: None,
        }
    }

    #[tokio::test]
    async fn generated_outline_gets_ids_and_children() -> anyhow::Result<()> {
        let llm = ScriptedLlm::replying([
            r#"```json
{"sections":[{"title":"Intro","type":"h2","content":"Why Go","children":[{"title":"History","type":"h3","content":"2009"}]},{"id":"keep","title":"Setup","type":"h2","content":"Install"}]}
```"#,
        ]);
        let generator = Generator::new(llm.clone());
        let outline = generator.generate_outline(&params(None)).await?;

        assert_eq!(outline.sections.len(), 2);
        assert!(outline.sections[0].id.starts_with("sec_"));
        assert!(outline.sections[0].children()[0].id.starts_with("sec_"));
        assert_eq!(outline.sections[1].id, "keep");
        assert_eq!(outline.sections[1].children, Some(Vec::new()));

        let input = llm.last_input();
        assert!(input.contains("instructional and step-by-step"));
        assert!(!input.contains("FAQ"));
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_depth_is_rejected() {
        let generator = Generator::new(ScriptedLlm::replying(["{}"]));
        let err = generator.generate_outline(&params(Some(5))).await;
        assert!(matches!(err, Err(GenerationError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn outline_without_sections_fails_validation() {
        let generator = Generator::new(ScriptedLlm::replying([r#"{"sections":[]}"#]));
        let Err(GenerationError::Validation { errors, .. }) =
            generator.generate_outline(&params(None)).await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(errors, vec!["sections: must not be empty"]);
    }

    #[tokio::test]
    async fn customization_keeps_metadata_the_model_dropped() -> anyhow::Result<()> {
        let llm = ScriptedLlm::replying([
            r#"{"sections":[{"id":"a","title":"Intro, rewritten","type":"h2","content":"x"}]}"#,
        ]);
        let generator = Generator::new(llm.clone());
        let mut outline: Outline = serde_json::from_str(
            r#"{"sections":[{"id":"a","title":"Intro","type":"h2","content":"x"}]}"#,
        )?;
        outline.metadata = Some(OutlineMetadata {
            total_word_count: 900,
            ..OutlineMetadata::default()
        });
        outline.seo_guidance = Some(SeoGuidance::default());

        let customized = generator
            .customize_outline(&outline, &Customization::Instruction("punchier intro".to_owned()))
            .await?;
        assert_eq!(customized.sections[0].title, "Intro, rewritten");
        assert_eq!(customized.metadata.map(|m| m.total_word_count), Some(900));
        assert!(llm.last_input().contains("punchier intro"));
        Ok(())
    }

    #[test]
    fn customization_payload_accepts_edits_and_text() -> anyhow::Result<()> {
        let edit: Customization =
            serde_json::from_str(r#"{"action":"remove","sectionId":"a"}"#)?;
        assert!(matches!(edit, Customization::Edit(OutlineEdit::Remove { .. })));
        let text: Customization = serde_json::from_str(r#""make it shorter""#)?;
        assert_eq!(text, Customization::Instruction("make it shorter".to_owned()));
        Ok(())
    }
}
