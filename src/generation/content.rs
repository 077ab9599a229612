use serde::{Deserialize, Serialize};

use super::validate::{Validated, parse_and_validate};
use super::{Completion, GenerationError, Generator};
use crate::formats::{BlogContent, Difficulty, Outline};
use crate::text;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentStyle {
    Formal,
    #[default]
    Conversational,
    Technical,
    Storytelling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentTone {
    #[default]
    Professional,
    Friendly,
    Authoritative,
    Educational,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogContentGenerationParams {
    pub outline: Outline,
    /// Limits generation to one section of the outline.
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub style: Option<ContentStyle>,
    #[serde(default)]
    pub tone: Option<ContentTone>,
    #[serde(default)]
    pub readability_level: Option<Difficulty>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

const CONTENT_INSTRUCTIONS: &str = "You are an expert content writer and SEO specialist.\n\
You must ONLY respond with a valid JSON object, with no text before or after it.\n\
Follow the outline structure exactly and write section bodies in markdown.";

const CONTENT_SCHEMA: &str = "{\"sections\":[{\"id\":\"<outline section id>\",\"content\":\"markdown\",\"wordCount\":0,\"keywordDensity\":{\"keyword\":0.0},\"readabilityScore\":0.0}],\"metadata\":{\"totalWordCount\":0,\"averageReadabilityScore\":0.0,\"keywordDensityOverall\":{},\"seoScore\":0,\"contentQualityMetrics\":{\"comprehensiveness\":0,\"engagement\":0,\"clarity\":0,\"expertise\":0}},\"seoAnalysis\":{\"keywordImplementation\":{},\"contentGapsCovered\":[],\"missingTopics\":[],\"suggestions\":[]}}";

fn label<T: Serialize>(value: T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn content_prompt(params: &BlogContentGenerationParams) -> Result<String, GenerationError> {
    let outline = serde_json::to_string_pretty(&params.outline)
        .map_err(|err| GenerationError::InvalidRequest(format!("serialize outline: {err}")))?;
    let scope = match &params.section {
        Some(id) => format!("Write ONLY the section with id \"{id}\" (and its children)."),
        None => "Write every section of the outline.".to_owned(),
    };
    Ok(format!(
        "Outline:\n{outline}\n\n{scope}\n\
Style: {style}\nTone: {tone}\nReadability level: {level}\n\
Honour each section's recommendedWordCount and keywords.\n\n\
Reply with JSON of this shape:\n{CONTENT_SCHEMA}\n",
        style = label(params.style.unwrap_or_default()),
        tone = label(params.tone.unwrap_or_default()),
        level = label(params.readability_level.unwrap_or_default()),
    ))
}

/// Replaces the model's self-reported numbers with ones measured from the text.
fn remeasure(content: &mut BlogContent) {
    let mut total = 0u32;
    let mut readability = 0.0;
    for section in &mut content.sections {
        section.word_count = text::count_words(&section.content);
        section.readability_score = text::readability_score(&section.content);
        section.keyword_density =
            text::keyword_densities(&section.content, section.keyword_density.keys());
        total += section.word_count;
        readability += section.readability_score;
    }

    let all_text = content
        .sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let metadata = &mut content.metadata;
    metadata.total_word_count = total;
    metadata.average_readability_score = if content.sections.is_empty() {
        0.0
    } else {
        readability / content.sections.len() as f64
    };
    metadata.keyword_density_overall =
        text::keyword_densities(&all_text, metadata.keyword_density_overall.keys());
}

impl Generator {
    pub async fn generate_content(
        &self,
        params: &BlogContentGenerationParams,
    ) -> Result<BlogContent, GenerationError> {
        if params.outline.sections.is_empty() {
            return Err(GenerationError::InvalidRequest("outline is required".to_owned()));
        }
        if let Some(id) = &params.section
            && params.outline.find_section(id).is_none()
        {
            return Err(GenerationError::InvalidRequest(format!(
                "section not found in outline: {id}"
            )));
        }

        tracing::info!(
            sections = params.outline.section_ids().len(),
            only = params.section.as_deref().unwrap_or(""),
            "generating content"
        );
        let reply = self
            .ask_json(Completion {
                instructions: CONTENT_INSTRUCTIONS.to_owned(),
                input: content_prompt(params)?,
                max_output_tokens: params.max_tokens,
            })
            .await?;

        let mut content = match parse_and_validate::<BlogContent>(reply, "") {
            Validated::Valid(content) => content,
            Validated::Invalid(errors) => {
                tracing::warn!(errors = errors.len(), "content reply failed validation");
                return Err(GenerationError::validation("invalid content structure", errors));
            }
        };
        remeasure(&mut content);
        tracing::info!(words = content.metadata.total_word_count, "content generated");
        Ok(content)
    }
}
