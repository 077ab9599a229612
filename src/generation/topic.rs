use serde::{Deserialize, Serialize};

use super::validate::{Validated, parse_and_validate};
use super::{Completion, GenerationError, Generator};
use crate::formats::{Difficulty, SerpData, TopicIdea};
use crate::search::SearchConfig;
use crate::serp_analysis;

const MIN_RELEVANT_TOPICS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContentLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ContentLength {
    fn word_range(self) -> &'static str {
        match self {
            Self::Short => "800-1200",
            Self::Medium => "1500-2500",
            Self::Long => "3000-4000",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicGenerationParams {
    #[serde(default)]
    pub main_topic: String,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub content_length: Option<ContentLength>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub include_serp_data: bool,
}

const TOPIC_INSTRUCTIONS: &str = "You are an expert content strategist and SEO specialist.\n\
Always respond with a single valid JSON object and nothing else.\n\
Every generated topic must directly relate to the main topic.";

fn topic_prompt(params: &TopicGenerationParams) -> String {
    let main = params.main_topic.trim();
    let difficulty = params.difficulty.unwrap_or_default();
    let difficulty = serde_json::to_value(difficulty)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| "intermediate".to_owned());
    let niche = params
        .niche
        .as_deref()
        .map(|n| format!(" within the {n} niche"))
        .unwrap_or_default();
    let audience = params
        .target_audience
        .as_deref()
        .map(|a| format!("The target audience is {a}.\n"))
        .unwrap_or_default();
    let keywords = main
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate {MIN_RELEVANT_TOPICS} blog post ideas about \"{main}\"{niche}.\n\
{audience}\
Focus keywords: {keywords}\n\
Difficulty: {difficulty}\n\
Target length: {range} words\n\
\n\
Every title and description MUST mention \"{main}\" or a close variant, and targetKeywords MUST include it.\n\
\n\
Reply with JSON:\n\
{{\"topics\":[{{\"title\":\"...\",\"description\":\"...\",\"targetKeywords\":[\"...\"],\"difficulty\":\"{difficulty}\",\"estimatedWordCount\":0,\"competitorInsights\":{{\"averageWordCount\":0,\"commonSubtopics\":[\"...\"],\"keywordGaps\":[\"...\"]}}}}]}}\n",
        range = params.content_length.unwrap_or_default().word_range(),
    )
}

/// Title, description and keywords must each mention a word of the main topic.
pub(crate) fn is_relevant(topic: &TopicIdea, main_topic: &str) -> bool {
    let words: Vec<String> = main_topic
        .to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect();
    if words.is_empty() {
        return false;
    }
    let mentions = |text: &str| {
        let text = text.to_lowercase();
        words.iter().any(|w| text.contains(w.as_str()))
    };
    mentions(&topic.title)
        && mentions(&topic.description)
        && topic.target_keywords.iter().any(|k| mentions(k))
}

fn enrich(topics: &mut [TopicIdea], serp: &SerpData) {
    let insights = serp_analysis::competitor_insights(&serp_analysis::analyze(serp));
    for topic in topics {
        let ci = &mut topic.competitor_insights;
        ci.top_results = Some(serp.organic_results.iter().take(5).cloned().collect());
        ci.featured_snippets = Some(serp.featured_snippets.clone());
        ci.related_searches = Some(serp.related_searches.clone());
        ci.common_headings = insights.common_headings.clone();
        ci.common_topics = insights.common_topics.clone();
        ci.content_gaps = insights.content_gaps.clone();
        ci.key_insights = insights.key_insights.clone();
        ci.unique_angles = insights.unique_angles.clone();
        ci.recommended_word_count = insights.recommended_word_count;
    }
}

impl Generator {
    pub async fn generate_topics(
        &self,
        params: &TopicGenerationParams,
    ) -> Result<Vec<TopicIdea>, GenerationError> {
        let main = params.main_topic.trim();
        if main.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "main topic is required".to_owned(),
            ));
        }

        tracing::info!(
            main_topic = main,
            niche = params.niche.as_deref().unwrap_or(""),
            "generating topics"
        );
        let reply = self
            .ask_json(Completion {
                instructions: TOPIC_INSTRUCTIONS.to_owned(),
                input: topic_prompt(params),
                max_output_tokens: None,
            })
            .await?;

        let Some(items) = reply.get("topics").and_then(|t| t.as_array()) else {
            return Err(GenerationError::validation(
                "invalid topic reply",
                vec!["topics: must be an array".to_owned()],
            ));
        };

        let mut topics = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            match parse_and_validate::<TopicIdea>(item.clone(), &format!("topics[{idx}]")) {
                Validated::Valid(topic) => topics.push(topic),
                Validated::Invalid(mut errs) => errors.append(&mut errs),
            }
        }
        if !errors.is_empty() {
            return Err(GenerationError::validation("invalid topic format", errors));
        }

        let total = topics.len();
        let mut relevant: Vec<TopicIdea> = topics
            .into_iter()
            .filter(|t| is_relevant(t, main))
            .map(|mut t| {
                if t.id.trim().is_empty() {
                    t.id = format!("topic_{}", uuid::Uuid::new_v4().simple());
                }
                t
            })
            .collect();
        tracing::info!(total, relevant = relevant.len(), "topics generated");

        if relevant.len() < MIN_RELEVANT_TOPICS {
            return Err(GenerationError::validation(
                "not enough relevant topics generated",
                vec![format!(
                    "{} of {total} topics relate to \"{main}\"; need at least {MIN_RELEVANT_TOPICS}",
                    relevant.len()
                )],
            ));
        }

        if params.include_serp_data
            && let Some(search) = &self.search
        {
            match search.search(main, &SearchConfig::default()).await {
                Ok(serp) => enrich(&mut relevant, &serp),
                Err(err) => {
                    tracing::warn!(
                        main_topic = main,
                        error = %err,
                        "search enrichment failed; returning topics as-is"
                    );
                }
            }
        }

        Ok(relevant)
    }
}
