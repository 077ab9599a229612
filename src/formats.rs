use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    #[default]
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    pub fn depth(self) -> usize {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
        }
    }

    /// Level used for a child of a section at this level; saturates at `h4`.
    pub fn child(self) -> Self {
        match self {
            Self::H1 => Self::H2,
            Self::H2 => Self::H3,
            Self::H3 | Self::H4 => Self::H4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionKeywords {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub semantic: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub level: HeadingLevel,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub recommended_word_count: u32,
    #[serde(default)]
    pub keywords: SectionKeywords,
    /// `None` and `Some(vec![])` are kept apart on purpose; both are valid leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OutlineSection>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineMetadata {
    pub total_word_count: u32,
    #[serde(default)]
    pub keyword_density: BTreeMap<String, f64>,
    pub readability_score: f64,
    pub seo_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPlacement {
    pub recommended: u32,
    #[serde(default)]
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineCompetitorInsights {
    #[serde(default)]
    pub average_section_count: u32,
    #[serde(default)]
    pub common_headings: Vec<String>,
    #[serde(default)]
    pub missing_topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoGuidance {
    #[serde(default)]
    pub keyword_placements: BTreeMap<String, KeywordPlacement>,
    #[serde(default)]
    pub content_gaps: Vec<String>,
    #[serde(default)]
    pub competitor_insights: OutlineCompetitorInsights,
}

/// An article plan. There is no root node: the top level is `sections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OutlineMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_guidance: Option<SeoGuidance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerpResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub position: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerpData {
    #[serde(default)]
    pub organic_results: Vec<SerpResult>,
    #[serde(default)]
    pub featured_snippets: Vec<String>,
    #[serde(default)]
    pub related_searches: Vec<String>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInsight {
    pub topic: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorInsights {
    pub average_word_count: u32,
    pub common_subtopics: Vec<String>,
    pub keyword_gaps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_results: Option<Vec<SerpResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_snippets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_searches: Option<Vec<String>>,
    #[serde(default)]
    pub common_headings: Vec<String>,
    #[serde(default)]
    pub common_topics: Vec<String>,
    #[serde(default)]
    pub content_gaps: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<KeyInsight>,
    #[serde(default)]
    pub unique_angles: Vec<String>,
    #[serde(default)]
    pub recommended_word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicIdea {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_keywords: Vec<String>,
    pub difficulty: Difficulty,
    pub estimated_word_count: u32,
    pub competitor_insights: CompetitorInsights,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogContentSection {
    pub id: String,
    pub content: String,
    pub word_count: u32,
    #[serde(default)]
    pub keyword_density: BTreeMap<String, f64>,
    pub readability_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentQualityMetrics {
    pub comprehensiveness: f64,
    pub engagement: f64,
    pub clarity: f64,
    pub expertise: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogContentMetadata {
    pub total_word_count: u32,
    pub average_readability_score: f64,
    #[serde(default)]
    pub keyword_density_overall: BTreeMap<String, f64>,
    pub seo_score: f64,
    pub content_quality_metrics: ContentQualityMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordImplementation {
    pub actual: u32,
    pub recommended: u32,
    #[serde(default)]
    pub placement: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    #[serde(default)]
    pub keyword_implementation: BTreeMap<String, KeywordImplementation>,
    pub content_gaps_covered: Vec<String>,
    pub missing_topics: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogContent {
    pub sections: Vec<BlogContentSection>,
    pub metadata: BlogContentMetadata,
    pub seo_analysis: SeoAnalysis,
}
