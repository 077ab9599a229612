use async_trait::async_trait;
use serde::Deserialize;

use crate::formats::{SerpData, SerpResult};
use crate::search::google::api_error_message;
use crate::search::{SearchConfig, SearchError, SearchProvider};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com/search.json";

pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiSearch {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    related_searches: Vec<RelatedSearch>,
    #[serde(default)]
    search_information: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedSearch {
    #[serde(default)]
    query: String,
}

/// `total_results` arrives as a number, occasionally as a string.
fn total_results(info: Option<&serde_json::Value>) -> u64 {
    match info.and_then(|i| i.get("total_results")) {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SerpData, SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::ConfigMissing("SERPAPI_KEY"));
        }

        let country = config.country.clone().unwrap_or_else(|| "us".to_owned());
        let url = url::Url::parse_with_params(
            &self.base_url,
            &[
                ("api_key", self.api_key.as_str()),
                ("q", query),
                ("engine", "google"),
                ("num", "10"),
                ("gl", country.as_str()),
            ],
        )
        .map_err(|err| SearchError::Transport(format!("build request url: {err}")))?;

        tracing::debug!(query, "serpapi request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| SearchError::Transport(err.to_string()))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| SearchError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw).unwrap_or_else(|| "SerpApi error".to_owned()),
            });
        }

        let parsed: SerpApiResponse = serde_json::from_str(&raw)
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;

        let organic_results = parsed
            .organic_results
            .into_iter()
            .enumerate()
            .map(|(idx, r)| SerpResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet,
                position: r.position.unwrap_or(idx as u32 + 1),
            })
            .collect();

        Ok(SerpData {
            organic_results,
            featured_snippets: parsed
                .answer_box
                .and_then(|b| b.snippet)
                .into_iter()
                .collect(),
            related_searches: parsed
                .related_searches
                .into_iter()
                .map(|r| r.query)
                .collect(),
            total_results: total_results(parsed.search_information.as_ref()),
        })
    }
}
