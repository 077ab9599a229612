use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::formats::{SerpData, SerpResult};
use crate::search::{RateLimiter, SearchConfig, SearchError, SearchProvider};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search JSON API.
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
    base_url: String,
    limiter: Option<Arc<RateLimiter>>,
}

impl GoogleSearch {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: base_url.into(),
            limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    fn request_url(&self, query: &str, config: &SearchConfig) -> Result<url::Url, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.to_owned()),
            ("num", "10".to_owned()),
            ("gl", config.country.clone().unwrap_or_else(|| "us".to_owned())),
            ("hl", config.language.clone().unwrap_or_else(|| "en".to_owned())),
            ("safe", config.safe_search.unwrap_or_default().as_str().to_owned()),
            ("sort", config.sort.unwrap_or_default().as_str().to_owned()),
        ];
        let optional = [
            ("dateRestrict", config.date_restrict.clone()),
            ("siteSearch", config.site_search.clone()),
            ("exactTerms", config.exact_terms.clone()),
            ("excludeTerms", config.exclude_terms.clone()),
            ("fileType", config.file_type.clone()),
            ("start", config.start.map(|s| s.to_string())),
            ("rights", config.rights.map(|r| r.as_str().to_owned())),
            ("searchType", config.search_type.map(|t| t.as_str().to_owned())),
            ("lowRange", config.low_range.clone()),
            ("highRange", config.high_range.clone()),
            ("filter", config.filter.clone()),
        ];
        params.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v))),
        );

        url::Url::parse_with_params(&self.base_url, &params)
            .map_err(|err| SearchError::Transport(format!("build request url: {err}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    items: Option<Vec<GoogleItem>>,
    search_information: Option<SearchInformation>,
    #[serde(default)]
    queries: Option<GoogleQueries>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagemap: Option<serde_json::Value>,
}

impl GoogleItem {
    fn meta_description(&self) -> Option<String> {
        let tags = self.pagemap.as_ref()?.get("metatags")?.get(0)?;
        ["og:description", "description"]
            .into_iter()
            .find_map(|name| tags.get(name)?.as_str())
            .filter(|d| !d.is_empty())
            .map(str::to_owned)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInformation {
    #[serde(default)]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleQueries {
    #[serde(default)]
    related_searches: Vec<RelatedQuery>,
}

#[derive(Debug, Deserialize)]
struct RelatedQuery {
    #[serde(default)]
    title: String,
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SerpData, SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::ConfigMissing("GOOGLE_SEARCH_API_KEY"));
        }
        if self.engine_id.trim().is_empty() {
            return Err(SearchError::ConfigMissing("GOOGLE_SEARCH_ENGINE_ID"));
        }
        if !self.api_key.starts_with("AIza") {
            return Err(SearchError::InvalidApiKey);
        }
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await?;
        }

        let url = self.request_url(query, config)?;
        tracing::debug!(query, "google custom search request");
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
                message: api_error_message(&raw)
                    .unwrap_or_else(|| "Google Search API error".to_owned()),
            });
        }

        let parsed: GoogleResponse = serde_json::from_str(&raw)
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;
        if parsed.items.is_none() && parsed.search_information.is_none() {
            return Err(SearchError::InvalidResponse(
                "neither `items` nor `searchInformation` present".to_owned(),
            ));
        }

        let items = parsed.items.unwrap_or_default();
        let featured_snippets = items.iter().filter_map(GoogleItem::meta_description).collect();
        let organic_results = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| SerpResult {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
                position: idx as u32 + 1,
            })
            .collect();
        let related_searches = parsed
            .queries
            .map(|q| q.related_searches.into_iter().map(|r| r.title).collect())
            .unwrap_or_default();
        let total_results = parsed
            .search_information
            .and_then(|info| info.total_results)
            .and_then(|total| total.trim().parse().ok())
            .unwrap_or(0);

        Ok(SerpData {
            organic_results,
            featured_snippets,
            related_searches,
            total_results,
        })
    }
}

pub(crate) fn api_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_missing_and_malformed_keys_before_any_request() {
        let client = reqwest::Client::new();
        let unreachable = "http://127.0.0.1:9/customsearch/v1";

        let missing = GoogleSearch::new(client.clone(), "", "cx", unreachable);
        assert_eq!(
            missing.search("q", &SearchConfig::default()).await,
            Err(SearchError::ConfigMissing("GOOGLE_SEARCH_API_KEY"))
        );

        let malformed = GoogleSearch::new(client, "sk-123", "cx", unreachable);
        assert_eq!(
            malformed.search("q", &SearchConfig::default()).await,
            Err(SearchError::InvalidApiKey)
        );
    }

    #[test]
    fn request_url_carries_validated_options() -> anyhow::Result<()> {
        let search = GoogleSearch::new(reqwest::Client::new(), "AIzaKEY", "cx1", DEFAULT_BASE_URL);
        let config = SearchConfig {
            date_restrict: Some("w2".to_owned()),
            start: Some(11),
            ..SearchConfig::default()
        }
        .validated();
        let url = search.request_url("rust & go", &config)?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("q".to_owned(), "rust & go".to_owned())));
        assert!(pairs.contains(&("num".to_owned(), "10".to_owned())));
        assert!(pairs.contains(&("gl".to_owned(), "us".to_owned())));
        assert!(pairs.contains(&("dateRestrict".to_owned(), "w2".to_owned())));
        assert!(pairs.contains(&("start".to_owned(), "11".to_owned())));
        assert!(!pairs.iter().any(|(k, _)| k == "fileType"));
        Ok(())
    }

    #[test]
    fn meta_description_prefers_open_graph() -> anyhow::Result<()> {
        let item: GoogleItem = serde_json::from_value(serde_json::json!({
            "title": "t",
            "pagemap": {"metatags": [{"description": "plain", "og:description": "og"}]}
        }))?;
        assert_eq!(item.meta_description().as_deref(), Some("og"));
        Ok(())
    }
}
