//! Search-engine lookups returning [`SerpData`], and the cache that sits in front of them.
//!
//! [`CachedSearch`] runs cache reads and writes on the blocking pool.

pub mod google;
pub mod rate_limit;
pub mod serpapi;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::ResultCache;
use crate::formats::SerpData;

pub use google::GoogleSearch;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use serpapi::SerpApiSearch;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("daily search quota exceeded ({limit} requests per window)")]
    RateLimited { limit: u32 },
    #[error("search provider configuration not found: {0}")]
    ConfigMissing(&'static str),
    #[error("invalid search API key format")]
    InvalidApiKey,
    #[error("search API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid search API response: {0}")]
    InvalidResponse(String),
    #[error("search request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    #[default]
    Medium,
    High,
}

impl SafeSearch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Date,
    #[default]
    Relevance,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Relevance => "relevance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageRights {
    CcPublicdomain,
    CcAttribute,
    CcSharealike,
    CcNoncommercial,
    CcNonderived,
}

impl UsageRights {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CcPublicdomain => "cc_publicdomain",
            Self::CcAttribute => "cc_attribute",
            Self::CcSharealike => "cc_sharealike",
            Self::CcNoncommercial => "cc_noncommercial",
            Self::CcNonderived => "cc_nonderived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Image,
    News,
    Video,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::News => "news",
            Self::Video => "video",
        }
    }
}

/// Optional lookup parameters. Pass through [`SearchConfig::validated`] before use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub country: Option<String>,
    pub language: Option<String>,
    pub safe_search: Option<SafeSearch>,
    pub date_restrict: Option<String>,
    pub site_search: Option<String>,
    pub exact_terms: Option<String>,
    pub exclude_terms: Option<String>,
    pub file_type: Option<String>,
    pub sort: Option<SortOrder>,
    pub start: Option<u32>,
    pub rights: Option<UsageRights>,
    pub search_type: Option<SearchType>,
    pub low_range: Option<String>,
    pub high_range: Option<String>,
    /// "0" keeps duplicate results, "1" omits them.
    pub filter: Option<String>,
}

impl SearchConfig {
    /// Keeps only well-formed values, filling country/language/safe/sort with defaults.
    pub fn validated(&self) -> Self {
        let mut out = Self {
            country: Some("us".to_owned()),
            language: Some("en".to_owned()),
            safe_search: Some(self.safe_search.unwrap_or_default()),
            sort: Some(self.sort.unwrap_or_default()),
            rights: self.rights,
            search_type: self.search_type,
            ..Self::default()
        };

        if let Some(country) = self.country.as_deref().filter(|c| is_two_letters(c)) {
            out.country = Some(country.to_ascii_lowercase());
        }
        if let Some(language) = self.language.as_deref().filter(|l| is_two_letters(l)) {
            out.language = Some(language.to_ascii_lowercase());
        }
        out.date_restrict = self
            .date_restrict
            .clone()
            .filter(|d| is_date_restrict(d));

        if let (Some(low), Some(high)) = (&self.low_range, &self.high_range)
            && let (Ok(lo), Ok(hi)) = (low.trim().parse::<i64>(), high.trim().parse::<i64>())
            && lo < hi
        {
            out.low_range = Some(low.clone());
            out.high_range = Some(high.clone());
        }

        out.site_search = non_empty(&self.site_search);
        out.exact_terms = non_empty(&self.exact_terms);
        out.exclude_terms = non_empty(&self.exclude_terms);
        out.file_type = non_empty(&self.file_type);
        out.start = self.start.filter(|s| (1..=100).contains(s));
        out.filter = self
            .filter
            .clone()
            .filter(|f| f.as_str() == "0" || f.as_str() == "1");
        out
    }
}

fn is_two_letters(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_date_restrict(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('d' | 'w' | 'm' | 'y'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SerpData, SearchError>;
}

/// Tries `primary`, and on any failure logs it and asks `fallback`.
pub struct FallbackSearch {
    primary: Arc<dyn SearchProvider>,
    fallback: Arc<dyn SearchProvider>,
}

impl FallbackSearch {
    pub fn new(primary: Arc<dyn SearchProvider>, fallback: Arc<dyn SearchProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl SearchProvider for FallbackSearch {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SerpData, SearchError> {
        match self.primary.search(query, config).await {
            Ok(data) => Ok(data),
            Err(err) => {
                tracing::warn!(
                    provider = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "search failed; trying fallback provider"
                );
                self.fallback.search(query, config).await
            }
        }
    }
}

/// A provider fronted by a [`ResultCache`]. Hits never reach the provider; failures are not cached.
pub struct CachedSearch {
    cache: Arc<ResultCache<SerpData>>,
    provider: Arc<dyn SearchProvider>,
}

impl CachedSearch {
    pub fn new(cache: ResultCache<SerpData>, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            cache: Arc::new(cache),
            provider,
        }
    }

    pub fn cache(&self) -> &ResultCache<SerpData> {
        &self.cache
    }

    pub async fn search(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> Result<SerpData, SearchError> {
        if let Some(hit) = self.cached(query).await {
            tracing::debug!(query, "returning cached search results");
            return Ok(hit);
        }

        let config = config.validated();
        let data = self.provider.search(query, &config).await?;
        tracing::info!(
            query,
            provider = self.provider.name(),
            results = data.organic_results.len(),
            "search complete"
        );
        self.store(query, data.clone()).await;
        Ok(data)
    }

    // The cache media do blocking file IO, so every cache call leaves the async worker.
    async fn cached(&self, query: &str) -> Option<SerpData> {
        let cache = Arc::clone(&self.cache);
        let query = query.to_owned();
        match tokio::task::spawn_blocking(move || cache.get(&query)).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(error = %err, "cache lookup task failed");
                None
            }
        }
    }

    async fn store(&self, query: &str, data: SerpData) {
        let cache = Arc::clone(&self.cache);
        let query = query.to_owned();
        if let Err(err) = tokio::task::spawn_blocking(move || cache.set(&query, data)).await {
            tracing::warn!(error = %err, "cache write task failed");
        }
    }
}
