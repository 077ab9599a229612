use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::cache::clock::SystemClock;
use crate::cache::{CacheConfig, CacheMedia, ResultCache};
use crate::formats::SerpData;
use crate::generation::Generator;
use crate::openai::{OpenAiClient, OpenAiConfig};
use crate::search::{
    CachedSearch, FallbackSearch, GoogleSearch, RateLimitConfig, RateLimiter, SearchProvider,
    SerpApiSearch, google, serpapi,
};
use crate::state_store::{LocalFsStateStore, StateStore};

pub const DEFAULT_DATA_DIR: &str = ".blogflow";

#[derive(Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub google_api_key: Option<String>,
    pub google_engine_id: Option<String>,
    pub google_base_url: String,
    pub serpapi_key: Option<String>,
    pub serpapi_base_url: String,
    pub data_dir: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai", &self.openai)
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<redacted>"))
            .field("google_engine_id", &self.google_engine_id)
            .field("google_base_url", &self.google_base_url)
            .field("serpapi_key", &self.serpapi_key.as_ref().map(|_| "<redacted>"))
            .field("serpapi_base_url", &self.serpapi_base_url)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        Ok(Self {
            openai: OpenAiConfig::from_lookup(&lookup).context("openai config")?,
            google_api_key: get("GOOGLE_SEARCH_API_KEY"),
            google_engine_id: get("GOOGLE_SEARCH_ENGINE_ID"),
            google_base_url: get("BLOGFLOW_GOOGLE_BASE_URL")
                .unwrap_or_else(|| google::DEFAULT_BASE_URL.to_owned()),
            serpapi_key: get("SERPAPI_KEY"),
            serpapi_base_url: get("BLOGFLOW_SERPAPI_BASE_URL")
                .unwrap_or_else(|| serpapi::DEFAULT_BASE_URL.to_owned()),
            data_dir: get("BLOGFLOW_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        })
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn state_store(&self) -> Arc<dyn StateStore> {
        Arc::new(LocalFsStateStore::new(&self.data_dir))
    }

    /// Search results cache over the on-disk medium under the data directory.
    pub fn search_cache(
        &self,
        cache_config: Option<&Path>,
    ) -> anyhow::Result<ResultCache<SerpData>> {
        let config = match cache_config {
            Some(path) => CacheConfig::from_yaml_file(path)
                .with_context(|| format!("load cache config: {}", path.display()))?,
            None => CacheConfig::default(),
        };
        Ok(ResultCache::new(config, CacheMedia::local(self.cache_dir())))
    }

    /// SerpApi first with Google as fallback when `SERPAPI_KEY` is set, Google alone otherwise.
    pub fn search_provider(&self, client: reqwest::Client) -> Arc<dyn SearchProvider> {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitConfig::default(),
            self.state_store(),
            Arc::new(SystemClock),
        ));
        let google: Arc<dyn SearchProvider> = Arc::new(
            GoogleSearch::new(
                client.clone(),
                self.google_api_key.clone().unwrap_or_default(),
                self.google_engine_id.clone().unwrap_or_default(),
                self.google_base_url.clone(),
            )
            .with_rate_limiter(limiter),
        );

        match &self.serpapi_key {
            Some(key) => {
                tracing::debug!("using serpapi with google fallback");
                let serp: Arc<dyn SearchProvider> = Arc::new(SerpApiSearch::new(
                    client,
                    key.clone(),
                    self.serpapi_base_url.clone(),
                ));
                Arc::new(FallbackSearch::new(serp, google))
            }
            None => google,
        }
    }

    pub fn cached_search(
        &self,
        client: reqwest::Client,
        cache_config: Option<&Path>,
    ) -> anyhow::Result<Arc<CachedSearch>> {
        let cache = self.search_cache(cache_config)?;
        Ok(Arc::new(CachedSearch::new(cache, self.search_provider(client))))
    }

    /// Generator over the OpenAI Responses API, with search enrichment attached.
    pub fn generator(&self, client: reqwest::Client) -> anyhow::Result<Generator> {
        let llm = OpenAiClient::new(client.clone(), &self.openai).context("openai client")?;
        let search = self.cached_search(client, None)?;
        Ok(Generator::new(Arc::new(llm)).with_search(search))
    }
}
