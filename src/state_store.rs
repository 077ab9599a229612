use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::formats::{BlogContent, Outline, TopicIdea};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStep {
    #[default]
    Topic,
    Outline,
    Content,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub current_step: FlowStep,
    #[serde(default)]
    pub selected_topic: Option<TopicIdea>,
}

/// Search quota bookkeeping: requests counted since `window_start` (epoch millis).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    pub window_start: i64,
    pub count: u32,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_flow(&self) -> anyhow::Result<Option<FlowState>>;
    async fn save_flow(&self, state: &FlowState) -> anyhow::Result<()>;
    async fn load_outline(&self) -> anyhow::Result<Option<Outline>>;
    async fn save_outline(&self, outline: &Outline) -> anyhow::Result<()>;
    async fn load_content(&self) -> anyhow::Result<Option<BlogContent>>;
    async fn save_content(&self, content: &BlogContent) -> anyhow::Result<()>;
    async fn load_rate_limit(&self) -> anyhow::Result<Option<RateLimitState>>;
    async fn save_rate_limit(&self, state: &RateLimitState) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LocalFsStateStore {
    base_dir: PathBuf,
}

impl LocalFsStateStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn state_path(&self, name: &str) -> PathBuf {
        self.base_dir.join("state").join(format!("{name}.json"))
    }

    async fn load<T: serde::de::DeserializeOwned>(&self, name: &str) -> anyhow::Result<Option<T>> {
        let path = self.state_path(name);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn save<T: Serialize + Sync>(&self, name: &str, value: &T) -> anyhow::Result<()> {
        let path = self.state_path(name);
        write_json_atomic(&path, value)
            .await
            .with_context(|| format!("write {name}.json"))
    }
}

#[async_trait]
impl StateStore for LocalFsStateStore {
    async fn load_flow(&self) -> anyhow::Result<Option<FlowState>> {
        self.load("flow").await
    }

    async fn save_flow(&self, state: &FlowState) -> anyhow::Result<()> {
        self.save("flow", state).await
    }

    async fn load_outline(&self) -> anyhow::Result<Option<Outline>> {
        self.load("outline").await
    }

    async fn save_outline(&self, outline: &Outline) -> anyhow::Result<()> {
        self.save("outline", outline).await
    }

    async fn load_content(&self) -> anyhow::Result<Option<BlogContent>> {
        self.load("content").await
    }

    async fn save_content(&self, content: &BlogContent) -> anyhow::Result<()> {
        self.save("content", content).await
    }

    async fn load_rate_limit(&self) -> anyhow::Result<Option<RateLimitState>> {
        self.load("rate_limit").await
    }

    async fn save_rate_limit(&self, state: &RateLimitState) -> anyhow::Result<()> {
        self.save("rate_limit", state).await
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
