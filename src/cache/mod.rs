//! Expiring key/value cache for expensive lookups.
//!
//! Keys are `{namespace}_{partition}_{query}`; the partition label is recomputed from the clock
//! on every operation. Storage failures never reach the caller: they are logged and the
//! operation degrades to a miss (or a dropped write).

pub mod clock;
pub mod codec;
pub mod store;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context as _;
use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use self::clock::{Clock, SystemClock};
use self::codec::EntryCodec;
use self::store::{KeyValueStore, LocalFsStore, MemoryStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKind {
    #[default]
    #[serde(alias = "localStorage")]
    Persistent,
    #[serde(alias = "sessionStorage")]
    Session,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Partition {
    #[default]
    Day,
    Week,
    Month,
}

impl Partition {
    pub fn label(self, date: NaiveDate) -> String {
        match self {
            Self::Day => format!("{}_{}_{}", date.year(), date.month(), date.day()),
            Self::Week => {
                // Week of the month, Sunday-based: ceil((day + 6 - weekday) / 7).
                let weekday = date.weekday().num_days_from_sunday();
                let week = (date.day() + 6 - weekday).div_ceil(7);
                format!("{}_w{week}", date.year())
            }
            Self::Month => format!("{}_m{}", date.year(), date.month()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub storage: StorageKind,
    /// Milliseconds after which an entry is stale.
    #[serde(rename = "expiry")]
    pub expiry_ms: u64,
    /// `None` or `Some(0)` means unbounded.
    pub max_entries: Option<usize>,
    pub namespace: String,
    pub compression: bool,
    pub encryption_key: Option<String>,
    pub partition_by: Partition,
    pub persist_on_reload: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Persistent,
            expiry_ms: 24 * 60 * 60 * 1000,
            max_entries: Some(100),
            namespace: "search_cache".to_owned(),
            compression: false,
            encryption_key: None,
            partition_by: Partition::Day,
            persist_on_reload: true,
        }
    }
}

impl CacheConfig {
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read cache config: {}", path.display()))?;
        serde_yaml::from_str(&raw).context("parse cache config yaml")
    }
}

/// The two string media a cache may write to. The in-memory map belongs to the cache itself.
#[derive(Debug, Clone)]
pub struct CacheMedia {
    pub persistent: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl CacheMedia {
    pub fn in_memory() -> Self {
        Self {
            persistent: Arc::new(MemoryStore::new()),
            session: Arc::new(MemoryStore::new()),
        }
    }

    pub fn local(dir: impl AsRef<Path>) -> Self {
        Self {
            persistent: Arc::new(LocalFsStore::new(dir.as_ref())),
            session: Arc::new(MemoryStore::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub query: String,
    pub data: T,
    /// Unix epoch milliseconds at the time of `set`.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
    pub storage_type: StorageKind,
}

pub struct ResultCache<T> {
    config: CacheConfig,
    media: CacheMedia,
    codec: EntryCodec,
    clock: Arc<dyn Clock>,
    memory: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> std::fmt::Debug for ResultCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("namespace", &self.config.namespace)
            .field("storage", &self.config.storage)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl<T> ResultCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(config: CacheConfig, media: CacheMedia) -> Self {
        Self::with_clock(config, media, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, media: CacheMedia, clock: Arc<dyn Clock>) -> Self {
        let codec = EntryCodec::new(config.compression, config.encryption_key.as_deref());
        let cache = Self {
            config,
            media,
            codec,
            clock,
            memory: Mutex::new(HashMap::new()),
        };
        if cache.mirrors_to_persistent() {
            cache.rehydrate();
        }
        cache
    }

    pub fn get(&self, query: &str) -> Option<T> {
        let key = self.cache_key(query);
        let entry = match self.load(&key) {
            Ok(entry) => entry?,
            Err(err) => {
                tracing::warn!(query, error = %format!("{err:#}"), "cache read failed");
                return None;
            }
        };

        if self.is_expired(&entry, self.now_millis()) {
            tracing::debug!(query, "cache entry expired");
            self.remove_key(&key);
            return None;
        }
        Some(entry.data)
    }

    pub fn set(&self, query: &str, data: T) {
        if let Err(err) = self.try_set(query, data) {
            tracing::warn!(query, error = %format!("{err:#}"), "cache write failed; entry dropped");
        }
    }

    pub fn remove(&self, query: &str) {
        let key = self.cache_key(query);
        self.remove_key(&key);
    }

    /// Removes every entry under this cache's current namespace and partition.
    pub fn clear(&self) {
        let prefix = self.prefix();
        match self.config.storage {
            StorageKind::Memory => {
                self.memory_map().retain(|key, _| !key.starts_with(&prefix));
                if self.mirrors_to_persistent()
                    && let Err(err) = remove_prefixed(self.media.persistent.as_ref(), &prefix)
                {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        "cache clear of persistent mirror failed"
                    );
                }
            }
            StorageKind::Persistent | StorageKind::Session => {
                if let Err(err) = remove_prefixed(self.string_store(), &prefix) {
                    tracing::warn!(error = %format!("{err:#}"), "cache clear failed");
                }
            }
        }
    }

    pub fn clear_expired(&self) {
        let now = self.now_millis();
        match self.entries() {
            Ok(entries) => {
                let mut removed = 0usize;
                for (key, entry) in entries {
                    if self.is_expired(&entry, now) {
                        self.remove_key(&key);
                        removed += 1;
                    }
                }
                tracing::debug!(removed, "cleared expired cache entries");
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cache expiry sweep failed");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cache stats failed");
                Vec::new()
            }
        };
        let timestamps = entries.iter().map(|(_, e)| e.timestamp);
        CacheStats {
            total_entries: entries.len(),
            oldest_entry: timestamps
                .clone()
                .min()
                .and_then(DateTime::from_timestamp_millis),
            newest_entry: timestamps.max().and_then(DateTime::from_timestamp_millis),
            storage_type: self.config.storage,
        }
    }

    fn try_set(&self, query: &str, data: T) -> anyhow::Result<()> {
        let key = self.cache_key(query);
        if let Some(max) = self.config.max_entries.filter(|max| *max > 0) {
            self.enforce_max_entries(max, &key);
        }

        let entry = CacheEntry {
            query: query.to_owned(),
            data,
            timestamp: self.now_millis(),
        };

        match self.config.storage {
            StorageKind::Memory => {
                let encoded = if self.mirrors_to_persistent() {
                    Some(self.encode_entry(&entry)?)
                } else {
                    None
                };
                self.memory_map().insert(key.clone(), entry);
                if let Some(encoded) = encoded {
                    self.media
                        .persistent
                        .set_item(&key, &encoded)
                        .context("mirror entry to persistent storage")?;
                }
            }
            StorageKind::Persistent | StorageKind::Session => {
                let encoded = self.encode_entry(&entry)?;
                self.string_store()
                    .set_item(&key, &encoded)
                    .context("write entry")?;
            }
        }
        Ok(())
    }

    /// Evicts the oldest entries until a new key fits. Unlike a plain "at or over capacity"
    /// rule, overwriting a key that is already stored never evicts, so a refresh cannot push
    /// out an unrelated entry.
    fn enforce_max_entries(&self, max: usize, incoming_key: &str) {
        let mut entries = match self.entries() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cache eviction failed");
                return;
            }
        };
        if entries.iter().any(|(key, _)| key == incoming_key) {
            return;
        }

        entries.sort_by_key(|(_, entry)| entry.timestamp);
        let mut entries = entries.into_iter();
        let mut live = entries.len();
        while live >= max {
            let Some((key, entry)) = entries.next() else {
                break;
            };
            tracing::debug!(query = %entry.query, "evicting oldest cache entry");
            self.remove_key(&key);
            live -= 1;
        }
    }

    fn remove_key(&self, key: &str) {
        let result = match self.config.storage {
            StorageKind::Memory => {
                self.memory_map().remove(key);
                if self.mirrors_to_persistent() {
                    self.media.persistent.remove_item(key)
                } else {
                    Ok(())
                }
            }
            StorageKind::Persistent | StorageKind::Session => self.string_store().remove_item(key),
        };
        if let Err(err) = result {
            tracing::warn!(key, error = %format!("{err:#}"), "cache remove failed");
        }
    }

    fn load(&self, key: &str) -> anyhow::Result<Option<CacheEntry<T>>> {
        match self.config.storage {
            StorageKind::Memory => Ok(self.memory_map().get(key).cloned()),
            StorageKind::Persistent | StorageKind::Session => {
                let raw = self.string_store().get_item(key).context("read entry")?;
                Ok(raw.and_then(|raw| self.decode_entry(&raw)))
            }
        }
    }

    /// All readable entries under the current prefix.
    fn entries(&self) -> anyhow::Result<Vec<(String, CacheEntry<T>)>> {
        let prefix = self.prefix();
        match self.config.storage {
            StorageKind::Memory => Ok(self
                .memory_map()
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect()),
            StorageKind::Persistent | StorageKind::Session => {
                self.read_prefixed(self.string_store(), &prefix)
            }
        }
    }

    fn read_prefixed(
        &self,
        store: &dyn KeyValueStore,
        prefix: &str,
    ) -> anyhow::Result<Vec<(String, CacheEntry<T>)>> {
        let mut out = Vec::new();
        for key in store.keys().context("list keys")? {
            if !key.starts_with(prefix) {
                continue;
            }
            let Some(raw) = store.get_item(&key).context("read entry")? else {
                continue;
            };
            if let Some(entry) = self.decode_entry(&raw) {
                out.push((key, entry));
            }
        }
        Ok(out)
    }

    fn rehydrate(&self) {
        let prefix = self.prefix();
        match self.read_prefixed(self.media.persistent.as_ref(), &prefix) {
            Ok(entries) => {
                let count = entries.len();
                self.memory_map().extend(entries);
                tracing::debug!(
                    count,
                    namespace = %self.config.namespace,
                    "rehydrated memory cache"
                );
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cache rehydration failed");
            }
        }
    }

    fn encode_entry(&self, entry: &CacheEntry<T>) -> anyhow::Result<String> {
        let json = serde_json::to_string(entry).context("serialize cache entry")?;
        Ok(self.codec.encode(&json))
    }

    fn decode_entry(&self, raw: &str) -> Option<CacheEntry<T>> {
        let json = self.codec.decode(raw);
        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "cache entry is unreadable; treating as absent");
                None
            }
        }
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: i64) -> bool {
        let age = now.saturating_sub(entry.timestamp);
        age > i64::try_from(self.config.expiry_ms).unwrap_or(i64::MAX)
    }

    fn mirrors_to_persistent(&self) -> bool {
        self.config.storage == StorageKind::Memory && self.config.persist_on_reload
    }

    fn string_store(&self) -> &dyn KeyValueStore {
        match self.config.storage {
            StorageKind::Session => self.media.session.as_ref(),
            StorageKind::Persistent | StorageKind::Memory => self.media.persistent.as_ref(),
        }
    }

    fn prefix(&self) -> String {
        let today = self.clock.now().date_naive();
        format!(
            "{}_{}_",
            self.config.namespace,
            self.config.partition_by.label(today)
        )
    }

    fn cache_key(&self, query: &str) -> String {
        format!("{}{query}", self.prefix())
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn memory_map(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        match self.memory.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(op = "result_cache", "recovered from poisoned cache lock");
                poisoned.into_inner()
            }
        }
    }
}

fn remove_prefixed(store: &dyn KeyValueStore, prefix: &str) -> anyhow::Result<()> {
    for key in store.keys().context("list keys")? {
        if key.starts_with(prefix) {
            store.remove_item(&key).context("remove entry")?;
        }
    }
    Ok(())
}
