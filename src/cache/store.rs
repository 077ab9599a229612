use std::collections::BTreeMap;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

/// A string-keyed, string-valued medium, shaped like browser web storage.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

/// Process-local medium. Lives as long as the process, like a browser session.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!(op = "memory_store", "recovered from poisoned store lock");
                poisoned.into_inner()
            }
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.items().remove(key);
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.items().keys().cloned().collect())
    }
}

/// Persistent medium: one JSON envelope file per key under `dir`.
///
/// File names are the sha256 of the key so arbitrary query text is safe on disk; the key
/// itself is stored inside the envelope for enumeration.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    value: String,
}

impl LocalFsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let digest = sha2::Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn read_envelope(path: &Path) -> anyhow::Result<Option<Envelope>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("read: {}", path.display()));
            }
        };
        let envelope = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse envelope: {}", path.display()))?;
        Ok(Some(envelope))
    }
}

impl KeyValueStore for LocalFsStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.item_path(key);
        Ok(Self::read_envelope(&path)?
            .filter(|envelope| envelope.key == key)
            .map(|envelope| envelope.value))
    }

    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create store dir: {}", self.dir.display()))?;

        let path = self.item_path(key);
        let envelope = Envelope {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        let data = serde_json::to_vec(&envelope).context("serialize envelope")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("create tmp in: {}", self.dir.display()))?;
        tmp.write_all(&data).context("write tmp")?;
        tmp.flush().context("flush tmp")?;
        tmp.persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("rename tmp to final: {}", path.display()))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let path = self.item_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove: {}", path.display())),
        }
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read dir: {}", self.dir.display()));
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.context("read dir entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_envelope(&path) {
                Ok(Some(envelope)) => keys.push(envelope.key),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %format!("{err:#}"),
                        "skipping unreadable store item"
                    );
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
