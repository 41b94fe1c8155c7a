//! Locally cached auth artifacts and their purge routine.

use crate::config::app_dir;
use crate::error::AppError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "tokens.json";
const STORE_ENV_VAR: &str = "TASKVIEW_TOKEN_STORE_PATH";

/// Key/value storage the auth client caches session artifacts in.
pub trait TokenStorage: Send + Sync {
    fn keys(&self) -> Result<Vec<String>, AppError>;
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Token cache persisted as a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct JsonTokenStore {
    path: PathBuf,
}

impl JsonTokenStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, AppError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|err| AppError::io(err.to_string()))?;
        let stored: StoredTokens = serde_json::from_str(&content)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;

        if stored.schema_version != SCHEMA_VERSION {
            return Err(AppError::invalid_data("schema_version mismatch"));
        }

        Ok(stored.entries)
    }

    fn save(&self, entries: BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let stored = StoredTokens {
            schema_version: SCHEMA_VERSION,
            entries,
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;

        // Write a sibling file and rename it over the cache so readers never
        // see a partial write.
        let staging = self.staging_path();
        if staging.exists() {
            tracing::debug!(path = %staging.display(), "discarding stale token staging file");
            std::fs::remove_file(&staging).map_err(|err| AppError::io(err.to_string()))?;
        }
        write_owner_only(&staging, content.as_bytes()).inspect_err(|_| {
            std::fs::remove_file(&staging).ok();
        })?;
        std::fs::rename(&staging, &self.path).map_err(|err| AppError::io(err.to_string()))
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| STORE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_owner_only(path: &Path, content: &[u8]) -> Result<(), AppError> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|err| AppError::io(err.to_string()))
}

impl TokenStorage for JsonTokenStore {
    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(self.load()?.into_keys().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(entries)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(entries)?;
        }
        Ok(())
    }
}

pub fn token_store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(STORE_FILE_NAME))
}

/// Which cached keys belong to the auth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeyRules {
    pub prefixes: Vec<String>,
    pub markers: Vec<String>,
}

impl TokenKeyRules {
    pub fn new(prefixes: Vec<String>, markers: Vec<String>) -> Self {
        Self { prefixes, markers }
    }

    pub fn matches(&self, key: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
            || self
                .markers
                .iter()
                .any(|marker| !marker.is_empty() && key.contains(marker.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: Vec<String>,
    pub failures: Vec<AppError>,
}

/// Removes every auth key from every storage. A failing storage does not
/// stop the purge of the others.
pub fn purge_auth_artifacts(storages: &[&dyn TokenStorage], rules: &TokenKeyRules) -> PurgeReport {
    let mut report = PurgeReport::default();

    for storage in storages {
        let keys = match storage.keys() {
            Ok(keys) => keys,
            Err(err) => {
                report.failures.push(err);
                continue;
            }
        };

        for key in keys.into_iter().filter(|key| rules.matches(key)) {
            match storage.remove(&key) {
                Ok(()) => report.removed.push(key),
                Err(err) => report.failures.push(err),
            }
        }
    }

    if !report.failures.is_empty() {
        tracing::warn!(
            failures = report.failures.len(),
            "some cached auth artifacts could not be removed"
        );
    }
    tracing::debug!(removed = report.removed.len(), "purged cached auth artifacts");

    report
}
