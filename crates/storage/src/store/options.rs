#![forbid(unsafe_code)]

use super::StoreError;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_FILE: &str = "categories.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_KEY: &str = "category_tree";

const CACHE_DIR: &str = "cache";

const STORAGE_DIR_ENV: &str = "CATTREE_STORAGE_DIR";
const DB_FILE_ENV: &str = "CATTREE_DB_FILE";
const BUSY_TIMEOUT_ENV: &str = "CATTREE_BUSY_TIMEOUT_MS";
const CACHE_KEY_ENV: &str = "CATTREE_CACHE_KEY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub storage_dir: PathBuf,
    pub db_file_name: String,
    pub busy_timeout: Duration,
    pub cache_key: String,
}

impl StoreOptions {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            db_file_name: DEFAULT_DB_FILE.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
        }
    }

    pub fn with_db_file_name(mut self, name: impl Into<String>) -> Self {
        self.db_file_name = name.into();
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = key.into();
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.db_file_name)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.storage_dir.join(CACHE_DIR)
    }

    /// `cache_dir` with the storage dir resolved, so two spellings of the same
    /// directory compare equal. The storage dir must exist.
    pub fn canonical_cache_dir(&self) -> std::io::Result<PathBuf> {
        Ok(std::fs::canonicalize(&self.storage_dir)?.join(CACHE_DIR))
    }

    /// Reads `CATTREE_STORAGE_DIR` (required), `CATTREE_DB_FILE`,
    /// `CATTREE_BUSY_TIMEOUT_MS` and `CATTREE_CACHE_KEY`.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let storage_dir = lookup(STORAGE_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or(StoreError::InvalidInput("CATTREE_STORAGE_DIR is not set"))?;
        let mut options = Self::new(storage_dir.trim());

        if let Some(name) = lookup(DB_FILE_ENV).filter(|value| !value.trim().is_empty()) {
            options.db_file_name = name.trim().to_string();
        }
        if let Some(raw) = lookup(BUSY_TIMEOUT_ENV) {
            let millis = raw.trim().parse::<u64>().map_err(|_| {
                StoreError::InvalidInput("CATTREE_BUSY_TIMEOUT_MS must be an integer")
            })?;
            options.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(key) = lookup(CACHE_KEY_ENV).filter(|value| !value.trim().is_empty()) {
            options.cache_key = key.trim().to_string();
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn storage_dir_is_required() {
        let err = StoreOptions::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn env_overrides_defaults() {
        let options = StoreOptions::from_lookup(lookup(&[
            ("CATTREE_STORAGE_DIR", "/tmp/cattree"),
            ("CATTREE_DB_FILE", "tree.db"),
            ("CATTREE_BUSY_TIMEOUT_MS", "250"),
            ("CATTREE_CACHE_KEY", "shop_tree"),
        ]))
        .unwrap();
        assert_eq!(options.db_path(), PathBuf::from("/tmp/cattree/tree.db"));
        assert_eq!(options.busy_timeout, Duration::from_millis(250));
        assert_eq!(options.cache_key, "shop_tree");
    }

    #[test]
    fn defaults_apply_when_only_dir_is_set() {
        let options =
            StoreOptions::from_lookup(lookup(&[("CATTREE_STORAGE_DIR", "/tmp/cattree")])).unwrap();
        assert_eq!(options, StoreOptions::new("/tmp/cattree"));
        assert_eq!(options.db_file_name, DEFAULT_DB_FILE);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = StoreOptions::from_lookup(lookup(&[
            ("CATTREE_STORAGE_DIR", "/tmp/cattree"),
            ("CATTREE_BUSY_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }
}
