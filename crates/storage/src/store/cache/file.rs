#![forbid(unsafe_code)]

use super::{CacheStore, CacheStoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One file per key under `dir`. Writes go to a temp file first and are
/// renamed into place, so readers never see a torn entry.
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cache", sanitize_key(key)))
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        match std::fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_forever(&self, key: &str, value: &[u8]) -> Result<(), CacheStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(
            "{}.tmp.{}.{seq}",
            sanitize_key(key),
            std::process::id()
        ));
        std::fs::write(&tmp, value)?;
        if let Err(err) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), CacheStoreError> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn sanitize_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
