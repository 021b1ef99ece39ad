//! JSON file cache store.
//!
//! Layout: `<root>/<scope dir>/<kind>.json`, each file a versioned document:
//!
//! ```json
//! { "version": 1, "kind": "contact", "records": [ ... ] }
//! ```
//!
//! Writes go to a temporary file in the same directory, which is synced and
//! then renamed over the target. A reader sees either the old or the new
//! document, never a partial one.

use super::{check_kind, CacheError, CacheScope, CacheStore};
use async_trait::async_trait;
use roster_types::{CacheRecord, RecordKind};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current document format version.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    kind: RecordKind,
    #[serde(default)]
    records: Vec<CacheRecord>,
}

/// Cache store backed by JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the records of `kind` in `scope`.
    pub fn path_for(&self, scope: &CacheScope, kind: RecordKind) -> PathBuf {
        self.root
            .join(scope.dir_name())
            .join(format!("{}.json", kind.as_str()))
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn get_all(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
    ) -> Result<Vec<CacheRecord>, CacheError> {
        let path = self.path_for(scope, kind);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache file at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };

        let document: CacheDocument = match serde_json::from_slice(&bytes) {
            Ok(document) => document,
            Err(e) => return Err(CacheError::Json { path, source: e }),
        };
        if document.version > CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path,
                version: document.version,
            });
        }
        if document.kind != kind {
            return Err(CacheError::KindMismatch {
                expected: kind,
                found: document.kind,
            });
        }
        check_kind(kind, &document.records)?;

        tracing::debug!(
            "Read {} {} records from {}",
            document.records.len(),
            kind,
            path.display()
        );
        Ok(document.records)
    }

    async fn put(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
        records: Vec<CacheRecord>,
    ) -> Result<(), CacheError> {
        check_kind(kind, &records)?;

        let path = self.path_for(scope, kind);
        let count = records.len();
        let document = CacheDocument {
            version: CACHE_VERSION,
            kind,
            records,
        };
        let bytes = match serde_json::to_vec_pretty(&document) {
            Ok(bytes) => bytes,
            Err(e) => return Err(CacheError::Json { path, source: e }),
        };

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))??;

        tracing::debug!("Wrote {} {} records to {}", count, kind, path.display());
        Ok(())
    }
}

/// Replace `path` with `bytes` through a synced temporary file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let io_err = |source: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(parent).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    #[cfg(unix)]
    std::fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(io_err)?;

    Ok(())
}
