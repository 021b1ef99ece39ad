//! Local roster cache.
//!
//! The cache holds, per account scope and record kind, the full list of
//! records last saved. There is no partial update: every `put` replaces the
//! list wholesale.
//!
//! Implementations:
//! - [`JsonFileStore`] - one JSON document per scope and kind on disk
//! - [`MemoryCacheStore`] - in memory, for tests

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryCacheStore;

use async_trait::async_trait;
use roster_types::{Address, CacheRecord, RecordKind};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing a cache file failed.
    #[error("cache I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A cache file is not a valid cache document.
    #[error("invalid cache document {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A cache document was written by a newer format.
    #[error("unsupported cache version {version} in {path}")]
    UnsupportedVersion {
        /// File involved.
        path: PathBuf,
        /// Version found.
        version: u32,
    },

    /// A record of the wrong kind was found or offered.
    #[error("expected {expected} record, found {found}")]
    KindMismatch {
        /// Kind of the list.
        expected: RecordKind,
        /// Kind of the record.
        found: RecordKind,
    },

    /// The store is not available.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A blocking worker failed.
    #[error("cache worker failed: {0}")]
    Task(String),
}

/// Which account a cache list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheScope {
    account: Address,
}

impl CacheScope {
    /// Scope of an account, keyed by its bare address.
    pub fn account(address: &Address) -> Self {
        Self {
            account: address.bare(),
        }
    }

    /// The account address.
    pub fn address(&self) -> &Address {
        &self.account
    }

    /// File system safe name for the scope.
    ///
    /// Bytes outside `[A-Za-z0-9._@-]` are written as `%XX`.
    pub fn dir_name(&self) -> String {
        let raw = self.account.to_string();
        let mut out = String::with_capacity(raw.len());
        for byte in raw.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'@' | b'-' => {
                    out.push(byte as char)
                }
                _ => out.push_str(&format!("%{:02X}", byte)),
            }
        }
        // Never produce "." or "..".
        if out.chars().all(|c| c == '.') {
            out = out.replace('.', "%2E");
        }
        out
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account:{}", self.account)
    }
}

/// Storage for cached roster records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// All records of `kind` in `scope`. A scope never written is empty.
    async fn get_all(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
    ) -> Result<Vec<CacheRecord>, CacheError>;

    /// Replace all records of `kind` in `scope`.
    async fn put(
        &self,
        scope: &CacheScope,
        kind: RecordKind,
        records: Vec<CacheRecord>,
    ) -> Result<(), CacheError>;
}

/// Reject records that do not belong in a list of `kind`.
pub(crate) fn check_kind(kind: RecordKind, records: &[CacheRecord]) -> Result<(), CacheError> {
    match records.iter().find(|r| r.kind() != kind) {
        Some(record) => Err(CacheError::KindMismatch {
            expected: kind,
            found: record.kind(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_uses_bare_address() {
        let scope = CacheScope::account(&Address::parse("me@example.org/laptop").unwrap());
        assert_eq!(scope.address(), &Address::parse("me@example.org").unwrap());
        assert_eq!(scope.to_string(), "account:me@example.org");
    }

    #[test]
    fn dir_name_escapes_unsafe_bytes() {
        let scope = CacheScope::account(&Address::parse("me@example.org").unwrap());
        assert_eq!(scope.dir_name(), "me@example.org");

        let scope = CacheScope::account(&Address::parse("a b\\c@example.org").unwrap());
        assert_eq!(scope.dir_name(), "a%20b%5Cc@example.org");

        let scope = CacheScope::account(&Address::parse("..").unwrap());
        assert_eq!(scope.dir_name(), "%2E%2E");
    }

    #[test]
    fn check_kind_rejects_foreign_records() {
        use roster_types::{BookmarkRecord, ContactRecord};

        let contact = CacheRecord::Contact(ContactRecord::new(
            Address::parse("a@example.org").unwrap(),
        ));
        let bookmark = CacheRecord::Bookmark(BookmarkRecord::new(
            Address::parse("room@muc.example").unwrap(),
        ));

        assert!(check_kind(RecordKind::Contact, &[contact.clone()]).is_ok());
        assert!(matches!(
            check_kind(RecordKind::Contact, &[contact, bookmark]),
            Err(CacheError::KindMismatch {
                expected: RecordKind::Contact,
                found: RecordKind::Bookmark
            })
        ));
    }
}
