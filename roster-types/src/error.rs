//! Error types for roster-types.

use thiserror::Error;

/// Errors raised while parsing a protocol address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input was empty.
    #[error("address is empty")]
    Empty,

    /// An `@` was present but nothing preceded it.
    #[error("empty localpart in address {0:?}")]
    EmptyLocalpart(String),

    /// No domain could be found.
    #[error("empty domain in address {0:?}")]
    EmptyDomain(String),

    /// A `/` was present but nothing followed it.
    #[error("empty resource in address {0:?}")]
    EmptyResource(String),
}

/// Errors raised while reading a roster snapshot document.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not valid snapshot JSON.
    #[error("invalid snapshot document: {0}")]
    Json(#[from] serde_json::Error),

    /// An item key is not a valid address.
    #[error("invalid address {key:?} in snapshot: {source}")]
    Address {
        /// The offending item key.
        key: String,
        /// Why it failed to parse.
        #[source]
        source: AddressError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AddressError::EmptyDomain("user@".into());
        assert_eq!(err.to_string(), "empty domain in address \"user@\"");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AddressError>();
        assert_send_sync::<SnapshotError>();
    }
}
