use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the persistence and validation layers.
///
/// Gameplay code rarely lets these escape: corrupt records load as absent
/// data and validation failures count as rejections.
#[derive(Error, Debug)]
pub enum KalimaError {
    /// SQLite failure in the key/value store.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored record could not be encoded or decoded.
    #[error("malformed record '{key}': {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Encoding a value for storage failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state directory could not be created.
    #[error("cannot create state directory '{path}'")]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A validity tier could not reach a verdict.
    #[error("validity tier '{tier}' failed: {detail}")]
    Tier { tier: &'static str, detail: String },
}

pub type Result<T> = std::result::Result<T, KalimaError>;
