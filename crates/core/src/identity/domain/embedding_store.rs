use std::path::PathBuf;

use thiserror::Error;

use super::identity_record::IdentityRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Persisted state exists but does not have the expected shape.
    /// Never to be treated as an empty store.
    #[error("embedding store {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("failed to read embedding store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The previous persisted state is left intact.
    #[error("failed to write embedding store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("embedding has {actual} dimensions but the store holds {expected}-dimensional embeddings")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Durable collection of enrolled identities.
///
/// Insertion order is preserved. Records are never updated or removed.
pub trait EmbeddingStore: Send {
    /// Returns every persisted record, or an empty list when nothing has
    /// been persisted yet.
    fn load(&self) -> Result<Vec<IdentityRecord>, StoreError>;

    /// Persists `record` after all existing ones. Either the full new
    /// collection is persisted or the previous state remains.
    fn append(&mut self, record: IdentityRecord) -> Result<(), StoreError>;
}
