use bos_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found: {0}")]
    NotFound(ObjectId),

    /// A different record is already stored under the same id.
    #[error("content mismatch for {0}: a different record is already stored under this id")]
    ContentMismatch(ObjectId),

    /// Hashing failed while verifying a record.
    #[error("hash error: {0}")]
    Hash(#[from] bos_crypto::HasherError),

    /// A record could not be rendered to its canonical bytes.
    #[error("record encoding error: {0}")]
    Encoding(#[from] bos_types::TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
