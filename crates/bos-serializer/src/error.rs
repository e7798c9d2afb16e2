use bos_crypto::HasherError;
use bos_pack::PackError;
use bos_store::StoreError;

/// Errors that abort a decomposition pass.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// A value the decomposition cannot represent on the wire.
    #[error("unsupported {kind}: {detail}")]
    UnsupportedValue { kind: &'static str, detail: String },

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lineage frame was closed out of order.
    #[error("lineage frame closed out of order")]
    LineageMismatch,

    /// Hashing failed.
    #[error("hash error: {0}")]
    Hash(#[from] HasherError),

    /// Writing to the record store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Batch packing failed.
    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl SerializeError {
    pub fn unsupported(kind: &'static str, detail: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            kind,
            detail: detail.into(),
        }
    }
}

/// Result alias for serializer operations.
pub type SerializeResult<T> = Result<T, SerializeError>;
