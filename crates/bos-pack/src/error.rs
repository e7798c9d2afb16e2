use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid batch size: {0} bytes")]
    InvalidBatchSize(usize),

    #[error("CRC32 mismatch for batch {file}")]
    CrcMismatch { file: String },

    #[error("length mismatch for batch {file}: manifest says {expected} bytes, found {actual}")]
    LengthMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("malformed batch {file}: {reason}")]
    MalformedBatch { file: String, reason: String },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type PackResult<T> = Result<T, PackError>;
