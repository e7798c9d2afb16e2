use std::num::NonZeroUsize;
use std::path::Path;

use bos_crypto::{ContentHasher, HashAlgorithm};
use bos_pack::BatchPacker;
use serde::{Deserialize, Serialize};

use crate::error::{SerializeError, SerializeResult};

/// Configuration for a serializer instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Chunk size for `@()` keys and malformed chunk annotations.
    pub default_chunk_size: usize,
    /// Byte bound for each transport batch.
    pub max_batch_bytes: usize,
    /// Digest used to derive record ids.
    pub hash_algorithm: HashAlgorithm,
    /// Register the handles of decomposed host tuples in the reference cache.
    pub register_host_handles: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 1000,
            max_batch_bytes: BatchPacker::DEFAULT_MAX_BYTES,
            hash_algorithm: HashAlgorithm::Md5,
            register_host_handles: false,
        }
    }
}

impl SerializerConfig {
    /// Parse from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> SerializeResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SerializeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> SerializeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SerializeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> SerializeResult<()> {
        if self.default_chunk_size == 0 {
            return Err(SerializeError::InvalidConfig(
                "default_chunk_size must be positive".into(),
            ));
        }
        if self.max_batch_bytes == 0 {
            return Err(SerializeError::InvalidConfig(
                "max_batch_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> SerializeResult<NonZeroUsize> {
        NonZeroUsize::new(self.default_chunk_size).ok_or_else(|| {
            SerializeError::InvalidConfig("default_chunk_size must be positive".into())
        })
    }

    pub fn hasher(&self) -> ContentHasher {
        ContentHasher::new(self.hash_algorithm)
    }

    pub fn packer(&self) -> SerializeResult<BatchPacker> {
        Ok(BatchPacker::new(self.max_batch_bytes)?)
    }
}
