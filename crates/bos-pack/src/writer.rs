use std::path::{Path, PathBuf};

use bos_types::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::Batch;
use crate::error::{PackError, PackResult};

/// File name of the manifest inside a batch directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes a batch directory on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    pub root_id: ObjectId,
    pub total_children_count: usize,
    pub compressed: bool,
    pub batches: Vec<BatchEntry>,
}

impl BatchManifest {
    /// Total number of records across all batches.
    pub fn object_count(&self) -> usize {
        self.batches.iter().map(|b| b.object_count).sum()
    }
}

/// One batch file listed in a manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub file: String,
    pub object_count: usize,
    /// Length of the uncompressed JSON text.
    pub byte_len: usize,
    /// CRC32 of the uncompressed JSON text.
    pub crc32: u32,
}

/// Result of writing a batch directory.
#[derive(Clone, Debug)]
pub struct BatchSet {
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: BatchManifest,
}

/// Writes transport batches to `<dir>/<rootId>/`.
pub struct BatchWriter {
    dir: PathBuf,
    compress: bool,
    level: i32,
}

impl BatchWriter {
    /// Create a writer targeting the given parent directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            compress: false,
            level: 3,
        }
    }

    /// Compress each batch file with zstd at the given level.
    pub fn compressed(mut self, level: i32) -> Self {
        self.compress = true;
        self.level = level;
        self
    }

    /// Write the batches and a manifest. Existing files are overwritten.
    pub fn write(
        self,
        root_id: &ObjectId,
        total_children_count: usize,
        batches: &[Batch],
    ) -> PackResult<BatchSet> {
        let dir = self.dir.join(root_id.as_str());
        std::fs::create_dir_all(&dir)?;

        let mut entries = Vec::with_capacity(batches.len());
        for (index, batch) in batches.iter().enumerate() {
            let file = if self.compress {
                format!("batch-{index:04}.json.zst")
            } else {
                format!("batch-{index:04}.json")
            };
            let bytes = if self.compress {
                zstd::encode_all(batch.as_str().as_bytes(), self.level)
                    .map_err(|e| PackError::CompressionFailed(e.to_string()))?
            } else {
                batch.as_str().as_bytes().to_vec()
            };
            std::fs::write(dir.join(&file), &bytes)?;
            entries.push(BatchEntry {
                file,
                object_count: batch.object_count(),
                byte_len: batch.byte_len(),
                crc32: batch.crc32(),
            });
        }

        let manifest = BatchManifest {
            root_id: root_id.clone(),
            total_children_count,
            compressed: self.compress,
            batches: entries,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(&manifest)
            .map_err(|e| PackError::Serialization(e.to_string()))?;
        std::fs::write(&manifest_path, text)?;

        info!(
            root = %root_id.short_hex(),
            batches = manifest.batches.len(),
            dir = %dir.display(),
            "batches written"
        );
        Ok(BatchSet {
            dir,
            manifest_path,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchPacker;

    #[test]
    fn writes_manifest_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = ObjectId::from_digest(&[0xAB; 16]);
        let batches = BatchPacker::new(8).unwrap().pack_serialized(["1", "22", "333"]);

        let set = BatchWriter::new(tmp.path()).write(&root, 2, &batches).unwrap();
        assert_eq!(set.dir, tmp.path().join(root.as_str()));
        assert!(set.manifest_path.exists());
        assert_eq!(set.manifest.object_count(), 3);
        assert!(!set.manifest.compressed);
        for entry in &set.manifest.batches {
            let text = std::fs::read_to_string(set.dir.join(&entry.file)).unwrap();
            assert_eq!(text.len(), entry.byte_len);
        }
    }

    #[test]
    fn compressed_files_use_zst_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let root = ObjectId::from_digest(&[1; 16]);
        let batches = BatchPacker::default().pack_serialized(["{\"a\":1}"]);
        let set = BatchWriter::new(tmp.path())
            .compressed(3)
            .write(&root, 0, &batches)
            .unwrap();
        assert!(set.manifest.compressed);
        assert!(set.manifest.batches[0].file.ends_with(".json.zst"));
    }
}
