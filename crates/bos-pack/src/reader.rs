use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bos_types::wire::{ID_KEY, REFERENCED_ID_KEY, REFERENCE_TYPE, TYPE_KEY};
use serde_json::Value as Json;
use tracing::debug;

use crate::error::{PackError, PackResult};
use crate::writer::{BatchManifest, MANIFEST_FILE};

/// Reads a batch directory written by [`BatchWriter`](crate::BatchWriter).
///
/// Every batch is checked against the manifest's length and CRC32 on open.
#[derive(Debug)]
pub struct BatchReader {
    dir: PathBuf,
    manifest: BatchManifest,
    batches: Vec<String>,
}

impl BatchReader {
    /// Open a `<rootId>` directory containing a manifest.
    pub fn open(dir: &Path) -> PackResult<Self> {
        let text = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: BatchManifest =
            serde_json::from_str(&text).map_err(|e| PackError::InvalidManifest(e.to_string()))?;

        let mut batches = Vec::with_capacity(manifest.batches.len());
        for entry in &manifest.batches {
            let raw = std::fs::read(dir.join(&entry.file))?;
            let bytes = if manifest.compressed {
                zstd::decode_all(raw.as_slice())
                    .map_err(|e| PackError::DecompressionFailed(e.to_string()))?
            } else {
                raw
            };
            if bytes.len() != entry.byte_len {
                return Err(PackError::LengthMismatch {
                    file: entry.file.clone(),
                    expected: entry.byte_len,
                    actual: bytes.len(),
                });
            }
            if crc32fast::hash(&bytes) != entry.crc32 {
                return Err(PackError::CrcMismatch {
                    file: entry.file.clone(),
                });
            }
            let json = String::from_utf8(bytes).map_err(|e| PackError::MalformedBatch {
                file: entry.file.clone(),
                reason: e.to_string(),
            })?;
            batches.push(json);
        }

        debug!(dir = %dir.display(), batches = batches.len(), "batch directory opened");
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            batches,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &BatchManifest {
        &self.manifest
    }

    /// Raw JSON text of each batch, in order.
    pub fn batches(&self) -> &[String] {
        &self.batches
    }

    /// All records across all batches, in order.
    pub fn records(&self) -> PackResult<Vec<Json>> {
        let mut records = Vec::new();
        for (entry, text) in self.manifest.batches.iter().zip(&self.batches) {
            let parsed: Vec<Json> =
                serde_json::from_str(text).map_err(|e| PackError::MalformedBatch {
                    file: entry.file.clone(),
                    reason: e.to_string(),
                })?;
            if parsed.len() != entry.object_count {
                return Err(PackError::MalformedBatch {
                    file: entry.file.clone(),
                    reason: format!(
                        "manifest lists {} records, batch holds {}",
                        entry.object_count,
                        parsed.len()
                    ),
                });
            }
            records.extend(parsed);
        }
        Ok(records)
    }

    /// Referenced ids that no record in the directory provides.
    pub fn dangling_references(&self) -> PackResult<BTreeSet<String>> {
        let records = self.records()?;
        let present: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.get(ID_KEY).and_then(Json::as_str))
            .collect();

        let mut referenced = BTreeSet::new();
        for record in &records {
            collect_references(record, &mut referenced);
        }
        referenced.retain(|id| !present.contains(id.as_str()));
        Ok(referenced)
    }
}

fn collect_references(json: &Json, out: &mut BTreeSet<String>) {
    match json {
        Json::Object(map) => {
            if map.get(TYPE_KEY).and_then(Json::as_str) == Some(REFERENCE_TYPE) {
                if let Some(id) = map.get(REFERENCED_ID_KEY).and_then(Json::as_str) {
                    out.insert(id.to_string());
                }
                return;
            }
            map.values().for_each(|v| collect_references(v, out));
        }
        Json::Array(items) => items.iter().for_each(|v| collect_references(v, out)),
        _ => {}
    }
}
