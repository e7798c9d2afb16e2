use bos_types::TraversedRecord;
use tracing::info;

use crate::error::{PackError, PackResult};

/// One transport batch: a JSON array literal of serialized records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    json: String,
    object_count: usize,
}

impl Batch {
    pub fn as_str(&self) -> &str {
        &self.json
    }

    pub fn into_string(self) -> String {
        self.json
    }

    /// Number of records in this batch.
    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// Length of the JSON text in bytes.
    pub fn byte_len(&self) -> usize {
        self.json.len()
    }

    /// CRC32 of the JSON text.
    pub fn crc32(&self) -> u32 {
        crc32fast::hash(self.json.as_bytes())
    }
}

/// Greedy, order-preserving packer of records into byte-bounded batches.
///
/// Records are never reordered, never split and never dropped. A batch never
/// exceeds `max_bytes` unless it holds a single record that is larger than the
/// bound on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPacker {
    max_bytes: usize,
}

impl BatchPacker {
    /// One megabyte, counted in decimal.
    pub const DEFAULT_MAX_BYTES: usize = 1_000_000;

    pub fn new(max_bytes: usize) -> PackResult<Self> {
        if max_bytes == 0 {
            return Err(PackError::InvalidBatchSize(max_bytes));
        }
        Ok(Self { max_bytes })
    }

    /// Bound expressed in (decimal) megabytes.
    pub fn from_megabytes(megabytes: usize) -> PackResult<Self> {
        Self::new(megabytes.saturating_mul(1000 * 1000))
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Serialize and pack records in the given order.
    pub fn pack<'a, I>(&self, records: I) -> PackResult<Vec<Batch>>
    where
        I: IntoIterator<Item = &'a TraversedRecord>,
    {
        let serialized = records
            .into_iter()
            .map(|record| {
                record
                    .to_json_string()
                    .map_err(|e| PackError::Serialization(e.to_string()))
            })
            .collect::<PackResult<Vec<String>>>()?;
        Ok(self.pack_serialized(serialized))
    }

    /// Pack already-serialized JSON values in the given order.
    pub fn pack_serialized<I>(&self, items: I) -> Vec<Batch>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut batches = Vec::new();
        let mut current = String::new();
        let mut count = 0usize;

        for item in items {
            let item = item.as_ref();
            // Appending costs a comma plus the item, and the batch still needs its `]`.
            if count > 0 && current.len() + 1 + item.len() + 1 > self.max_bytes {
                batches.push(close(&mut current, &mut count));
            }
            current.push(if count == 0 { '[' } else { ',' });
            current.push_str(item);
            count += 1;
        }
        if count > 0 {
            batches.push(close(&mut current, &mut count));
        }

        info!(
            batches = batches.len(),
            max_bytes = self.max_bytes,
            "records packed"
        );
        batches
    }
}

impl Default for BatchPacker {
    fn default() -> Self {
        Self {
            max_bytes: Self::DEFAULT_MAX_BYTES,
        }
    }
}

fn close(current: &mut String, count: &mut usize) -> Batch {
    current.push(']');
    let batch = Batch {
        json: std::mem::take(current),
        object_count: *count,
    };
    *count = 0;
    batch
}
