//! Transport batching for serialized records.
//!
//! Records leave a serializer as JSON objects. Before upload they are packed
//! into batches: JSON array literals whose byte length stays under a bound.
//!
//! # Architecture
//!
//! - **BatchPacker**: greedy, order-preserving packing under a byte bound
//! - **BatchWriter**: writes batches plus a `manifest.json` to `<dir>/<rootId>/`,
//!   optionally zstd-compressed
//! - **BatchReader**: reads a batch directory back, checking length and CRC32

pub mod batch;
pub mod error;
pub mod reader;
pub mod writer;

pub use batch::{Batch, BatchPacker};
pub use error::{PackError, PackResult};
pub use reader::BatchReader;
pub use writer::{BatchEntry, BatchManifest, BatchSet, BatchWriter, MANIFEST_FILE};

#[cfg(test)]
mod tests {
    use super::*;
    use bos_crypto::ContentHasher;
    use bos_types::{Closure, Primitive, RecordBody, Reference, Resolved, TraversedRecord};
    use indexmap::IndexMap;

    fn seal(body: RecordBody) -> TraversedRecord {
        let id = ContentHasher::MD5.hash_record(&body).unwrap();
        TraversedRecord::new(id, body)
    }

    #[test]
    fn records_survive_pack_write_read() {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Resolved::Primitive(Primitive::String("leaf".into())));
        let leaf = seal(RecordBody::new("Base", props, Closure::new()));

        let mut props = IndexMap::new();
        props.insert(
            "@child".to_string(),
            Resolved::Reference(Reference::new(leaf.id().clone())),
        );
        let closure: Closure = [(leaf.id().clone(), 1)].into_iter().collect();
        let root = seal(RecordBody::new("Base", props, closure));

        let batches = BatchPacker::default().pack([&leaf, &root]).unwrap();
        assert_eq!(batches.len(), 1);

        let tmp = tempfile::tempdir().unwrap();
        let set = BatchWriter::new(tmp.path())
            .compressed(1)
            .write(root.id(), root.total_children_count(), &batches)
            .unwrap();
        let reader = BatchReader::open(&set.dir).unwrap();
        let records = reader.records().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], root.id().as_str());
        assert_eq!(records[1]["totalChildrenCount"], 1);
        assert_eq!(records[1]["__closure"][leaf.id().as_str()], 1);
        assert!(reader.dangling_references().unwrap().is_empty());
        assert_eq!(reader.manifest().total_children_count, 1);
    }
}
