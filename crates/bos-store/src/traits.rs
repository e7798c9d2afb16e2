use bos_types::{ObjectId, TraversedRecord};

use crate::error::StoreResult;

/// Content-addressed record store.
///
/// All implementations must satisfy these invariants:
/// - Records are immutable once written. Content-addressing guarantees this:
///   the same content always produces the same id.
/// - Writes are idempotent: writing an id that is already present with
///   identical content is a no-op.
/// - Iteration yields records in first-write order.
pub trait ObjectStore {
    /// Look up a record by id.
    fn read(&self, id: &ObjectId) -> Option<&TraversedRecord>;

    /// Write a record under its own id and return that id.
    ///
    /// Fails with `ContentMismatch` if a different record already holds the id.
    fn write(&mut self, record: TraversedRecord) -> StoreResult<ObjectId>;

    /// Check whether a record exists in the store.
    fn exists(&self, id: &ObjectId) -> bool {
        self.read(id).is_some()
    }

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Returns `true` if nothing has been stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records in first-write order.
    fn records(&self) -> Box<dyn Iterator<Item = &TraversedRecord> + '_>;

    /// Write multiple records and return their ids.
    fn write_batch(&mut self, records: Vec<TraversedRecord>) -> StoreResult<Vec<ObjectId>> {
        records.into_iter().map(|record| self.write(record)).collect()
    }
}
