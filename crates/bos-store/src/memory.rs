use indexmap::map::Entry;
use indexmap::IndexMap;

use bos_types::{ObjectId, TraversedRecord};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory, insertion-ordered record store.
///
/// Owned by exactly one serializer for the duration of a decomposition pass;
/// writes take `&mut self`, so the store cannot be shared across concurrent
/// passes.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    records: IndexMap<ObjectId, TraversedRecord>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ids in first-write order.
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.records.keys()
    }

    /// The `totalChildrenCount` of a stored record.
    pub fn total_children_count(&self, id: &ObjectId) -> Option<usize> {
        self.records.get(id).map(TraversedRecord::total_children_count)
    }

    /// Drop every record written after the first `len`.
    ///
    /// Used to roll back a failed decomposition pass.
    pub fn truncate(&mut self, len: usize) {
        if len < self.records.len() {
            debug!(from = self.records.len(), to = len, "store rolled back");
            self.records.truncate(len);
        }
    }

    /// Remove all records from the store.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Move the records out, in first-write order.
    pub fn into_records(self) -> Vec<TraversedRecord> {
        self.records.into_values().collect()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> Option<&TraversedRecord> {
        self.records.get(id)
    }

    fn write(&mut self, record: TraversedRecord) -> StoreResult<ObjectId> {
        let id = record.id().clone();
        match self.records.entry(id.clone()) {
            // Distinct values can render to the same bytes, so compare what was hashed.
            Entry::Occupied(existing) => {
                if existing.get().body().canonical_bytes()? != record.body().canonical_bytes()? {
                    return Err(StoreError::ContentMismatch(id));
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> bool {
        self.records.contains_key(id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn records(&self) -> Box<dyn Iterator<Item = &TraversedRecord> + '_> {
        Box::new(self.records.values())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("record_count", &self.records.len())
            .finish()
    }
}
