use std::collections::HashMap;

use bos_types::{HostHandle, ObjectReference};

/// Pre-resolved records keyed by host-object handle.
///
/// The cache lets unchanged host objects skip re-decomposition: a host tuple
/// whose handle is cached is replaced by the cached reference. Eviction and
/// invalidation belong to the caller.
pub trait ReferenceCache {
    /// Look up the reference registered for a handle.
    fn get(&self, handle: &HostHandle) -> Option<&ObjectReference>;

    /// Register a reference for a handle, replacing any previous entry.
    fn insert(&mut self, handle: HostHandle, reference: ObjectReference);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-map backed [`ReferenceCache`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryReferenceCache {
    entries: HashMap<HostHandle, ObjectReference>,
}

impl InMemoryReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the entry for a handle, e.g. after the host object changed.
    pub fn invalidate(&mut self, handle: &HostHandle) -> Option<ObjectReference> {
        self.entries.remove(handle)
    }
}

impl ReferenceCache for InMemoryReferenceCache {
    fn get(&self, handle: &HostHandle) -> Option<&ObjectReference> {
        self.entries.get(handle)
    }

    fn insert(&mut self, handle: HostHandle, reference: ObjectReference) {
        self.entries.insert(handle, reference);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_types::ObjectId;

    #[test]
    fn insert_get_invalidate() {
        let mut cache = InMemoryReferenceCache::new();
        let handle = HostHandle::new("entity-17");
        let reference = ObjectReference::new(ObjectId::from_digest(&[4; 16]));
        assert!(cache.is_empty());

        cache.insert(handle.clone(), reference.clone());
        assert_eq!(cache.get(&handle), Some(&reference));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.invalidate(&handle), Some(reference));
        assert!(cache.get(&handle).is_none());
    }
}
