//! Post-order decomposition of a Base Object into traversed records.
//!
//! A [`TraversalContext`] carries all mutable state of one pass: the detach
//! stack, the closure tracker, the target store, and the application-id and
//! host-handle registrations the pass produced. The serializer applies those
//! registrations only once the pass has succeeded.

use std::num::NonZeroUsize;

use bos_crypto::ContentHasher;
use bos_store::ObjectStore;
use bos_types::{
    BaseObject, ChunkAnnotation, HostHandle, ObjectId, ObjectReference, Primitive, PropertyKey,
    RecordBody, Reference, Resolved, TraversedRecord, Value,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::ReferenceCache;
use crate::chunk;
use crate::closure::ClosureTracker;
use crate::error::{SerializeError, SerializeResult};

pub(crate) struct TraversalContext<'s> {
    hasher: ContentHasher,
    default_chunk_size: NonZeroUsize,
    register_host_handles: bool,
    store: &'s mut dyn ObjectStore,
    cache: Option<&'s dyn ReferenceCache>,
    tracker: ClosureTracker,
    detach_stack: Vec<bool>,
    pub(crate) application_refs: Vec<(String, ObjectReference)>,
    pub(crate) handle_refs: Vec<(HostHandle, ObjectReference)>,
    /// Ids taken from pre-resolved references rather than decomposed here.
    pub(crate) adopted: Vec<ObjectId>,
}

impl<'s> TraversalContext<'s> {
    pub(crate) fn new(
        hasher: ContentHasher,
        default_chunk_size: NonZeroUsize,
        register_host_handles: bool,
        store: &'s mut dyn ObjectStore,
        cache: Option<&'s dyn ReferenceCache>,
    ) -> Self {
        Self {
            hasher,
            default_chunk_size,
            register_host_handles,
            store,
            cache,
            tracker: ClosureTracker::new(),
            detach_stack: Vec::new(),
            application_refs: Vec::new(),
            handle_refs: Vec::new(),
            adopted: Vec::new(),
        }
    }

    /// Decompose one Base Object. Detached frames, and the root, are written
    /// to the store.
    pub(crate) fn decompose(
        &mut self,
        base: &BaseObject,
        detached: bool,
    ) -> SerializeResult<TraversedRecord> {
        let opened_at = self.detach_stack.len();
        self.detach_stack.push(detached);
        let token = self.tracker.open(opened_at);

        let properties = self.traverse_properties(base)?;

        self.detach_stack.pop();
        let closure = self.tracker.close(token)?;

        let body = RecordBody::new(base.speckle_type(), properties, closure);
        let id = self.hasher.hash_record(&body)?;
        let record = TraversedRecord::new(id, body);

        if let Some(application_id) = record.body().application_id() {
            let reference = ObjectReference::new(record.id().clone())
                .with_application_id(application_id.clone())
                .with_closure(record.closure().clone());
            self.application_refs.push((application_id, reference));
        }

        if detached {
            self.store.write(record.clone())?;
            debug!(
                id = %record.id().short_hex(),
                speckle_type = record.speckle_type(),
                children = record.total_children_count(),
                "record stored"
            );
        }
        Ok(record)
    }

    fn traverse_properties(
        &mut self,
        base: &BaseObject,
    ) -> SerializeResult<IndexMap<String, Resolved>> {
        let mut properties = IndexMap::with_capacity(base.len());

        for (raw, value) in base.iter() {
            if value.is_null() || PropertyKey::is_reserved(raw) {
                continue;
            }
            if let Value::Primitive(primitive) = value {
                check_primitive(primitive)?;
                properties.insert(raw.to_string(), Resolved::Primitive(primitive.clone()));
                continue;
            }

            let key = PropertyKey::parse(raw);
            if PropertyKey::is_reserved(key.name) {
                warn!(key = raw, "annotated key names a reserved field, skipped");
                continue;
            }
            let detach = key.is_detached();

            if let Some(annotation) = &key.chunk {
                if let ChunkAnnotation::Malformed(text) = annotation {
                    warn!(
                        key = raw,
                        annotation = %text,
                        default = self.default_chunk_size.get(),
                        "malformed chunk annotation, using default size"
                    );
                }
                match value {
                    Value::Array(items) if chunk::is_chunkable(items) => {
                        let size = annotation.resolve(self.default_chunk_size);
                        let chunked = self.chunk(items, size)?;
                        debug!(
                            key = key.name,
                            elements = items.len(),
                            size = size.get(),
                            "property chunked"
                        );
                        properties.insert(key.name.to_string(), chunked);
                        continue;
                    }
                    Value::Array(_) => {
                        warn!(key = raw, "array holds objects, chunking skipped");
                    }
                    other => {
                        debug!(key = raw, kind = other.kind(), "chunk annotation on non-array ignored");
                    }
                }
            }

            let resolved = self.traverse_value(value, detach)?;
            let resolved = self.place(resolved, detach);
            properties.insert(key.name.to_string(), resolved);
        }
        Ok(properties)
    }

    /// Generic recursion over any value.
    fn traverse_value(&mut self, value: &Value, detach: bool) -> SerializeResult<Resolved> {
        match value {
            Value::Primitive(primitive) => {
                check_primitive(primitive)?;
                Ok(Resolved::Primitive(primitive.clone()))
            }
            Value::Map(entries) => {
                entries.values().try_for_each(check_opaque)?;
                Ok(Resolved::Opaque(entries.clone()))
            }
            Value::Reference(reference) => Ok(Resolved::Reference(self.adopt(reference))),
            Value::Object(base) => Ok(Resolved::Record(Box::new(self.decompose(base, detach)?))),
            Value::HostTuple(inner, handles) => self.traverse_host_tuple(inner, handles, detach),
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    let child = self.traverse_value(item, detach)?;
                    resolved.push(self.place(child, detach));
                }
                Ok(Resolved::Array(resolved))
            }
        }
    }

    fn traverse_host_tuple(
        &mut self,
        inner: &Value,
        handles: &[HostHandle],
        detach: bool,
    ) -> SerializeResult<Resolved> {
        let Value::Object(base) = inner else {
            return Err(SerializeError::unsupported(
                "host tuple",
                format!("converted value is a {}, expected a base object", inner.kind()),
            ));
        };

        if let Some(cache) = self.cache {
            if let Some(cached) = handles.iter().find_map(|h| cache.get(h)).cloned() {
                debug!(id = %cached.referenced_id.short_hex(), "host object served from cache");
                return Ok(Resolved::Reference(self.adopt(&cached)));
            }
        }

        let record = self.decompose(base, detach)?;
        // Only stored records may be served from the cache later.
        if self.register_host_handles && detach {
            let mut reference =
                ObjectReference::new(record.id().clone()).with_closure(record.closure().clone());
            reference.application_id = record.body().application_id();
            for handle in handles {
                self.handle_refs.push((handle.clone(), reference.clone()));
            }
        }
        Ok(Resolved::Record(Box::new(record)))
    }

    /// Split a plain array into always-detached chunk records.
    fn chunk(&mut self, items: &[Value], size: NonZeroUsize) -> SerializeResult<Resolved> {
        let mut references = Vec::new();
        for piece in chunk::split(items, size) {
            let record = self.decompose(&piece, true)?;
            references.push(Resolved::Reference(self.detach(record.id())));
        }
        Ok(Resolved::Array(references))
    }

    /// A detached record becomes a reference; everything else is inlined.
    fn place(&mut self, resolved: Resolved, detach: bool) -> Resolved {
        match resolved {
            Resolved::Record(record) if detach => Resolved::Reference(self.detach(record.id())),
            other => other,
        }
    }

    /// Substitute a stored child with a reference and fold it into every
    /// open frame at the current depth.
    fn detach(&mut self, id: &ObjectId) -> Reference {
        self.tracker.record(id, self.detach_stack.len());
        Reference::new(id.clone())
    }

    /// Substitute a pre-resolved record. Its own closure entries are folded
    /// in below it.
    fn adopt(&mut self, reference: &ObjectReference) -> Reference {
        let depth = self.detach_stack.len();
        for (id, relative) in reference.closure.iter() {
            self.tracker.record(id, depth + relative);
            self.adopted.push(id.clone());
        }
        self.adopted.push(reference.referenced_id.clone());
        self.detach(&reference.referenced_id)
    }
}

fn check_primitive(primitive: &Primitive) -> SerializeResult<()> {
    if primitive.is_representable() {
        Ok(())
    } else {
        Err(SerializeError::unsupported(
            "float",
            format!("{primitive:?} has no JSON representation"),
        ))
    }
}

fn check_opaque(value: &Value) -> SerializeResult<()> {
    match value {
        Value::Primitive(primitive) => check_primitive(primitive),
        Value::Array(items) => items.iter().try_for_each(check_opaque),
        Value::Map(entries) => entries.values().try_for_each(check_opaque),
        Value::Object(base) => base.iter().try_for_each(|(_, v)| check_opaque(v)),
        Value::HostTuple(inner, _) => check_opaque(inner),
        Value::Reference(_) => Ok(()),
    }
}
