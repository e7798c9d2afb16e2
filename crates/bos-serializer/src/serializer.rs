use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use bos_crypto::ContentHasher;
use bos_pack::{Batch, BatchPacker};
use bos_store::{AuditReport, InMemoryObjectStore, ObjectStore, StoreAuditor, StoreError};
use bos_types::{BaseObject, ObjectId, ObjectReference};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::ReferenceCache;
use crate::config::SerializerConfig;
use crate::error::SerializeResult;
use crate::traverse::TraversalContext;

/// What a sender uploads: the root id, its children count and the batches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayload {
    pub id: ObjectId,
    pub total_children_count: usize,
    pub batches: Vec<String>,
}

/// Decomposes Base Objects into a content-addressed record store.
///
/// One instance owns its store, its application-id index and its optional
/// reference cache. [`serialize`](Self::serialize) takes `&mut self`, so a
/// single instance can never run two passes at once; independent passes use
/// independent instances.
///
/// A pass is all-or-nothing: if decomposition fails, every record and
/// registration it made is discarded.
pub struct BaseObjectSerializer {
    config: SerializerConfig,
    hasher: ContentHasher,
    default_chunk_size: NonZeroUsize,
    store: InMemoryObjectStore,
    object_references: IndexMap<String, ObjectReference>,
    external: BTreeSet<ObjectId>,
    cache: Option<Box<dyn ReferenceCache>>,
}

impl BaseObjectSerializer {
    pub fn new(config: SerializerConfig) -> SerializeResult<Self> {
        config.validate()?;
        Ok(Self {
            hasher: config.hasher(),
            default_chunk_size: config.chunk_size()?,
            config,
            store: InMemoryObjectStore::new(),
            object_references: IndexMap::new(),
            external: BTreeSet::new(),
            cache: None,
        })
    }

    /// Attach a reference cache consulted for host tuples.
    pub fn with_cache(mut self, cache: impl ReferenceCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Decompose `base` as a root and return its id.
    pub fn serialize(&mut self, base: &BaseObject) -> SerializeResult<ObjectId> {
        let checkpoint = self.store.len();
        let mut ctx = TraversalContext::new(
            self.hasher,
            self.default_chunk_size,
            self.config.register_host_handles,
            &mut self.store,
            self.cache.as_deref(),
        );
        let result = ctx.decompose(base, true);
        let application_refs = std::mem::take(&mut ctx.application_refs);
        let handle_refs = std::mem::take(&mut ctx.handle_refs);
        let adopted = std::mem::take(&mut ctx.adopted);
        drop(ctx);

        let root = match result {
            Ok(root) => root,
            Err(e) => {
                self.store.truncate(checkpoint);
                warn!(speckle_type = base.speckle_type(), error = %e, "decomposition failed, pass rolled back");
                return Err(e);
            }
        };

        self.object_references.extend(application_refs);
        if let Some(cache) = self.cache.as_mut() {
            for (handle, reference) in handle_refs {
                cache.insert(handle, reference);
            }
        }
        self.external
            .extend(adopted.into_iter().filter(|id| !self.store.exists(id)));

        info!(
            root = %root.id().short_hex(),
            speckle_type = root.speckle_type(),
            children = root.total_children_count(),
            records = self.store.len(),
            "base object serialized"
        );
        Ok(root.id().clone())
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryObjectStore {
        &self.store
    }

    pub fn into_store(self) -> InMemoryObjectStore {
        self.store
    }

    pub fn cache(&self) -> Option<&dyn ReferenceCache> {
        self.cache.as_deref()
    }

    /// `totalChildrenCount` of a stored record.
    pub fn total_children_count(&self, id: &ObjectId) -> Option<usize> {
        self.store.total_children_count(id)
    }

    /// References to every decomposed record that carried an
    /// `applicationId`, keyed by that id.
    pub fn object_references(&self) -> &IndexMap<String, ObjectReference> {
        &self.object_references
    }

    /// Ids referenced through pre-resolved references or the cache that are
    /// not in this serializer's store.
    pub fn external_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.external.iter().filter(|id| !self.store.exists(id))
    }

    /// Pack every stored record, in first-write order, under `max_bytes`.
    pub fn batch_json_objects(&self, max_bytes: usize) -> SerializeResult<Vec<Batch>> {
        let packer = BatchPacker::new(max_bytes)?;
        Ok(packer.pack(self.store.records())?)
    }

    /// Pack under the configured bound.
    pub fn batches(&self) -> SerializeResult<Vec<Batch>> {
        Ok(self.config.packer()?.pack(self.store.records())?)
    }

    /// The upload payload for a serialized root.
    pub fn payload(&self, root_id: &ObjectId) -> SerializeResult<SendPayload> {
        let total_children_count = self
            .total_children_count(root_id)
            .ok_or_else(|| StoreError::NotFound(root_id.clone()))?;
        let batches = self.batches()?.into_iter().map(Batch::into_string).collect();
        Ok(SendPayload {
            id: root_id.clone(),
            total_children_count,
            batches,
        })
    }

    /// Check the finished store: ids, references and closures.
    pub fn audit(&self) -> SerializeResult<AuditReport> {
        let auditor = StoreAuditor::new(self.hasher).allow_external(self.external_ids().cloned());
        Ok(auditor.audit(&self.store)?)
    }
}

impl std::fmt::Debug for BaseObjectSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseObjectSerializer")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("object_references", &self.object_references.len())
            .field("cached", &self.cache.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// Serialize one root with a fresh serializer and build its payload.
pub fn serialize_to_payload(
    base: &BaseObject,
    config: SerializerConfig,
) -> SerializeResult<SendPayload> {
    let mut serializer = BaseObjectSerializer::new(config)?;
    let id = serializer.serialize(base)?;
    serializer.payload(&id)
}
