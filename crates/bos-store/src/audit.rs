//! Integrity audit of a finished record store.
//!
//! A [`StoreAuditor`] checks the structural guarantees a consumer relies on
//! when it receives a store's records:
//!
//! - every record's id matches the hash of its content,
//! - every `referencedId` resolves to a stored record,
//! - every record's closure contains exactly the detached descendants
//!   transitively reachable from it.
//!
//! Ids that were short-circuited through an external cache can be declared
//! up front; references to them are not reported as dangling.

use std::collections::{HashMap, HashSet};

use bos_crypto::ContentHasher;
use bos_types::ObjectId;
use serde::Serialize;

use crate::error::StoreResult;
use crate::traits::ObjectStore;

/// A single integrity violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The stored id is not the hash of the record's content.
    IdMismatch { id: ObjectId },
    /// A reference points at an id that is neither stored nor external.
    DanglingReference { from: ObjectId, missing: ObjectId },
    /// A reachable detached descendant is absent from the closure.
    ClosureMissing { id: ObjectId, descendant: ObjectId },
    /// The closure names an id that is not reachable from the record.
    ClosureExtraneous { id: ObjectId, descendant: ObjectId },
}

/// Result of auditing a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub records_checked: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if no violations were found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn dangling(&self) -> impl Iterator<Item = &ObjectId> {
        self.violations.iter().filter_map(|v| match v {
            Violation::DanglingReference { missing, .. } => Some(missing),
            _ => None,
        })
    }
}

/// Audits a store against its hasher.
pub struct StoreAuditor {
    hasher: ContentHasher,
    external: HashSet<ObjectId>,
}

impl StoreAuditor {
    pub fn new(hasher: ContentHasher) -> Self {
        Self {
            hasher,
            external: HashSet::new(),
        }
    }

    /// Declare ids resolved outside this store (cache short-circuits).
    pub fn allow_external(mut self, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.external.extend(ids);
        self
    }

    /// Run every check over every record.
    pub fn audit(&self, store: &dyn ObjectStore) -> StoreResult<AuditReport> {
        let mut report = AuditReport::default();
        let mut reachable: HashMap<ObjectId, Reach> = HashMap::new();

        for record in store.records() {
            report.records_checked += 1;
            let id = record.id();

            if !self.hasher.verify_record(record)? {
                report.violations.push(Violation::IdMismatch { id: id.clone() });
            }

            for target in record.referenced_ids() {
                if !store.exists(target) && !self.external.contains(target) {
                    report.violations.push(Violation::DanglingReference {
                        from: id.clone(),
                        missing: target.clone(),
                    });
                }
            }

            let reach = self.reach(store, id, &mut reachable);
            for descendant in &reach.ids {
                if !record.closure().contains(descendant) {
                    report.violations.push(Violation::ClosureMissing {
                        id: id.clone(),
                        descendant: descendant.clone(),
                    });
                }
            }
            // Past an unresolved id the subtree is unknown; extra entries may
            // legitimately come from a pre-resolved closure.
            if reach.complete {
                for descendant in record.closure().ids() {
                    if !reach.ids.contains(descendant) {
                        report.violations.push(Violation::ClosureExtraneous {
                            id: id.clone(),
                            descendant: descendant.clone(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            records = report.records_checked,
            violations = report.violations.len(),
            "store audit complete"
        );
        Ok(report)
    }

    /// Detached descendants transitively reachable from `id`, memoized.
    fn reach(
        &self,
        store: &dyn ObjectStore,
        id: &ObjectId,
        memo: &mut HashMap<ObjectId, Reach>,
    ) -> Reach {
        if let Some(reach) = memo.get(id) {
            return reach.clone();
        }
        let mut reach = Reach {
            ids: HashSet::new(),
            complete: true,
        };
        if let Some(record) = store.read(id) {
            for child in record.referenced_ids() {
                reach.ids.insert(child.clone());
                if store.exists(child) {
                    let sub = self.reach(store, child, memo);
                    reach.complete &= sub.complete;
                    reach.ids.extend(sub.ids);
                } else {
                    reach.complete = false;
                }
            }
        }
        memo.insert(id.clone(), reach.clone());
        reach
    }
}

#[derive(Clone, Debug)]
struct Reach {
    ids: HashSet<ObjectId>,
    complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use bos_types::{Closure, Primitive, RecordBody, Reference, Resolved, TraversedRecord};
    use indexmap::IndexMap;

    fn seal(body: RecordBody) -> TraversedRecord {
        let id = ContentHasher::MD5.hash_record(&body).unwrap();
        TraversedRecord::new(id, body)
    }

    fn leaf(name: &str) -> TraversedRecord {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Resolved::Primitive(Primitive::String(name.into())));
        seal(RecordBody::new("Base", props, Closure::new()))
    }

    fn parent(children: &[&ObjectId], closure: Closure) -> TraversedRecord {
        let mut props = IndexMap::new();
        props.insert(
            "@elements".to_string(),
            Resolved::Array(
                children
                    .iter()
                    .map(|id| Resolved::Reference(Reference::new((*id).clone())))
                    .collect(),
            ),
        );
        seal(RecordBody::new("Base", props, closure))
    }

    #[test]
    fn clean_store_passes() {
        let mut store = InMemoryObjectStore::new();
        let child = leaf("child");
        let root = parent(&[child.id()], [(child.id().clone(), 1)].into_iter().collect());
        store.write(child).unwrap();
        store.write(root).unwrap();

        let report = StoreAuditor::new(ContentHasher::MD5).audit(&store).unwrap();
        assert_eq!(report.records_checked, 2);
        assert!(report.is_clean(), "{:?}", report.violations);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let mut store = InMemoryObjectStore::new();
        let missing = leaf("never stored");
        let root = parent(&[missing.id()], [(missing.id().clone(), 1)].into_iter().collect());
        store.write(root).unwrap();

        let report = StoreAuditor::new(ContentHasher::MD5).audit(&store).unwrap();
        assert_eq!(report.dangling().collect::<Vec<_>>(), vec![missing.id()]);

        let report = StoreAuditor::new(ContentHasher::MD5)
            .allow_external([missing.id().clone()])
            .audit(&store)
            .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn closure_gaps_are_reported() {
        let mut store = InMemoryObjectStore::new();
        let grandchild = leaf("grandchild");
        let child = parent(&[grandchild.id()], [(grandchild.id().clone(), 1)].into_iter().collect());
        // Root forgets the grandchild and invents an unrelated id.
        let stray = leaf("stray");
        let root = parent(
            &[child.id()],
            [(child.id().clone(), 1), (stray.id().clone(), 1)].into_iter().collect(),
        );
        let root_id = root.id().clone();
        store.write(grandchild.clone()).unwrap();
        store.write(child).unwrap();
        store.write(root).unwrap();

        let report = StoreAuditor::new(ContentHasher::MD5).audit(&store).unwrap();
        assert!(report.violations.contains(&Violation::ClosureMissing {
            id: root_id.clone(),
            descendant: grandchild.id().clone(),
        }));
        assert!(report.violations.contains(&Violation::ClosureExtraneous {
            id: root_id,
            descendant: stray.id().clone(),
        }));
    }

    #[test]
    fn tampered_id_is_reported() {
        let mut store = InMemoryObjectStore::new();
        let real = leaf("real");
        let forged = TraversedRecord::new(
            ObjectId::from_digest(&[0xEE; 16]),
            real.body().clone(),
        );
        store.write(forged).unwrap();
        let report = StoreAuditor::new(ContentHasher::MD5).audit(&store).unwrap();
        assert!(matches!(report.violations[0], Violation::IdMismatch { .. }));
    }

    #[test]
    fn report_serializes_with_kind_tag() {
        let report = AuditReport {
            records_checked: 1,
            violations: vec![Violation::IdMismatch {
                id: ObjectId::from_digest(&[1]),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["violations"][0]["kind"], "id_mismatch");
    }
}
