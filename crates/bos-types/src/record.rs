//! Traversed records: the resolved, content-addressed form of a Base Object.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TypeError;
use crate::object::ObjectId;
use crate::value::{Primitive, Value};
use crate::wire::{
    APPLICATION_ID_KEY, CLOSURE_KEY, ID_KEY, REFERENCED_ID_KEY, REFERENCE_TYPE,
    TOTAL_CHILDREN_COUNT_KEY, TYPE_KEY,
};

/// Map from detached descendant id to its minimal relative depth.
///
/// Entries are kept sorted by id so the rendered closure is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Closure(BTreeMap<ObjectId, usize>);

impl Closure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` at `depth`, keeping the smaller depth on conflict.
    /// Returns `true` if the entry was added or lowered.
    pub fn insert_min(&mut self, id: ObjectId, depth: usize) -> bool {
        match self.0.get_mut(&id) {
            Some(existing) if *existing <= depth => false,
            Some(existing) => {
                *existing = depth;
                true
            }
            None => {
                self.0.insert(id, depth);
                true
            }
        }
    }

    pub fn get(&self, id: &ObjectId) -> Option<usize> {
        self.0.get(id).copied()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, usize)> {
        self.0.iter().map(|(id, depth)| (id, *depth))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.0.keys()
    }
}

impl FromIterator<(ObjectId, usize)> for Closure {
    fn from_iter<I: IntoIterator<Item = (ObjectId, usize)>>(iter: I) -> Self {
        let mut closure = Self::new();
        for (id, depth) in iter {
            closure.insert_min(id, depth);
        }
        closure
    }
}

/// Placeholder substituted wherever a child was detached.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    pub referenced_id: ObjectId,
}

impl Reference {
    pub fn new(referenced_id: ObjectId) -> Self {
        Self { referenced_id }
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(REFERENCED_ID_KEY, &self.referenced_id)?;
        map.serialize_entry(TYPE_KEY, REFERENCE_TYPE)?;
        map.end()
    }
}

/// A property value after traversal.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Primitive(Primitive),
    Array(Vec<Resolved>),
    /// A child record inlined into its parent.
    Record(Box<TraversedRecord>),
    /// A detached child.
    Reference(Reference),
    /// An opaque mapping, copied through untouched.
    Opaque(IndexMap<String, Value>),
}

impl Resolved {
    /// Visit every reference reachable through arrays and inlined records.
    pub fn for_each_reference<'a>(&'a self, f: &mut impl FnMut(&'a Reference)) {
        match self {
            Self::Reference(r) => f(r),
            Self::Array(items) => items.iter().for_each(|item| item.for_each_reference(f)),
            Self::Record(record) => record.body.for_each_reference(f),
            Self::Primitive(_) | Self::Opaque(_) => {}
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TraversedRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Resolved]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Primitive(p) => p.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(record) => record.serialize(serializer),
            Self::Reference(reference) => reference.serialize(serializer),
            Self::Opaque(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Everything in a traversed record except its id.
///
/// This is the hash input: serializing a `RecordBody` yields the canonical
/// bytes the record's id is computed over. `totalChildrenCount` is derived
/// from the closure, so the two can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordBody {
    speckle_type: String,
    properties: IndexMap<String, Resolved>,
    closure: Closure,
}

impl RecordBody {
    pub fn new(
        speckle_type: impl Into<String>,
        properties: IndexMap<String, Resolved>,
        closure: Closure,
    ) -> Self {
        Self {
            speckle_type: speckle_type.into(),
            properties,
            closure,
        }
    }

    pub fn speckle_type(&self) -> &str {
        &self.speckle_type
    }

    pub fn properties(&self) -> &IndexMap<String, Resolved> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Resolved> {
        self.properties.get(key)
    }

    pub fn closure(&self) -> &Closure {
        &self.closure
    }

    pub fn total_children_count(&self) -> usize {
        self.closure.len()
    }

    /// The `applicationId` property, if present and scalar.
    pub fn application_id(&self) -> Option<String> {
        match self.properties.get(APPLICATION_ID_KEY)? {
            Resolved::Primitive(Primitive::String(s)) => Some(s.clone()),
            Resolved::Primitive(Primitive::Int(i)) => Some(i.to_string()),
            Resolved::Primitive(Primitive::UInt(u)) => Some(u.to_string()),
            _ => None,
        }
    }

    /// Canonical bytes: the JSON rendering without an `id` field.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    fn for_each_reference<'a>(&'a self, f: &mut impl FnMut(&'a Reference)) {
        for value in self.properties.values() {
            value.for_each_reference(f);
        }
    }

    fn serialize_fields<M: SerializeMap>(&self, map: &mut M, id: Option<&ObjectId>) -> Result<(), M::Error> {
        map.serialize_entry(TYPE_KEY, &self.speckle_type)?;
        if let Some(id) = id {
            map.serialize_entry(ID_KEY, id)?;
        }
        for (key, value) in &self.properties {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(TOTAL_CHILDREN_COUNT_KEY, &self.total_children_count())?;
        if !self.closure.is_empty() {
            map.serialize_entry(CLOSURE_KEY, &self.closure)?;
        }
        Ok(())
    }
}

impl Serialize for RecordBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_fields(&mut map, None)?;
        map.end()
    }
}

/// A resolved Base Object together with its content-addressed id.
#[derive(Clone, Debug, PartialEq)]
pub struct TraversedRecord {
    id: ObjectId,
    body: RecordBody,
}

impl TraversedRecord {
    /// Seal a body with the id computed over it.
    pub fn new(id: ObjectId, body: RecordBody) -> Self {
        Self { id, body }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn body(&self) -> &RecordBody {
        &self.body
    }

    pub fn speckle_type(&self) -> &str {
        self.body.speckle_type()
    }

    pub fn get(&self, key: &str) -> Option<&Resolved> {
        self.body.get(key)
    }

    pub fn closure(&self) -> &Closure {
        self.body.closure()
    }

    pub fn total_children_count(&self) -> usize {
        self.body.total_children_count()
    }

    /// Ids of all references inside this record, including those nested in
    /// inlined child records, in traversal order (duplicates kept).
    pub fn referenced_ids(&self) -> Vec<&ObjectId> {
        let mut ids = Vec::new();
        self.body.for_each_reference(&mut |r| ids.push(&r.referenced_id));
        ids
    }

    /// The wire form: one JSON object.
    pub fn to_json_string(&self) -> Result<String, TypeError> {
        serde_json::to_string(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

impl Serialize for TraversedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.body.serialize_fields(&mut map, Some(&self.id))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_digest(&[byte; 16])
    }

    fn body_with(closure: Closure) -> RecordBody {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Resolved::Primitive(Primitive::String("wall".into())));
        props.insert(
            "child".to_string(),
            Resolved::Reference(Reference::new(oid(2))),
        );
        RecordBody::new("Base", props, closure)
    }

    #[test]
    fn closure_keeps_minimal_depth() {
        let mut closure = Closure::new();
        assert!(closure.insert_min(oid(1), 3));
        assert!(closure.insert_min(oid(1), 1));
        assert!(!closure.insert_min(oid(1), 2));
        assert_eq!(closure.get(&oid(1)), Some(1));
        assert_eq!(closure.len(), 1);
    }

    #[test]
    fn wire_form_field_order() {
        let closure: Closure = [(oid(2), 1)].into_iter().collect();
        let record = TraversedRecord::new(oid(9), body_with(closure));
        let text = record.to_json_string().unwrap();
        let keys: Vec<usize> = ["speckle_type", "\"id\"", "name", "child", "totalChildrenCount", "__closure"]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{text}");

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["child"], json!({"referencedId": oid(2).as_str(), "speckle_type": "reference"}));
        assert_eq!(json["totalChildrenCount"], json!(1));
        assert_eq!(json["__closure"][oid(2).as_str()], json!(1));
    }

    #[test]
    fn canonical_bytes_exclude_id() {
        let body = body_with(Closure::new());
        let bytes = body.canonical_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("__closure").is_none());
        assert_eq!(json["totalChildrenCount"], json!(0));
    }

    #[test]
    fn referenced_ids_reach_into_inline_records() {
        let inner = TraversedRecord::new(oid(5), body_with(Closure::new()));
        let mut props = IndexMap::new();
        props.insert(
            "items".to_string(),
            Resolved::Array(vec![
                Resolved::Reference(Reference::new(oid(3))),
                Resolved::Record(Box::new(inner)),
            ]),
        );
        let outer = TraversedRecord::new(oid(6), RecordBody::new("Base", props, Closure::new()));
        let ids: Vec<&ObjectId> = outer.referenced_ids();
        assert_eq!(ids, vec![&oid(3), &oid(2)]);
    }

    #[test]
    fn total_children_count_follows_closure() {
        let closure: Closure = [(oid(1), 1), (oid(2), 2), (oid(1), 3)].into_iter().collect();
        let body = body_with(closure);
        assert_eq!(body.total_children_count(), 2);
        assert_eq!(body.closure().get(&oid(1)), Some(1));
    }
}
