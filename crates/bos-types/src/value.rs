//! The decomposable input model.
//!
//! A [`Value`] is a closed tagged variant over everything a host integration
//! can hand to the serializer: primitives, arrays, type-tagged
//! [`BaseObject`]s, opaque mappings, host tuples carrying host-object handles,
//! and pre-resolved [`ObjectReference`]s.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::key::PropertyKey;
use crate::object::ObjectId;
use crate::record::Closure;
use crate::wire::{
    APPLICATION_ID_KEY, CLOSURE_KEY, REFERENCED_ID_KEY, REFERENCE_TYPE, TYPE_KEY,
};

/// Scalar leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Primitive {
    /// Returns `true` for [`Primitive::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Non-finite floats have no JSON representation.
    pub fn is_representable(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Short name of the primitive kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Opaque handle to a host-application object.
///
/// Handles are only used for reference-cache bookkeeping. They are never
/// hashed and never written to the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostHandle(String);

impl HostHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record that has already been resolved elsewhere (an earlier pass, or the
/// reference cache), together with its own closure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub referenced_id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Closure::is_empty")]
    pub closure: Closure,
}

impl ObjectReference {
    pub fn new(referenced_id: ObjectId) -> Self {
        Self {
            referenced_id,
            application_id: None,
            closure: Closure::new(),
        }
    }

    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    pub fn with_closure(mut self, closure: Closure) -> Self {
        self.closure = closure;
        self
    }
}

/// A type-tagged, insertion-ordered mapping from spelled keys to values.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseObject {
    speckle_type: String,
    properties: IndexMap<String, Value>,
}

impl BaseObject {
    /// Create an empty object with the given type tag.
    pub fn new(speckle_type: impl Into<String>) -> Self {
        Self {
            speckle_type: speckle_type.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn speckle_type(&self) -> &str {
        &self.speckle_type
    }

    /// Insert a property under its spelled key. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert under `@name`.
    pub fn with_detached(self, name: &str, value: impl Into<Value>) -> Self {
        self.with(PropertyKey::spell(name, false, None), value)
    }

    /// Insert under `@(size)name`, or `@()name` for the default size.
    pub fn with_chunked(
        self,
        name: &str,
        size: Option<std::num::NonZeroUsize>,
        value: impl Into<Value>,
    ) -> Self {
        self.with(PropertyKey::spell(name, false, Some(size)), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Remove a property, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The host application's identifier, if present and scalar.
    pub fn application_id(&self) -> Option<String> {
        match self.properties.get(APPLICATION_ID_KEY)? {
            Value::Primitive(Primitive::String(s)) => Some(s.clone()),
            Value::Primitive(Primitive::Int(i)) => Some(i.to_string()),
            Value::Primitive(Primitive::UInt(u)) => Some(u.to_string()),
            _ => None,
        }
    }
}

impl Serialize for BaseObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + 1))?;
        map.serialize_entry(TYPE_KEY, &self.speckle_type)?;
        for (key, value) in &self.properties {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Any value the serializer can be asked to decompose.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    Array(Vec<Value>),
    Object(BaseObject),
    /// Mapping without a type tag. Passed through, never decomposed.
    Map(IndexMap<String, Value>),
    /// A converted value plus the host objects it came from.
    HostTuple(Box<Value>, Vec<HostHandle>),
    /// An already-resolved record.
    Reference(ObjectReference),
}

impl Value {
    pub const NULL: Value = Value::Primitive(Primitive::Null);

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(Primitive::Null))
    }

    /// Whether this value is, or wraps, a type-tagged object.
    pub fn is_base(&self) -> bool {
        match self {
            Self::Object(_) => true,
            Self::HostTuple(inner, _) => inner.is_base(),
            _ => false,
        }
    }

    /// Short name of the value kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.kind(),
            Self::Array(_) => "array",
            Self::Object(_) => "base object",
            Self::Map(_) => "map",
            Self::HostTuple(..) => "host tuple",
            Self::Reference(_) => "reference",
        }
    }

    /// Wrap a converted value together with its host handles.
    pub fn host_tuple(value: impl Into<Value>, handles: Vec<HostHandle>) -> Self {
        Self::HostTuple(Box::new(value.into()), handles)
    }

    /// Convert parsed JSON into the value model.
    ///
    /// Objects with a string `speckle_type` become [`BaseObject`]s, except
    /// `"reference"` objects carrying a valid `referencedId`, which become
    /// pre-resolved [`ObjectReference`]s. Every other object is an opaque map.
    pub fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::NULL,
            Json::Bool(b) => Self::Primitive(Primitive::Bool(b)),
            Json::Number(n) => Self::Primitive(if let Some(i) = n.as_i64() {
                Primitive::Int(i)
            } else if let Some(u) = n.as_u64() {
                Primitive::UInt(u)
            } else {
                Primitive::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            Json::String(s) => Self::Primitive(Primitive::String(s)),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Json::Object(mut map) => {
                let speckle_type = match map.get(TYPE_KEY) {
                    Some(Json::String(t)) => Some(t.clone()),
                    _ => None,
                };
                match speckle_type {
                    Some(t) if t == REFERENCE_TYPE => match reference_from_json(&map) {
                        Some(reference) => Self::Reference(reference),
                        None => Self::Map(json_entries(map)),
                    },
                    Some(t) => {
                        map.shift_remove(TYPE_KEY);
                        let mut base = BaseObject::new(t);
                        base.properties = json_entries(map);
                        Self::Object(base)
                    }
                    None => Self::Map(json_entries(map)),
                }
            }
        }
    }
}

fn json_entries(map: serde_json::Map<String, serde_json::Value>) -> IndexMap<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k, Value::from_json(v)))
        .collect()
}

fn reference_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Option<ObjectReference> {
    let id = ObjectId::from_hex(map.get(REFERENCED_ID_KEY)?.as_str()?).ok()?;
    let mut reference = ObjectReference::new(id);
    if let Some(app_id) = map.get(APPLICATION_ID_KEY).and_then(|v| v.as_str()) {
        reference = reference.with_application_id(app_id);
    }
    if let Some(closure) = map.get(CLOSURE_KEY) {
        reference.closure = serde_json::from_value(closure.clone()).ok()?;
    }
    Some(reference)
}

impl Serialize for Value {
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
            Self::Object(base) => base.serialize(serializer),
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            // Handles are bookkeeping only.
            Self::HostTuple(inner, _) => inner.serialize(serializer),
            Self::Reference(reference) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(REFERENCED_ID_KEY, &reference.referenced_id)?;
                map.serialize_entry(TYPE_KEY, REFERENCE_TYPE)?;
                map.end()
            }
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Primitive(Primitive::$variant(v.into()))
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Self::Primitive(p)
    }
}

impl From<BaseObject> for Value {
    fn from(base: BaseObject) -> Self {
        Self::Object(base)
    }
}

impl From<ObjectReference> for Value {
    fn from(reference: ObjectReference) -> Self {
        Self::Reference(reference)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_object_keeps_insertion_order() {
        let base = BaseObject::new("Objects.Geometry.Line")
            .with("z", 1)
            .with("a", 2)
            .with("m", 3);
        let keys: Vec<&str> = base.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn builder_spells_annotations() {
        let base = BaseObject::new("Base")
            .with_detached("child", BaseObject::new("Base"))
            .with_chunked("faces", std::num::NonZeroUsize::new(10), vec![1, 2, 3]);
        assert!(base.get("@child").is_some());
        assert!(base.get("@(10)faces").is_some());
    }

    #[test]
    fn application_id_from_scalars() {
        let base = BaseObject::new("Base").with("applicationId", 42);
        assert_eq!(base.application_id(), Some("42".to_string()));
        let base = BaseObject::new("Base").with("applicationId", "abc");
        assert_eq!(base.application_id(), Some("abc".to_string()));
        let base = BaseObject::new("Base").with("applicationId", Value::NULL);
        assert_eq!(base.application_id(), None);
    }

    #[test]
    fn from_json_classifies_objects() {
        let value = Value::from_json(json!({
            "speckle_type": "Objects.Geometry.Mesh",
            "units": "m",
            "@(100)vertices": [0.0, 1.5, 2],
            "renderMaterial": {"name": "glass"},
            "@instance": {"speckle_type": "reference", "referencedId": "00ff"}
        }));
        let Value::Object(mesh) = value else {
            panic!("expected base object");
        };
        assert_eq!(mesh.speckle_type(), "Objects.Geometry.Mesh");
        assert!(mesh.get("speckle_type").is_none());
        assert!(matches!(mesh.get("renderMaterial"), Some(Value::Map(_))));
        match mesh.get("@instance") {
            Some(Value::Reference(r)) => assert_eq!(r.referenced_id.as_str(), "00ff"),
            other => panic!("expected reference, got {other:?}"),
        }
        match mesh.get("@(100)vertices") {
            Some(Value::Array(items)) => {
                assert_eq!(items[0], Value::Primitive(Primitive::Float(0.0)));
                assert_eq!(items[2], Value::Primitive(Primitive::Int(2)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn reference_with_bad_id_stays_opaque() {
        let value = Value::from_json(json!({"speckle_type": "reference", "referencedId": "xyz"}));
        assert!(matches!(value, Value::Map(_)));
    }

    #[test]
    fn reference_from_json_reads_closure() {
        let value = Value::from_json(json!({
            "speckle_type": "reference",
            "referencedId": "aa",
            "applicationId": "wall-1",
            "__closure": {"bb": 1, "cc": 2}
        }));
        let Value::Reference(reference) = value else {
            panic!("expected reference");
        };
        assert_eq!(reference.application_id.as_deref(), Some("wall-1"));
        assert_eq!(reference.closure.len(), 2);
    }

    #[test]
    fn serialize_renders_plain_json() {
        let base = BaseObject::new("Base")
            .with("name", "wall")
            .with("tags", Value::host_tuple(vec!["a", "b"], vec![HostHandle::new("h1")]));
        let json = serde_json::to_value(Value::Object(base)).unwrap();
        assert_eq!(
            json,
            json!({"speckle_type": "Base", "name": "wall", "tags": ["a", "b"]})
        );
    }

    #[test]
    fn is_base_sees_through_host_tuples() {
        let tuple = Value::host_tuple(BaseObject::new("Base"), vec![]);
        assert!(tuple.is_base());
        assert!(!Value::host_tuple(1, vec![]).is_base());
        assert!(!Value::from(vec![1, 2]).is_base());
    }

    #[test]
    fn non_finite_float_is_not_representable() {
        assert!(!Primitive::Float(f64::NAN).is_representable());
        assert!(!Primitive::Float(f64::INFINITY).is_representable());
        assert!(Primitive::Float(1.0).is_representable());
    }
}
