//! Base object serializer.
//!
//! Decomposes a nested, type-tagged object graph into a flat store of
//! content-addressed records ready for upload.
//!
//! # Pipeline
//!
//! 1. **Traversal**: post-order, depth-first over the root's properties.
//!    Keys spelled `@name` / `@@name` detach their value into its own record
//!    and leave a reference behind; `@(N)name` additionally splits a plain
//!    array into chunk records of at most `N` elements.
//! 2. **Closure tracking**: every detached id is folded into each open
//!    ancestor frame with its minimal relative depth.
//! 3. **Hashing**: a record's id is the digest of its canonical JSON, closure
//!    and children count included, id excluded.
//! 4. **Batching**: stored records are packed into byte-bounded JSON arrays.
//!
//! # Example
//!
//! ```
//! use bos_serializer::{BaseObjectSerializer, SerializerConfig};
//! use bos_types::BaseObject;
//!
//! let mut serializer = BaseObjectSerializer::new(SerializerConfig::default()).unwrap();
//! let wall = BaseObject::new("Objects.BuiltElements.Wall").with("height", 3.0);
//! let root = BaseObject::new("Base").with_detached("wall", wall);
//!
//! let id = serializer.serialize(&root).unwrap();
//! assert_eq!(serializer.total_children_count(&id), Some(1));
//! assert_eq!(serializer.payload(&id).unwrap().batches.len(), 1);
//! ```

pub mod cache;
pub mod chunk;
pub mod closure;
pub mod config;
pub mod error;
pub mod serializer;
mod traverse;

pub use cache::{InMemoryReferenceCache, ReferenceCache};
pub use closure::{ClosureTracker, LineageToken};
pub use config::SerializerConfig;
pub use error::{SerializeError, SerializeResult};
pub use serializer::{serialize_to_payload, BaseObjectSerializer, SendPayload};
