//! Foundation types for the base object serializer.
//!
//! This crate provides the input value model and the resolved output types
//! used throughout the workspace. Every other `bos` crate depends on
//! `bos-types`.
//!
//! # Key Types
//!
//! - [`Value`] -- Closed variant over all decomposable input
//! - [`BaseObject`] -- Type-tagged, insertion-ordered property map
//! - [`PropertyKey`] -- Detach / dynamic-detach / chunk annotations parsed from a key
//! - [`ObjectId`] -- Content-addressed record identifier (hex digest)
//! - [`TraversedRecord`] -- Resolved record with id, children count and closure
//! - [`Closure`] -- Detached descendant ids with their minimal relative depth

pub mod error;
pub mod key;
pub mod object;
pub mod record;
pub mod value;
pub mod wire;

pub use error::TypeError;
pub use key::{ChunkAnnotation, PropertyKey};
pub use object::ObjectId;
pub use record::{Closure, RecordBody, Reference, Resolved, TraversedRecord};
pub use value::{BaseObject, HostHandle, ObjectReference, Primitive, Value};
