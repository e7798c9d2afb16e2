//! Splitting of oversized arrays into data chunks.

use std::num::NonZeroUsize;

use bos_types::wire::{DATA_CHUNK_TYPE, DATA_KEY};
use bos_types::{BaseObject, Value};

/// Whether an array holds only plain data: primitives, opaque maps and
/// arrays of those. Arrays holding objects, host tuples or references are
/// never chunked.
pub fn is_chunkable(items: &[Value]) -> bool {
    items.iter().all(|item| match item {
        Value::Primitive(_) | Value::Map(_) => true,
        Value::Array(inner) => is_chunkable(inner),
        Value::Object(_) | Value::HostTuple(..) | Value::Reference(_) => false,
    })
}

/// Split `items` into ordered chunk objects of at most `size` elements.
///
/// An empty array yields no chunks.
pub fn split(items: &[Value], size: NonZeroUsize) -> Vec<BaseObject> {
    items
        .chunks(size.get())
        .map(|data| BaseObject::new(DATA_CHUNK_TYPE).with(DATA_KEY, Value::Array(data.to_vec())))
        .collect()
}
