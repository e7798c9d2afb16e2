//! Property-key annotations.
//!
//! Detachment and chunking are declared in the spelling of a property key:
//!
//! - `@name` marks the value for detachment.
//! - `@@name` marks it for dynamic detachment (same effect, but the decision
//!   was made from the content rather than declared by the type).
//! - `@(N)name` / `@@(N)name` additionally request chunking of an array value
//!   into pieces of at most `N` elements; `@()name` uses the default size.
//!
//! [`PropertyKey::parse`] turns a spelled key into its stripped name plus
//! three orthogonal flags.

use std::num::NonZeroUsize;

use crate::wire::{ID_KEY, TOTAL_CHILDREN_COUNT_KEY, TYPE_KEY};

/// Chunk-size annotation found on a property key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkAnnotation {
    /// `@()name`: use the configured default size.
    Default,
    /// `@(N)name` with a positive `N`.
    Size(NonZeroUsize),
    /// Anything else between the parentheses. Falls back to the default size.
    Malformed(String),
}

impl ChunkAnnotation {
    /// The effective chunk size for this annotation.
    pub fn resolve(&self, default: NonZeroUsize) -> NonZeroUsize {
        match self {
            Self::Size(size) => *size,
            Self::Default | Self::Malformed(_) => default,
        }
    }

    /// Returns `true` if the annotation could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// A property key split into its name and annotation flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyKey<'a> {
    /// Key with all annotations stripped.
    pub name: &'a str,
    /// Declared detachment (`@`).
    pub detach: bool,
    /// Content-dependent detachment (`@@`).
    pub dynamic_detach: bool,
    /// Chunk-size annotation, if any.
    pub chunk: Option<ChunkAnnotation>,
}

impl<'a> PropertyKey<'a> {
    /// Parse a spelled property key.
    pub fn parse(raw: &'a str) -> Self {
        let (rest, detach, dynamic_detach) = match raw.strip_prefix("@@") {
            Some(rest) if !rest.is_empty() => (rest, false, true),
            _ => match raw.strip_prefix('@') {
                Some(rest) => (rest, true, false),
                None => (raw, false, false),
            },
        };

        let mut key = Self {
            name: rest,
            detach,
            dynamic_detach,
            chunk: None,
        };
        if !(detach || dynamic_detach) {
            return key;
        }

        if let Some(inner_and_name) = rest.strip_prefix('(') {
            if let Some(close) = inner_and_name.find(')') {
                let inner = &inner_and_name[..close];
                key.name = &inner_and_name[close + 1..];
                key.chunk = Some(if inner.is_empty() {
                    ChunkAnnotation::Default
                } else {
                    match inner.parse::<usize>().ok().and_then(NonZeroUsize::new) {
                        Some(size) => ChunkAnnotation::Size(size),
                        None => ChunkAnnotation::Malformed(inner.to_string()),
                    }
                });
            }
        }
        key
    }

    /// Whether the value should be materialized as an independent record.
    pub fn is_detached(&self) -> bool {
        self.detach || self.dynamic_detach
    }

    /// Control keys that never take part in decomposition: leading-underscore
    /// keys, `id`, the type tag, and the computed children count.
    pub fn is_reserved(raw: &str) -> bool {
        raw.starts_with('_')
            || raw == ID_KEY
            || raw == TYPE_KEY
            || raw == TOTAL_CHILDREN_COUNT_KEY
    }

    /// Spell a key from a name and annotations. Inverse of [`parse`](Self::parse).
    pub fn spell(name: &str, dynamic: bool, chunk: Option<Option<NonZeroUsize>>) -> String {
        let prefix = if dynamic { "@@" } else { "@" };
        match chunk {
            None => format!("{prefix}{name}"),
            Some(None) => format!("{prefix}(){name}"),
            Some(Some(size)) => format!("{prefix}({size}){name}"),
        }
    }
}
