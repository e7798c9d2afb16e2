//! Content-addressed record storage for the base object serializer.
//!
//! Every detached record produced by a decomposition pass, plus the root, is
//! written here under its content hash. The store is append-only and
//! idempotent: writing identical content twice leaves a single entry.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- insertion-ordered map owned by one serializer
//!
//! # Design Rules
//!
//! 1. Records are immutable once written (content-addressing guarantees this).
//! 2. Iteration follows first-write order, which is the order batches are packed in.
//! 3. A completed store has no dangling references, except ids the caller
//!    short-circuited through an external cache ([`StoreAuditor`] checks this).

pub mod audit;
pub mod error;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use audit::{AuditReport, StoreAuditor, Violation};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
