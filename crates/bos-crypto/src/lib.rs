//! Content hashing for the base object serializer.
//!
//! Record ids are digests over a record's canonical JSON rendering with the
//! `id` field left out. MD5 is the default for parity with the existing
//! protocol; BLAKE3 can be selected where stronger guarantees are wanted.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HashAlgorithm, HasherError};
