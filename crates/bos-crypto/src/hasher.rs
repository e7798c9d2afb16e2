use bos_types::{ObjectId, RecordBody, TraversedRecord};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Digest used to derive record ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 128-bit MD5 over the raw canonical bytes. Matches the existing wire protocol.
    #[default]
    Md5,
    /// 256-bit BLAKE3, domain-separated.
    Blake3,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "blake3" => Ok(Self::Blake3),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Deterministic content hasher for traversed records.
///
/// The id of a record is a pure function of its canonical bytes: identical
/// content always produces the same id, which is what lets structurally
/// identical subgraphs collapse to one stored record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// MD5 hasher (protocol default).
    pub const MD5: Self = Self {
        algorithm: HashAlgorithm::Md5,
    };
    /// BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    /// Domain tag prepended to BLAKE3 input.
    const BLAKE3_DOMAIN: &'static str = "bos-record-v1";

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Hash raw bytes.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        match self.algorithm {
            HashAlgorithm::Md5 => {
                let mut hasher = Md5::new();
                hasher.update(data);
                ObjectId::from_digest(&hasher.finalize())
            }
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(Self::BLAKE3_DOMAIN.as_bytes());
                hasher.update(b":");
                hasher.update(data);
                ObjectId::from_digest(hasher.finalize().as_bytes())
            }
        }
    }

    /// Compute the id of a record body over its canonical bytes.
    pub fn hash_record(&self, body: &RecordBody) -> Result<ObjectId, HasherError> {
        let data = body
            .canonical_bytes()
            .map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that a sealed record's id matches its content.
    pub fn verify_record(&self, record: &TraversedRecord) -> Result<bool, HasherError> {
        Ok(self.hash_record(record.body())? == *record.id())
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_types::{Closure, Primitive, Resolved};
    use indexmap::IndexMap;

    fn body(name: &str) -> RecordBody {
        let mut props = IndexMap::new();
        props.insert("name".to_string(), Resolved::Primitive(Primitive::String(name.into())));
        RecordBody::new("Base", props, Closure::new())
    }

    #[test]
    fn md5_matches_known_vector() {
        let id = ContentHasher::MD5.hash(b"");
        assert_eq!(id.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
        let id = ContentHasher::MD5.hash(b"abc");
        assert_eq!(id.as_str(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn hash_is_deterministic() {
        let id1 = ContentHasher::MD5.hash_record(&body("wall")).unwrap();
        let id2 = ContentHasher::MD5.hash_record(&body("wall")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(id1.digest_len(), 16);
    }

    #[test]
    fn different_content_produces_different_ids() {
        let a = ContentHasher::MD5.hash_record(&body("wall")).unwrap();
        let b = ContentHasher::MD5.hash_record(&body("floor")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn record_id_is_md5_of_canonical_json() {
        let body = body("wall");
        let expected = ContentHasher::MD5.hash(br#"{"speckle_type":"Base","name":"wall","totalChildrenCount":0}"#);
        assert_eq!(ContentHasher::MD5.hash_record(&body).unwrap(), expected);
    }

    #[test]
    fn blake3_is_wider_and_distinct() {
        let md5 = ContentHasher::MD5.hash(b"data");
        let b3 = ContentHasher::BLAKE3.hash(b"data");
        assert_eq!(b3.digest_len(), 32);
        assert_ne!(md5.as_str(), &b3.as_str()[..32]);
        // Domain separation: not the bare BLAKE3 digest.
        assert_ne!(b3, ObjectId::from_digest(blake3::hash(b"data").as_bytes()));
    }

    #[test]
    fn verify_record_detects_tampering() {
        let hasher = ContentHasher::default();
        let id = hasher.hash_record(&body("wall")).unwrap();
        let good = TraversedRecord::new(id.clone(), body("wall"));
        let bad = TraversedRecord::new(id, body("roof"));
        assert!(hasher.verify_record(&good).unwrap());
        assert!(!hasher.verify_record(&bad).unwrap());
    }

    #[test]
    fn verify_raw_data() {
        let id = ContentHasher::BLAKE3.hash(b"original");
        assert!(ContentHasher::BLAKE3.verify(b"original", &id));
        assert!(!ContentHasher::BLAKE3.verify(b"tampered", &id));
    }

    #[test]
    fn algorithm_parses_and_displays() {
        assert_eq!("MD5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!(matches!(
            "sha1".parse::<HashAlgorithm>(),
            Err(HasherError::UnknownAlgorithm(_))
        ));
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
    }
}
