use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier of a traversed record.
///
/// An `ObjectId` is the lowercase hex encoding of a digest over the record's
/// canonical content. The digest width depends on the hash algorithm in use
/// (16 bytes for MD5, 32 for BLAKE3); the rest of the system treats the id as
/// an opaque string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Build an `ObjectId` from raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse from a hex string. Uppercase input is normalized to lowercase.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TypeError::InvalidLength { actual: 0 });
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Hex-encoded string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }

    /// Number of digest bytes behind this id.
    pub fn digest_len(&self) -> usize {
        self.0.len() / 2
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_digest_is_lower_hex() {
        let id = ObjectId::from_digest(&[0xAB, 0xCD, 0x01]);
        assert_eq!(id.as_str(), "abcd01");
        assert_eq!(id.digest_len(), 3);
    }

    #[test]
    fn from_hex_normalizes_case() {
        let id = ObjectId::from_hex("ABCDEF00").unwrap();
        assert_eq!(id.as_str(), "abcdef00");
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            ObjectId::from_hex("not-hex"),
            Err(TypeError::InvalidHex(_))
        ));
        assert!(matches!(
            ObjectId::from_hex("abc"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(
            ObjectId::from_hex(""),
            Err(TypeError::InvalidLength { actual: 0 })
        );
    }

    #[test]
    fn short_hex_is_8_chars() {
        let id = ObjectId::from_digest(&[7u8; 16]);
        assert_eq!(id.short_hex().len(), 8);
        assert_eq!(format!("{id:?}"), "ObjectId(07070707)");
    }

    #[test]
    fn display_is_full_hex() {
        let id = ObjectId::from_digest(&[1u8; 16]);
        assert_eq!(format!("{id}").len(), 32);
    }

    #[test]
    fn serde_uses_plain_string() {
        let id = ObjectId::from_digest(&[0x10; 4]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"10101010\"");
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
        assert!(serde_json::from_str::<ObjectId>("\"zz\"").is_err());
    }

    #[test]
    fn ordering_follows_hex() {
        let a = ObjectId::from_digest(&[0x00]);
        let b = ObjectId::from_digest(&[0x01]);
        assert!(a < b);
    }
}
