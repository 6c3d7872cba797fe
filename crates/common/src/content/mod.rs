//! Content-addressed file storage.
//!
//! Every stored object is named by the xxh64 digest of its bytes, rendered
//! as 16 lowercase hex digits. On disk an object is a directory
//! `{root}/{uid}/` holding the payload under the basename of the uploaded
//! file name, plus a `NAME` sidecar with the uploaded name verbatim. The
//! sidecar is written last, so an object without one does not exist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

mod path;
mod store;

pub use path::{ensure_descendant, normalize, storage_file_name};
pub use store::{ContentStore, INCOMING_DIR, NAME_FILE};

/// Seed used for every content hash.
pub const UID_SEED: u64 = 0;

/// Number of hex digits in a rendered [`Uid`].
pub const UID_HEX_LEN: usize = 16;

/// Identifier of a stored object: the xxh64 hash of its full contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(u64);

impl Uid {
    /// Hash `bytes` into their content identifier.
    pub fn from_content(bytes: &[u8]) -> Self {
        Self(xxh64(bytes, UID_SEED))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Uid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Uid {
    type Err = ContentError;

    /// Accepts exactly 16 hex digits, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != UID_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ContentError::InvalidUid(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ContentError::InvalidUid(s.to_string()))
    }
}

impl Serialize for Uid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute the identifier of `bytes`.
pub fn content_uid(bytes: &[u8]) -> Uid {
    Uid::from_content(bytes)
}

/// Metadata about a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub uid: Uid,
    /// File name exactly as supplied by the uploader
    pub original_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("path escapes the storage root: {0}")]
    PathEscape(String),
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
    #[error("invalid uid: {0:?}")]
    InvalidUid(String),
    #[error("content not found: {0}")]
    NotFound(Uid),
    #[error("upload stream error: {0}")]
    Stream(Box<dyn std::error::Error + Send + Sync>),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentError {
    /// True for errors caused by the client's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ContentError::PathEscape(_)
                | ContentError::InvalidFileName(_)
                | ContentError::InvalidUid(_)
                | ContentError::Stream(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_is_pure_function_of_content() {
        let a = content_uid(b"helloworld");
        let b = content_uid(b"helloworld");
        assert_eq!(a, b);
        assert_ne!(a, content_uid(b"helloworle"));
        assert_eq!(a.as_u64(), xxh64(b"helloworld", 0));
    }

    #[test]
    fn test_uid_display_is_16_lowercase_hex() {
        assert_eq!(Uid::from(0xab).to_string(), "00000000000000ab");
        assert_eq!(Uid::from(u64::MAX).to_string(), "ffffffffffffffff");

        let rendered = content_uid(b"anything").to_string();
        assert_eq!(rendered.len(), UID_HEX_LEN);
        assert!(rendered
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn test_uid_parse() {
        let uid: Uid = "00000000000000ab".parse().unwrap();
        assert_eq!(uid.as_u64(), 0xab);
        assert_eq!("FFFFFFFFFFFFFFFF".parse::<Uid>().unwrap().as_u64(), u64::MAX);

        for bad in ["", "ab", "00000000000000abc", "000000000000000g", "+000000000000000"] {
            assert!(
                matches!(bad.parse::<Uid>(), Err(ContentError::InvalidUid(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_uid_serde_as_string() {
        let uid = Uid::from(0x1234);
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"0000000000001234\"");
        assert_eq!(serde_json::from_str::<Uid>(&json).unwrap(), uid);
        assert!(serde_json::from_str::<Uid>("\"xyz\"").is_err());
    }
}
