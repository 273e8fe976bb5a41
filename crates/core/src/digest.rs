use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::CoreError;

/// Digest algorithm used to fingerprint archived content.
///
/// The algorithm is captured on each record at ingestion time so later
/// verification runs always hash with the same function, even if the
/// archive-wide default changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// `SHA-256`, lower-case hex encoded.
    #[default]
    Sha256,
    /// `SHA-512`, lower-case hex encoded.
    Sha512,
}

impl DigestAlgorithm {
    /// Start an incremental hash computation.
    pub fn hasher(self) -> ContentHasher {
        match self {
            Self::Sha256 => ContentHasher::Sha256(Sha256::new()),
            Self::Sha512 => ContentHasher::Sha512(Sha512::new()),
        }
    }

    /// Hash a complete buffer and return the hex digest.
    pub fn digest(self, bytes: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(bytes);
        hasher.finalize_hex()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Sha512 => f.write_str("sha512"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(CoreError::InvalidDigest(s.to_owned())),
        }
    }
}

/// Incremental hasher for streamed content.
pub enum ContentHasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl ContentHasher {
    /// Feed another chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(chunk),
            Self::Sha512(h) => h.update(chunk),
        }
    }

    /// Consume the hasher and return the lower-case hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}
