//! Content hashes stamped on generated units.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of a unit's text. `tag` is the leading four bytes, used inline
/// in generated code; `digest` keeps the full hash in hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnitHash {
    pub digest: String,
    pub tag: u32,
}

impl UnitHash {
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        let tag = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        Self {
            digest: hex::encode(digest),
            tag,
        }
    }
}
