//! Content hashing for node identity

use std::fmt;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

/// Identity key of a graph node, derived purely from its semantic payload.
///
/// Two nodes with the same payload get the same hash no matter where in the
/// tree they occur; the digest width makes collisions an accepted trade-off
/// (colliding payloads are treated as the same logical node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct ContentHash(pub u64);

impl ContentHash {
    /// Synthetic root identity, used as the start of the `MemberBV` edge.
    pub const ZERO: ContentHash = ContentHash(0);

    /// Parse the 16-char hex form written to the output tables.
    pub fn from_hex(s: &str) -> Result<ContentHash, ParseIntError> {
        u64::from_str_radix(s, 16).map(ContentHash)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Streaming hasher over the ordered field values that define a node's meaning.
///
/// Order-sensitive by construction. Callers must never feed assigned
/// identifiers, parent pointers, or positions.
pub struct NodeHasher {
    inner: Xxh64,
}

impl NodeHasher {
    pub fn new() -> Self {
        NodeHasher { inner: Xxh64::new(0) }
    }

    pub fn write(&mut self, field: &str) {
        self.inner.update(field.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finish(&self) -> ContentHash {
        ContentHash(self.inner.digest())
    }
}

impl Default for NodeHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash an ordered list of string fields in one shot.
pub fn hash_fields(fields: &[&str]) -> ContentHash {
    let mut hasher = NodeHasher::new();
    for field in fields {
        hasher.write(field);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let a = hash_fields(&["x = 1", "SET_VAR"]);
        let b = hash_fields(&["x = 1", "SET_VAR"]);
        assert_eq!(a, b);
    }

    #[test]
    fn hashing_is_order_sensitive() {
        let a = hash_fields(&["x", "y"]);
        let b = hash_fields(&["y", "x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut hasher = NodeHasher::new();
        hasher.write("mov eax, 1");
        hasher.write("ret");
        assert_eq!(hasher.finish(), hash_fields(&["mov eax, 1", "ret"]));
    }

    #[test]
    fn hex_display_round_trips() {
        let hash = hash_fields(&["payload"]);
        let text = hash.to_string();
        assert_eq!(text.len(), 16);
        assert_eq!(ContentHash::from_hex(&text).unwrap(), hash);
        assert_eq!(ContentHash::ZERO.to_string(), "0000000000000000");
    }
}
