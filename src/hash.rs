//! Signature hashing for protocol identity

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 content hash of a protocol signature
///
/// The hash is the sole equality key for duplicate detection: two
/// declarations with the same hash are signature-identical regardless of
/// where they live or what they are called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureHash(String);

impl SignatureHash {
    /// Compute a hash from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(format!("{:x}", digest))
    }

    /// Compute a hash from a canonical string encoding
    pub fn from_canonical(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened prefix for human-readable reports
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SignatureHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_determinism() {
        let canonical = "run/1|stop/0";
        let a = SignatureHash::from_canonical(canonical);
        let b = SignatureHash::from_canonical(canonical);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_sensitivity() {
        let a = SignatureHash::from_canonical("run/1|stop/0");
        let b = SignatureHash::from_canonical("run/1|stop/0|pause/0");
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let h = SignatureHash::from_canonical("x");
        assert_eq!(h.short().len(), 12);
    }
}
