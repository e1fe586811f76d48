//! Cryptographic utilities for API-key handling
//!
//! Keys are opaque secrets: only their SHA-256 hash is ever stored, and
//! lookups/comparisons must not leak timing information.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// A freshly generated key. The `raw` value is shown to the caller exactly
/// once; only `hash` is persisted.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub raw: String,
    pub hash: String,
}

/// Hash a key for storage.
///
/// SHA-256, hex-encoded. The original key cannot be recovered from the hash.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new key as `<prefix>_<base64url(32 random bytes)>`.
///
/// Customer keys use prefix `gwa`, session tokens `wat`.
pub fn generate_api_key(prefix: &str) -> GeneratedKey {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    let raw = format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(buf));
    let hash = hash_api_key(&raw);
    GeneratedKey { raw, hash }
}

/// Constant-time byte slice comparison.
///
/// # Security
/// - Returns `false` immediately if lengths differ (length is not secret)
/// - Compares all bytes even after finding a difference
/// - Uses XOR accumulator to prevent branch prediction attacks
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let result = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));

    result == 0
}

/// Constant-time string comparison.
#[inline]
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq_equal() {
        assert!(constant_time_eq(b"hello world", b"hello world"));
    }

    #[test]
    fn test_constant_time_eq_different() {
        assert!(!constant_time_eq(b"hello world", b"hello worle"));
    }

    #[test]
    fn test_constant_time_eq_different_lengths() {
        assert!(!constant_time_eq(b"hello", b"hello world"));
    }

    #[test]
    fn test_hash_is_stable() {
        let h1 = hash_api_key("gwa_sometoken");
        let h2 = hash_api_key("gwa_sometoken");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 = 32 bytes = 64 hex chars

        let h3 = hash_api_key("gwa_othertoken");
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key("gwa");
        assert!(key.raw.starts_with("gwa_"));
        assert_eq!(key.hash, hash_api_key(&key.raw));

        // 32 random bytes base64url-encoded without padding is 43 chars
        assert_eq!(key.raw.len(), "gwa_".len() + 43);
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = generate_api_key("wat");
        let b = generate_api_key("wat");
        assert_ne!(a.raw, b.raw);
    }
}
