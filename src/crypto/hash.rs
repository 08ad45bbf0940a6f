//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 based content digests used for transaction hashes,
//! block hashes and merkle tree nodes, plus the proof-of-work target check.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hashes the canonical JSON encoding of `value`
///
/// Field order follows the struct declaration, so callers hash a borrowed
/// digest struct rather than the full record.
pub fn digest_json<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    sha256_hex(&bytes)
}

/// Checks if a hex hash meets the difficulty target
/// The hash must start with `difficulty` `'0'` characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Pair<'a> {
        left: &'a str,
        right: u64,
    }

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_digest_json_is_deterministic() {
        let a = digest_json(&Pair { left: "a", right: 1 });
        let b = digest_json(&Pair { left: "a", right: 1 });
        let c = digest_json(&Pair { left: "a", right: 2 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("000abc", 3));
        assert!(meets_difficulty("000abc", 0));
        assert!(!meets_difficulty("000abc", 4));
        assert!(!meets_difficulty("00", 3));
        assert!(!meets_difficulty("", 1));
    }
}
