//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 content hashing
//! - Proof-of-work target checks
//! - Merkle tree construction and inclusion proofs

pub mod hash;
pub mod merkle;

pub use hash::{digest_json, meets_difficulty, sha256, sha256_hex};
pub use merkle::{node_hash, MerkleError, MerkleNode, MerkleProof, MerkleTree};
