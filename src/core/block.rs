//! Block implementation for the ledger
//!
//! A block commits an ordered transaction batch through its merkle root and
//! is linked to its predecessor by `prev_hash`. The hash covers the header
//! fields only; the transactions are covered through the merkle root.

use crate::core::transaction::Transaction;
use crate::crypto::{digest_json, meets_difficulty, MerkleError, MerkleProof, MerkleTree};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Predecessor hash recorded by the genesis block
pub const GENESIS_PREV_HASH: &str = "0";

#[derive(Serialize)]
struct BlockDigest<'a> {
    index: u64,
    timestamp: i64,
    merkle_root: &'a str,
    prev_hash: &'a str,
    nonce: u64,
}

/// A block in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Block index/height, genesis is 0
    pub index: u64,
    /// Creation time (Unix seconds)
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    /// Hash of the previous block
    pub prev_hash: String,
    /// Block hash over index/timestamp/merkle_root/prev_hash/nonce
    pub hash: String,
    /// Proof-of-work nonce
    pub nonce: u64,
    /// Merkle root over the transaction hashes
    pub merkle_root: String,
    /// Tree built at construction; absent on deserialized blocks
    #[serde(skip)]
    merkle_tree: Option<MerkleTree>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.timestamp == other.timestamp
            && self.transactions == other.transactions
            && self.prev_hash == other.prev_hash
            && self.hash == other.hash
            && self.nonce == other.nonce
            && self.merkle_root == other.merkle_root
    }
}

impl Block {
    /// Create a new, unmined block
    pub fn new(index: u64, transactions: Vec<Transaction>, prev_hash: &str) -> Self {
        let tree = Self::build_tree(&transactions);

        let mut block = Self {
            index,
            timestamp: Utc::now().timestamp(),
            transactions,
            prev_hash: prev_hash.to_string(),
            hash: String::new(),
            nonce: 0,
            merkle_root: tree.root(),
            merkle_tree: Some(tree),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// The fixed genesis block. Its content is constant, so every store
    /// seeded with it agrees on the genesis hash.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: 0,
            transactions: Vec::new(),
            prev_hash: GENESIS_PREV_HASH.to_string(),
            hash: String::new(),
            nonce: 0,
            merkle_root: String::new(),
            merkle_tree: Some(MerkleTree::default()),
        };
        block.hash = block.calculate_hash();
        block
    }

    fn build_tree(transactions: &[Transaction]) -> MerkleTree {
        let hashes: Vec<&str> = transactions.iter().map(|tx| tx.hash.as_str()).collect();
        MerkleTree::new(&hashes)
    }

    /// Calculate the block hash from the header fields
    pub fn calculate_hash(&self) -> String {
        digest_json(&BlockDigest {
            index: self.index,
            timestamp: self.timestamp,
            merkle_root: &self.merkle_root,
            prev_hash: &self.prev_hash,
            nonce: self.nonce,
        })
    }

    /// Mine the block (find a valid nonce), returns the number of attempts
    pub fn mine(&mut self, difficulty: usize) -> u64 {
        let mut attempts = 0u64;
        self.nonce = 0;

        loop {
            self.hash = self.calculate_hash();
            attempts += 1;

            if meets_difficulty(&self.hash, difficulty) {
                return attempts;
            }

            self.nonce = self.nonce.wrapping_add(1);
        }
    }

    /// Verify the stored block hash
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Check if the proof of work is valid
    pub fn has_valid_pow(&self, difficulty: usize) -> bool {
        self.verify_hash() && meets_difficulty(&self.hash, difficulty)
    }

    /// Cached tree when present, otherwise rebuilt from the transactions
    pub fn merkle_tree(&self) -> Cow<'_, MerkleTree> {
        match &self.merkle_tree {
            Some(tree) => Cow::Borrowed(tree),
            None => Cow::Owned(Self::build_tree(&self.transactions)),
        }
    }

    /// Recompute the root from the current transactions and compare it with
    /// the stored root. Every transaction must still match its own hash.
    pub fn validate_transactions(&self) -> bool {
        if !self.transactions.iter().all(Transaction::verify_hash) {
            return false;
        }
        Self::build_tree(&self.transactions).root() == self.merkle_root
    }

    /// Inclusion proof for `tx_hash`
    pub fn generate_proof(&self, tx_hash: &str) -> Result<MerkleProof, MerkleError> {
        self.merkle_tree().generate_proof(tx_hash)
    }

    /// Verify a proof against the stored merkle root
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.verify(&self.merkle_root)
    }

    /// Find a committed transaction by hash
    pub fn find_transaction(&self, tx_hash: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.hash == tx_hash)
    }
}
