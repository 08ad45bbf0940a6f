//! Merkle tree implementation for transaction verification
//!
//! Provides efficient verification of transaction inclusion in blocks
//! using a binary hash tree structure. Leaves carry transaction hashes,
//! internal nodes carry `H(left ++ right)` over the hex digests.

use super::hash::sha256_hex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Merkle proof errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Transaction {0} not found in merkle tree")]
    ProofNotFound(String),
    #[error("Malformed proof: {hashes} sibling hashes but {flags} side flags")]
    MalformedProof { hashes: usize, flags: usize },
}

/// Hash of an internal node from its two children
pub fn node_hash(left: &str, right: &str) -> String {
    let mut data = String::with_capacity(left.len() + right.len());
    data.push_str(left);
    data.push_str(right);
    sha256_hex(data.as_bytes())
}

/// A node in the merkle tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    pub hash: String,
    pub left: Option<Box<MerkleNode>>,
    pub right: Option<Box<MerkleNode>>,
}

impl MerkleNode {
    /// Create a leaf node
    pub fn leaf(hash: String) -> Self {
        Self {
            hash,
            left: None,
            right: None,
        }
    }

    /// Create an internal node from two children
    pub fn internal(left: MerkleNode, right: MerkleNode) -> Self {
        let hash = node_hash(&left.hash, &right.hash);

        Self {
            hash,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Leaves have no children
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Binary hash tree over an ordered batch of transaction hashes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    root: Option<MerkleNode>,
}

impl MerkleTree {
    /// Build the tree bottom-up. Odd levels duplicate their last node, so
    /// every internal node has exactly two children.
    pub fn new<S: AsRef<str>>(leaf_hashes: &[S]) -> Self {
        if leaf_hashes.is_empty() {
            return Self { root: None };
        }

        let mut nodes: Vec<MerkleNode> = leaf_hashes
            .iter()
            .map(|h| MerkleNode::leaf(h.as_ref().to_string()))
            .collect();

        // A single leaf is still paired with itself
        if nodes.len() == 1 {
            nodes.push(nodes[0].clone());
        }

        while nodes.len() > 1 {
            if nodes.len() % 2 != 0 {
                if let Some(last) = nodes.last().cloned() {
                    nodes.push(last);
                }
            }

            let mut next_level = Vec::with_capacity(nodes.len() / 2);
            let mut iter = nodes.into_iter();
            while let (Some(left), Some(right)) = (iter.next(), iter.next()) {
                next_level.push(MerkleNode::internal(left, right));
            }

            nodes = next_level;
        }

        Self {
            root: nodes.into_iter().next(),
        }
    }

    /// Root node, `None` for an empty batch
    pub fn root_node(&self) -> Option<&MerkleNode> {
        self.root.as_ref()
    }

    /// Root digest, empty string when the tree has no root
    pub fn root(&self) -> String {
        self.root
            .as_ref()
            .map(|node| node.hash.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Generate an inclusion proof for `target_hash`
    pub fn generate_proof(&self, target_hash: &str) -> Result<MerkleProof, MerkleError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| MerkleError::ProofNotFound(target_hash.to_string()))?;

        let mut proof = MerkleProof::new(target_hash.to_string());
        if Self::build_proof(root, target_hash, &mut proof) {
            Ok(proof)
        } else {
            Err(MerkleError::ProofNotFound(target_hash.to_string()))
        }
    }

    /// Depth-first search; siblings are recorded while unwinding a match,
    /// so index 0 ends up being the leaf's own sibling.
    fn build_proof(node: &MerkleNode, target_hash: &str, proof: &mut MerkleProof) -> bool {
        if node.is_leaf() {
            return node.hash == target_hash;
        }

        if let Some(left) = node.left.as_deref() {
            if Self::build_proof(left, target_hash, proof) {
                if let Some(right) = node.right.as_deref() {
                    proof.push_sibling(right.hash.clone(), false);
                }
                return true;
            }
        }

        if let Some(right) = node.right.as_deref() {
            if Self::build_proof(right, target_hash, proof) {
                if let Some(left) = node.left.as_deref() {
                    proof.push_sibling(left.hash.clone(), true);
                }
                return true;
            }
        }

        false
    }

    /// All leaf hashes, left to right (padding duplicates included)
    pub fn leaf_hashes(&self) -> Vec<String> {
        let mut hashes = Vec::new();
        if let Some(root) = &self.root {
            Self::collect_leaves(root, &mut hashes);
        }
        hashes
    }

    fn collect_leaves(node: &MerkleNode, hashes: &mut Vec<String>) {
        if node.is_leaf() {
            hashes.push(node.hash.clone());
            return;
        }
        if let Some(left) = node.left.as_deref() {
            Self::collect_leaves(left, hashes);
        }
        if let Some(right) = node.right.as_deref() {
            Self::collect_leaves(right, hashes);
        }
    }
}

/// Merkle proof for verifying transaction inclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Leaf hash being proven
    pub target_hash: String,
    /// Sibling hashes from leaf to root
    pub sibling_hashes: Vec<String>,
    /// Whether the sibling at the same position is the left child
    pub sibling_is_left: Vec<bool>,
}

impl MerkleProof {
    pub fn new(target_hash: String) -> Self {
        Self {
            target_hash,
            sibling_hashes: Vec::new(),
            sibling_is_left: Vec::new(),
        }
    }

    fn push_sibling(&mut self, hash: String, is_left: bool) {
        self.sibling_hashes.push(hash);
        self.sibling_is_left.push(is_left);
    }

    /// Number of steps from leaf to root
    pub fn len(&self) -> usize {
        self.sibling_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sibling_hashes.is_empty()
    }

    /// Both sequences must describe the same path
    pub fn check_shape(&self) -> Result<(), MerkleError> {
        if self.sibling_hashes.len() != self.sibling_is_left.len() {
            return Err(MerkleError::MalformedProof {
                hashes: self.sibling_hashes.len(),
                flags: self.sibling_is_left.len(),
            });
        }
        Ok(())
    }

    /// Fold the path and compare with `expected_root`. Malformed proofs
    /// verify as false.
    pub fn verify(&self, expected_root: &str) -> bool {
        if self.check_shape().is_err() {
            return false;
        }

        let computed = self
            .sibling_hashes
            .iter()
            .zip(&self.sibling_is_left)
            .fold(self.target_hash.clone(), |current, (sibling, is_left)| {
                if *is_left {
                    node_hash(sibling, &current)
                } else {
                    node_hash(&current, sibling)
                }
            });

        computed == expected_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| sha256_hex(format!("tx{}", i).as_bytes()))
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::new::<String>(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), "");
        assert_eq!(
            tree.generate_proof("anything"),
            Err(MerkleError::ProofNotFound("anything".to_string()))
        );
    }

    #[test]
    fn test_single_leaf_pairs_with_itself() {
        let hashes = leaves(1);
        let tree = MerkleTree::new(&hashes);
        assert_eq!(tree.root(), node_hash(&hashes[0], &hashes[0]));
    }

    #[test]
    fn test_merkle_root_two() {
        let hashes = leaves(2);
        let tree = MerkleTree::new(&hashes);
        assert_eq!(tree.root(), node_hash(&hashes[0], &hashes[1]));
    }

    #[test]
    fn test_merkle_root_odd() {
        let hashes = leaves(3);
        let tree = MerkleTree::new(&hashes);

        let left = node_hash(&hashes[0], &hashes[1]);
        let right = node_hash(&hashes[2], &hashes[2]);
        assert_eq!(tree.root(), node_hash(&left, &right));
    }

    #[test]
    fn test_odd_inner_level_is_padded() {
        // 6 leaves -> 3 parents -> padded to 4
        let hashes = leaves(6);
        let tree = MerkleTree::new(&hashes);

        let p0 = node_hash(&hashes[0], &hashes[1]);
        let p1 = node_hash(&hashes[2], &hashes[3]);
        let p2 = node_hash(&hashes[4], &hashes[5]);
        let expected = node_hash(&node_hash(&p0, &p1), &node_hash(&p2, &p2));
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_internal_nodes_have_two_children() {
        fn check(node: &MerkleNode) {
            if node.is_leaf() {
                return;
            }
            let left = node.left.as_deref().expect("left child");
            let right = node.right.as_deref().expect("right child");
            assert_eq!(node.hash, node_hash(&left.hash, &right.hash));
            check(left);
            check(right);
        }

        for n in 1..=9 {
            let tree = MerkleTree::new(&leaves(n));
            check(tree.root_node().expect("root"));
        }
    }

    #[test]
    fn test_proof_for_every_leaf() {
        for n in 1..=17 {
            let hashes = leaves(n);
            let tree = MerkleTree::new(&hashes);
            let root = tree.root();

            for hash in &hashes {
                let proof = tree.generate_proof(hash).unwrap();
                assert_eq!(&proof.target_hash, hash);
                assert!(proof.verify(&root), "leaf {} of {} failed", hash, n);
            }
        }
    }

    #[test]
    fn test_proof_order_starts_at_leaf() {
        let hashes = leaves(4);
        let tree = MerkleTree::new(&hashes);
        let proof = tree.generate_proof(&hashes[2]).unwrap();

        assert_eq!(proof.len(), 2);
        assert_eq!(proof.sibling_hashes[0], hashes[3]);
        assert!(!proof.sibling_is_left[0]);
        assert_eq!(proof.sibling_hashes[1], node_hash(&hashes[0], &hashes[1]));
        assert!(proof.sibling_is_left[1]);
    }

    #[test]
    fn test_proof_not_found() {
        let tree = MerkleTree::new(&leaves(5));
        let missing = sha256_hex(b"missing");
        assert_eq!(
            tree.generate_proof(&missing),
            Err(MerkleError::ProofNotFound(missing.clone()))
        );
    }

    #[test]
    fn test_proof_rejects_wrong_root_and_target() {
        let hashes = leaves(4);
        let tree = MerkleTree::new(&hashes);
        let mut proof = tree.generate_proof(&hashes[1]).unwrap();

        assert!(!proof.verify(&sha256_hex(b"other root")));

        proof.target_hash = hashes[0].clone();
        assert!(!proof.verify(&tree.root()));
    }

    #[test]
    fn test_malformed_proof_fails_closed() {
        let hashes = leaves(4);
        let tree = MerkleTree::new(&hashes);
        let mut proof = tree.generate_proof(&hashes[0]).unwrap();
        proof.sibling_is_left.pop();

        assert_eq!(
            proof.check_shape(),
            Err(MerkleError::MalformedProof { hashes: 2, flags: 1 })
        );
        assert!(!proof.verify(&tree.root()));
    }

    #[test]
    fn test_leaf_hashes_include_padding() {
        let hashes = leaves(3);
        let tree = MerkleTree::new(&hashes);
        let collected = tree.leaf_hashes();
        assert_eq!(collected.len(), 4);
        assert_eq!(&collected[..3], &hashes[..]);
        assert_eq!(collected[3], hashes[2]);
    }
}
