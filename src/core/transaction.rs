//! Transaction handling for the ledger
//!
//! An account-model transfer `from -> to` carrying an amount and a fee.
//! The content hash is computed once at construction and is the
//! transaction's identity in pools, blocks and merkle trees.

use crate::crypto::digest_json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Sentinel sender for mining rewards. It has no backing funds: every mined
/// block mints the reward out of nothing.
pub const NETWORK_ADDRESS: &str = "network";

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("Invalid transaction: {0}")]
    InvalidFields(String),
    #[error("Invalid multi-sig transaction: {0}")]
    InvalidMultiSig(String),
    #[error("Invalid time-lock transaction: {0}")]
    InvalidTimeLock(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Transaction already signed by {0}")]
    DuplicateSigner(String),
    #[error("Signer {0} not authorized for this multi-sig transaction")]
    UnauthorizedSigner(String),
}

impl TransactionError {
    /// Whether a signature was turned away (structure, duplicate or authorization)
    pub fn is_signature_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::DuplicateSigner(_) | Self::UnauthorizedSigner(_)
        )
    }
}

/// Field checks shared by every transaction kind
pub fn validate_fields(from: &str, to: &str, amount: f64, fee: f64) -> Result<(), TransactionError> {
    if from.is_empty() || to.is_empty() {
        return Err(TransactionError::InvalidFields(
            "missing from/to address".to_string(),
        ));
    }

    if !amount.is_finite() || amount <= 0.0 {
        return Err(TransactionError::InvalidFields(
            "amount must be positive".to_string(),
        ));
    }

    if !fee.is_finite() || fee < 0.0 {
        return Err(TransactionError::InvalidFields(
            "fee cannot be negative".to_string(),
        ));
    }

    Ok(())
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Serialize)]
struct TransactionDigest<'a> {
    from: &'a str,
    to: &'a str,
    amount: f64,
    fee: f64,
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount transferred to the recipient
    pub amount: f64,
    /// Fee paid by the sender on top of the amount
    pub fee: f64,
    /// Content hash over from/to/amount/fee
    pub hash: String,
}

impl Transaction {
    /// Create a new transaction and hash it
    pub fn new(from: &str, to: &str, amount: f64, fee: f64) -> Self {
        let mut tx = Self {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            fee,
            hash: String::new(),
        };
        tx.hash = tx.calculate_hash();
        tx
    }

    /// Create a mining reward transaction
    pub fn reward(recipient: &str, amount: f64) -> Self {
        Self::new(NETWORK_ADDRESS, recipient, amount, 0.0)
    }

    /// Recompute the content hash from the current field values
    pub fn calculate_hash(&self) -> String {
        digest_json(&TransactionDigest {
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            fee: self.fee,
        })
    }

    /// Whether the stored hash still matches the fields
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Structural validation (addresses, amount, fee)
    pub fn validate(&self) -> Result<(), TransactionError> {
        validate_fields(&self.from, &self.to, self.amount, self.fee)
    }

    pub fn is_reward(&self) -> bool {
        self.from == NETWORK_ADDRESS
    }

    /// Apply this transaction to a running balance of `address`. The sender
    /// debit is added before the receiver credit, each as its own step, the
    /// same way the store's balance index accumulates them.
    pub fn apply_to_balance(&self, address: &str, balance: f64) -> f64 {
        let mut balance = balance;
        if self.from == address {
            balance += -self.amount - self.fee;
        }
        if self.to == address {
            balance += self.amount;
        }
        balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_hash() {
        let tx = Transaction::new("alice", "bob", 10.0, 0.1);
        assert_eq!(tx.hash.len(), 64);
        assert_eq!(tx.hash, tx.calculate_hash());
        assert!(tx.verify_hash());

        let same = Transaction::new("alice", "bob", 10.0, 0.1);
        assert_eq!(tx.hash, same.hash);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = Transaction::new("alice", "bob", 10.0, 0.1);
        let variants = [
            Transaction::new("carol", "bob", 10.0, 0.1),
            Transaction::new("alice", "carol", 10.0, 0.1),
            Transaction::new("alice", "bob", 10.5, 0.1),
            Transaction::new("alice", "bob", 10.0, 0.2),
        ];
        for other in &variants {
            assert_ne!(base.hash, other.hash);
        }
    }

    #[test]
    fn test_tampering_breaks_hash() {
        let mut tx = Transaction::new("alice", "bob", 10.0, 0.1);
        tx.amount = 1000.0;
        assert!(!tx.verify_hash());
    }

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("miner", 10.0);
        assert!(tx.is_reward());
        assert_eq!(tx.from, NETWORK_ADDRESS);
        assert_eq!(tx.fee, 0.0);
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_field_validation() {
        assert!(Transaction::new("a", "b", 1.0, 0.0).validate().is_ok());

        let cases = [
            Transaction::new("", "b", 1.0, 0.0),
            Transaction::new("a", "", 1.0, 0.0),
            Transaction::new("a", "b", 0.0, 0.0),
            Transaction::new("a", "b", -1.0, 0.0),
            Transaction::new("a", "b", f64::NAN, 0.0),
            Transaction::new("a", "b", 1.0, -0.1),
        ];
        for tx in &cases {
            assert!(matches!(
                tx.validate(),
                Err(TransactionError::InvalidFields(_))
            ));
        }
    }

    #[test]
    fn test_apply_to_balance() {
        let tx = Transaction::new("alice", "bob", 10.0, 0.5);
        assert_eq!(tx.apply_to_balance("alice", 0.0), -10.5);
        assert_eq!(tx.apply_to_balance("bob", 1.0), 11.0);
        assert_eq!(tx.apply_to_balance("carol", 3.0), 3.0);

        let to_self = Transaction::new("alice", "alice", 10.0, 0.5);
        assert_eq!(to_self.apply_to_balance("alice", 0.0), -0.5);
    }

    #[test]
    fn test_self_transfer_debits_before_crediting() {
        let tx = Transaction::new("bob", "bob", 0.07, 0.01);
        let start = 2.33;

        let stepwise = (start + (-0.07 - 0.01)) + 0.07;
        assert_eq!(tx.apply_to_balance("bob", start), stepwise);
    }

    #[test]
    fn test_signature_rejection_kinds() {
        assert!(TransactionError::InvalidSignature.is_signature_rejection());
        assert!(TransactionError::DuplicateSigner("x".into()).is_signature_rejection());
        assert!(TransactionError::UnauthorizedSigner("x".into()).is_signature_rejection());
        assert!(!TransactionError::InvalidFields("x".into()).is_signature_rejection());
    }
}
