//! Enhanced transaction pool
//!
//! Keeps standard and enhanced transactions in two maps behind one
//! reader/writer lock. Enhanced transactions become eligible for a block
//! once they are fully signed and, for time-locks, mature.

use crate::core::enhanced::{EnhancedTransaction, TransactionSignature, TransactionType};
use crate::core::transaction::Transaction;
use crate::mining::mempool::PoolError;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct EnhancedInner {
    standard: HashMap<String, Transaction>,
    standard_order: Vec<String>,
    enhanced: HashMap<String, EnhancedTransaction>,
    enhanced_order: Vec<String>,
}

impl EnhancedInner {
    fn len(&self) -> usize {
        self.standard.len() + self.enhanced.len()
    }

    fn standard_in_order(&self) -> impl Iterator<Item = &Transaction> {
        self.standard_order
            .iter()
            .filter_map(move |hash| self.standard.get(hash))
    }

    fn enhanced_in_order(&self) -> impl Iterator<Item = &EnhancedTransaction> {
        self.enhanced_order
            .iter()
            .filter_map(move |hash| self.enhanced.get(hash))
    }
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub standard_transactions: usize,
    pub enhanced_transactions: usize,
    pub total_transactions: usize,
    pub multisig_transactions: usize,
    pub timelock_transactions: usize,
    pub contract_transactions: usize,
    pub enhanced_standard_transactions: usize,
}

/// Pool for standard and enhanced transactions
#[derive(Debug)]
pub struct EnhancedPool {
    inner: RwLock<EnhancedInner>,
    /// Capacity shared by both maps
    max_size: usize,
}

impl EnhancedPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(EnhancedInner::default()),
            max_size,
        }
    }

    /// Add a standard transaction
    pub fn add_standard(&self, tx: Transaction) -> Result<(), PoolError> {
        let mut inner = self.inner.write();

        if inner.len() >= self.max_size {
            return Err(PoolError::PoolFull(self.max_size));
        }

        tx.validate()?;

        if inner.standard.contains_key(&tx.hash) {
            return Err(PoolError::DuplicateTransaction(tx.hash));
        }

        inner.standard_order.push(tx.hash.clone());
        inner.standard.insert(tx.hash.clone(), tx);
        Ok(())
    }

    /// Add an enhanced transaction, validated against the current time
    pub fn add_enhanced(&self, tx: EnhancedTransaction) -> Result<(), PoolError> {
        self.add_enhanced_at(tx, Utc::now().timestamp())
    }

    /// Add an enhanced transaction, validating time-locks against `now`.
    /// Checked in order: capacity, fields, duplicate, kind-specific rules.
    pub fn add_enhanced_at(&self, tx: EnhancedTransaction, now: i64) -> Result<(), PoolError> {
        let mut inner = self.inner.write();

        if inner.len() >= self.max_size {
            return Err(PoolError::PoolFull(self.max_size));
        }

        tx.to_standard().validate()?;

        if inner.enhanced.contains_key(&tx.hash) {
            return Err(PoolError::DuplicateTransaction(tx.hash));
        }

        tx.validate_at(now)?;

        log::debug!("Added {} transaction {} to pool", tx.tx_type, tx.hash);
        inner.enhanced_order.push(tx.hash.clone());
        inner.enhanced.insert(tx.hash.clone(), tx);
        Ok(())
    }

    /// Transactions eligible for the next block at the current time
    pub fn executable_transactions(&self) -> (Vec<Transaction>, Vec<EnhancedTransaction>) {
        self.executable_transactions_at(Utc::now().timestamp())
    }

    /// Every standard transaction plus the enhanced ones executable at `now`
    pub fn executable_transactions_at(
        &self,
        now: i64,
    ) -> (Vec<Transaction>, Vec<EnhancedTransaction>) {
        let inner = self.inner.read();

        let standard = inner.standard_in_order().cloned().collect();
        let enhanced = inner
            .enhanced_in_order()
            .filter(|tx| tx.is_executable_at(now))
            .cloned()
            .collect();

        (standard, enhanced)
    }

    /// Executable transactions flattened to standard form
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let (mut standard, enhanced) = self.executable_transactions();
        standard.extend(enhanced.iter().map(EnhancedTransaction::to_standard));
        standard
    }

    /// Remove standard transactions by hash. Absent hashes are ignored.
    pub fn remove_standard(&self, hashes: &[String]) {
        let mut inner = self.inner.write();
        for hash in hashes {
            inner.standard.remove(hash);
        }
        let EnhancedInner {
            standard,
            standard_order,
            ..
        } = &mut *inner;
        standard_order.retain(|hash| standard.contains_key(hash));
    }

    /// Remove enhanced transactions by hash. Absent hashes are ignored.
    pub fn remove_enhanced(&self, hashes: &[String]) {
        let mut inner = self.inner.write();
        for hash in hashes {
            inner.enhanced.remove(hash);
        }
        let EnhancedInner {
            enhanced,
            enhanced_order,
            ..
        } = &mut *inner;
        enhanced_order.retain(|hash| enhanced.contains_key(hash));
    }

    /// Attach a signature to a pooled enhanced transaction
    pub fn add_signature(
        &self,
        tx_hash: &str,
        signature: TransactionSignature,
    ) -> Result<(), PoolError> {
        let mut inner = self.inner.write();
        let tx = inner
            .enhanced
            .get_mut(tx_hash)
            .ok_or_else(|| PoolError::TransactionNotFound(tx_hash.to_string()))?;

        tx.add_signature(signature)?;
        Ok(())
    }

    pub fn get_enhanced(&self, tx_hash: &str) -> Option<EnhancedTransaction> {
        self.inner.read().enhanced.get(tx_hash).cloned()
    }

    /// Multi-sig transactions still collecting signatures
    pub fn pending_multisig_transactions(&self) -> Vec<EnhancedTransaction> {
        self.inner
            .read()
            .enhanced_in_order()
            .filter(|tx| tx.tx_type == TransactionType::MultiSig && !tx.is_fully_signed())
            .cloned()
            .collect()
    }

    /// Time-locked transactions split into (ready, pending) at the current time
    pub fn timelock_transactions(&self) -> (Vec<EnhancedTransaction>, Vec<EnhancedTransaction>) {
        self.timelock_transactions_at(Utc::now().timestamp())
    }

    pub fn timelock_transactions_at(
        &self,
        now: i64,
    ) -> (Vec<EnhancedTransaction>, Vec<EnhancedTransaction>) {
        self.inner
            .read()
            .enhanced_in_order()
            .filter(|tx| tx.tx_type == TransactionType::TimeLock)
            .cloned()
            .partition(|tx| tx.is_executable_at(now))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count transactions per kind
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.read();
        let mut stats = PoolStats {
            standard_transactions: inner.standard.len(),
            enhanced_transactions: inner.enhanced.len(),
            total_transactions: inner.len(),
            ..PoolStats::default()
        };

        for tx in inner.enhanced.values() {
            match tx.tx_type {
                TransactionType::MultiSig => stats.multisig_transactions += 1,
                TransactionType::TimeLock => stats.timelock_transactions += 1,
                TransactionType::Contract => stats.contract_transactions += 1,
                TransactionType::Standard => stats.enhanced_standard_transactions += 1,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::TransactionError;

    const NOW: i64 = 1_700_000_000;

    fn signers() -> Vec<String> {
        vec!["alice".into(), "bob".into(), "carol".into()]
    }

    fn sig(signer: &str) -> TransactionSignature {
        TransactionSignature::new(&format!("pk-{}", signer), &format!("sig-{}", signer), signer)
    }

    #[test]
    fn test_multisig_becomes_executable_at_threshold() {
        let pool = EnhancedPool::new(10);
        let tx = EnhancedTransaction::multisig("vault", "dest", 5.0, 0.1, 2, signers());
        let hash = tx.hash.clone();
        pool.add_enhanced(tx).unwrap();

        pool.add_signature(&hash, sig("alice")).unwrap();
        assert!(pool.executable_transactions().1.is_empty());
        assert_eq!(pool.pending_multisig_transactions().len(), 1);

        pool.add_signature(&hash, sig("bob")).unwrap();
        let (_, enhanced) = pool.executable_transactions();
        assert_eq!(enhanced.len(), 1);
        assert_eq!(enhanced[0].hash, hash);
        assert!(pool.pending_multisig_transactions().is_empty());
    }

    #[test]
    fn test_signature_rejections_leave_pool_unchanged() {
        let pool = EnhancedPool::new(10);
        let tx = EnhancedTransaction::multisig("vault", "dest", 5.0, 0.1, 2, signers());
        let hash = tx.hash.clone();
        pool.add_enhanced(tx).unwrap();
        pool.add_signature(&hash, sig("alice")).unwrap();

        let cases = [
            (sig("alice"), TransactionError::DuplicateSigner("alice".into())),
            (sig("mallory"), TransactionError::UnauthorizedSigner("mallory".into())),
            (
                TransactionSignature::new("pk", "", "bob"),
                TransactionError::InvalidSignature,
            ),
        ];
        for (signature, expected) in cases {
            assert_eq!(
                pool.add_signature(&hash, signature),
                Err(PoolError::Transaction(expected))
            );
        }

        assert_eq!(pool.get_enhanced(&hash).map(|tx| tx.signature_count()), Some(1));
        assert_eq!(
            pool.add_signature("missing", sig("bob")),
            Err(PoolError::TransactionNotFound("missing".into()))
        );
    }

    #[test]
    fn test_timelock_matures() {
        let pool = EnhancedPool::new(10);
        let mut tx = EnhancedTransaction::timelock("a", "b", 1.0, 0.0, NOW + 3600);
        tx.add_signature(sig("a")).unwrap();
        pool.add_enhanced_at(tx, NOW).unwrap();

        assert!(pool.executable_transactions_at(NOW).1.is_empty());
        let (ready, pending) = pool.timelock_transactions_at(NOW);
        assert_eq!((ready.len(), pending.len()), (0, 1));

        assert_eq!(pool.executable_transactions_at(NOW + 3600).1.len(), 1);
        let (ready, pending) = pool.timelock_transactions_at(NOW + 3601);
        assert_eq!((ready.len(), pending.len()), (1, 0));
    }

    #[test]
    fn test_type_specific_rejections() {
        let pool = EnhancedPool::new(10);

        let bad_multisig = EnhancedTransaction::multisig("a", "b", 1.0, 0.0, 3, vec!["a".into()]);
        assert!(matches!(
            pool.add_enhanced(bad_multisig),
            Err(PoolError::Transaction(TransactionError::InvalidMultiSig(_)))
        ));

        let expired = EnhancedTransaction::timelock("a", "b", 1.0, 0.0, NOW - 1);
        assert!(matches!(
            pool.add_enhanced_at(expired, NOW),
            Err(PoolError::Transaction(TransactionError::InvalidTimeLock(_)))
        ));

        let bad_fields = EnhancedTransaction::standard("a", "b", 0.0, 0.0);
        assert!(matches!(
            pool.add_enhanced(bad_fields),
            Err(PoolError::Transaction(TransactionError::InvalidFields(_)))
        ));

        assert!(pool.is_empty());
    }

    #[test]
    fn test_duplicates_and_capacity() {
        let pool = EnhancedPool::new(2);
        let tx = EnhancedTransaction::standard("a", "b", 1.0, 0.0);
        pool.add_enhanced(tx.clone()).unwrap();
        assert_eq!(
            pool.add_enhanced(tx.clone()),
            Err(PoolError::DuplicateTransaction(tx.hash.clone()))
        );

        pool.add_standard(Transaction::new("a", "b", 1.0, 0.0)).unwrap();
        assert_eq!(
            pool.add_standard(Transaction::new("c", "d", 1.0, 0.0)),
            Err(PoolError::PoolFull(2))
        );
    }

    #[test]
    fn test_all_transactions_and_removal() {
        let pool = EnhancedPool::new(10);
        let plain = Transaction::new("a", "b", 1.0, 0.0);
        let mut signed = EnhancedTransaction::contract("a", "c", 2.0, 0.0, "PUSH 1", "{}");
        signed.add_signature(sig("a")).unwrap();
        let unsigned = EnhancedTransaction::standard("a", "d", 3.0, 0.0);

        pool.add_standard(plain.clone()).unwrap();
        pool.add_enhanced(signed.clone()).unwrap();
        pool.add_enhanced(unsigned.clone()).unwrap();

        let all = pool.all_transactions();
        assert_eq!(all, vec![plain.clone(), signed.to_standard()]);

        pool.remove_standard(&[plain.hash.clone()]);
        pool.remove_enhanced(&[signed.hash.clone(), "missing".into()]);
        assert_eq!(pool.len(), 1);
        assert!(pool.get_enhanced(&unsigned.hash).is_some());
    }

    #[test]
    fn test_stats() {
        let pool = EnhancedPool::new(10);
        pool.add_standard(Transaction::new("a", "b", 1.0, 0.0)).unwrap();
        pool.add_enhanced(EnhancedTransaction::multisig("a", "b", 1.0, 0.0, 1, signers()))
            .unwrap();
        pool.add_enhanced_at(EnhancedTransaction::timelock("a", "b", 1.0, 0.0, NOW + 10), NOW)
            .unwrap();
        pool.add_enhanced(EnhancedTransaction::contract("a", "b", 1.0, 0.0, "", ""))
            .unwrap();
        pool.add_enhanced(EnhancedTransaction::standard("x", "y", 1.0, 0.0))
            .unwrap();

        let stats = pool.stats();
        assert_eq!(stats.standard_transactions, 1);
        assert_eq!(stats.enhanced_transactions, 4);
        assert_eq!(stats.total_transactions, 5);
        assert_eq!(stats.multisig_transactions, 1);
        assert_eq!(stats.timelock_transactions, 1);
        assert_eq!(stats.contract_transactions, 1);
        assert_eq!(stats.enhanced_standard_transactions, 1);
    }
}
