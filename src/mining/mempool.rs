//! Transaction pool (mempool) for pending transactions
//!
//! Holds unconfirmed transactions until they are committed to a block.
//! Every operation takes the pool's reader/writer lock, so a pool can be
//! shared between threads by reference.

use crate::core::transaction::{Transaction, TransactionError};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Pool errors, shared by the standard and enhanced pools
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Transaction pool is full ({0} transactions)")]
    PoolFull(usize),
    #[error("Transaction {0} already in pool")]
    DuplicateTransaction(String),
    #[error("Transaction {0} not found in pool")]
    TransactionNotFound(String),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Debug, Default)]
struct PoolInner {
    /// Transactions indexed by hash
    entries: HashMap<String, Transaction>,
    /// Transaction hashes in order of arrival
    by_time: Vec<String>,
}

// =============================================================================
// Transaction Pool
// =============================================================================

/// Pool of pending standard transactions
#[derive(Debug)]
pub struct TransactionPool {
    inner: RwLock<PoolInner>,
    max_size: usize,
}

impl TransactionPool {
    /// Create a pool holding at most `max_size` transactions
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(PoolInner::default()),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Add a transaction. Checked in order: capacity, fields, duplicate.
    pub fn add(&self, tx: Transaction) -> Result<(), PoolError> {
        let mut inner = self.inner.write();

        if inner.entries.len() >= self.max_size {
            return Err(PoolError::PoolFull(self.max_size));
        }

        tx.validate()?;

        if inner.entries.contains_key(&tx.hash) {
            return Err(PoolError::DuplicateTransaction(tx.hash));
        }

        let hash = tx.hash.clone();
        inner.entries.insert(hash.clone(), tx);
        inner.by_time.push(hash);

        log::debug!("Added transaction to pool ({} pending)", inner.entries.len());
        Ok(())
    }

    /// Pending transactions in arrival order
    pub fn transactions(&self) -> Vec<Transaction> {
        let inner = self.inner.read();
        inner
            .by_time
            .iter()
            .filter_map(|hash| inner.entries.get(hash))
            .cloned()
            .collect()
    }

    /// Remove transactions by hash. Absent hashes are ignored.
    pub fn remove(&self, hashes: &[String]) {
        let mut inner = self.inner.write();
        let mut removed = false;

        for hash in hashes {
            removed |= inner.entries.remove(hash).is_some();
        }

        if removed {
            let PoolInner { entries, by_time } = &mut *inner;
            by_time.retain(|hash| entries.contains_key(hash));
        }
    }

    pub fn get(&self, hash: &str) -> Option<Transaction> {
        self.inner.read().entries.get(hash).cloned()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.inner.read().entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Sum of pending fees
    pub fn total_fees(&self) -> f64 {
        self.inner.read().entries.values().map(|tx| tx.fee).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_and_order() {
        let pool = TransactionPool::new(10);
        let first = Transaction::new("a", "b", 1.0, 0.1);
        let second = Transaction::new("c", "d", 2.0, 0.2);

        pool.add(first.clone()).unwrap();
        pool.add(second.clone()).unwrap();

        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&first.hash));
        assert_eq!(pool.get(&second.hash), Some(second.clone()));
        assert_eq!(pool.transactions(), vec![first, second]);
        assert!((pool.total_fees() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_rejected() {
        let pool = TransactionPool::new(10);
        let tx = Transaction::new("a", "b", 1.0, 0.0);
        pool.add(tx.clone()).unwrap();

        assert_eq!(
            pool.add(tx.clone()),
            Err(PoolError::DuplicateTransaction(tx.hash))
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let pool = TransactionPool::new(10);
        let result = pool.add(Transaction::new("a", "", 1.0, 0.0));
        assert!(matches!(
            result,
            Err(PoolError::Transaction(TransactionError::InvalidFields(_)))
        ));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_full_checked_first() {
        let pool = TransactionPool::new(1);
        pool.add(Transaction::new("a", "b", 1.0, 0.0)).unwrap();

        // Even an invalid transaction reports the capacity error
        assert_eq!(
            pool.add(Transaction::new("", "", -1.0, 0.0)),
            Err(PoolError::PoolFull(1))
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let pool = TransactionPool::new(10);
        let a = Transaction::new("a", "b", 1.0, 0.0);
        let b = Transaction::new("b", "c", 1.0, 0.0);
        pool.add(a.clone()).unwrap();
        pool.add(b.clone()).unwrap();

        pool.remove(&[a.hash.clone(), "missing".to_string()]);
        pool.remove(&[a.hash.clone()]);

        assert_eq!(pool.transactions(), vec![b]);
    }

    #[test]
    fn test_concurrent_adds() {
        let pool = Arc::new(TransactionPool::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..50 {
                        let from = format!("sender-{}-{}", t, i);
                        pool.add(Transaction::new(&from, "sink", 1.0, 0.0)).unwrap();
                        let _ = pool.transactions();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.len(), 400);
        assert_eq!(pool.transactions().len(), 400);
    }
}
