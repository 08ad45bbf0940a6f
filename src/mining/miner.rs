//! Mining engine for the ledger
//!
//! Builds the next block around a reward transaction and runs proof of work
//! on it. The miner never touches the chain; the caller appends the result.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use log::info;
use serde::Serialize;
use std::time::Instant;

/// Mining statistics
#[derive(Debug, Clone, Serialize)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

/// Miner for creating new blocks
#[derive(Debug, Clone)]
pub struct Miner {
    /// Address receiving the block reward
    pub address: String,
    /// Amount minted per block
    pub reward: f64,
}

impl Miner {
    /// Create a new miner
    pub fn new(address: &str, reward: f64) -> Self {
        Self {
            address: address.to_string(),
            reward,
        }
    }

    /// Reward transaction minted by the network for this miner
    pub fn reward_transaction(&self) -> Transaction {
        Transaction::reward(&self.address, self.reward)
    }

    /// Build and mine a block on top of `prev_hash`. The reward transaction
    /// is placed first, followed by `transactions` in order.
    pub fn mine_block(
        &self,
        index: u64,
        prev_hash: &str,
        difficulty: usize,
        transactions: Vec<Transaction>,
    ) -> (Block, MiningStats) {
        let start = Instant::now();

        let mut all_transactions = Vec::with_capacity(transactions.len() + 1);
        all_transactions.push(self.reward_transaction());
        all_transactions.extend(transactions);

        let mut block = Block::new(index, all_transactions, prev_hash);

        info!(
            "Mining block {} with {} transactions at difficulty {}...",
            block.index,
            block.transactions.len(),
            difficulty
        );

        // Busy loop; no cancellation once started
        let attempts = block.mine(difficulty);

        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        let stats = MiningStats {
            hash_attempts: attempts,
            time_ms: elapsed,
            hash_rate,
        };

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s): {}",
            block.index, elapsed, attempts, hash_rate, block.hash
        );

        (block, stats)
    }
}
