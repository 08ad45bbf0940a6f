//! Persistent ledger
//!
//! Owns the in-memory chain and the pools, and mirrors every committed
//! block into a [`LedgerStore`]. Memory stays authoritative; the store is
//! only read back during explicit recovery.
//!
//! Mining state machine for the chain tail:
//! `Idle -> Mining -> Committed | RolledBack`. A block is appended in memory
//! before it is persisted and popped again if persistence fails, so memory
//! and storage never diverge by more than the block being committed.
//!
//! The ledger is not internally synchronized for chain mutation; callers
//! serialize `&mut` access. The pools are safe to share.

use crate::core::block::Block;
use crate::core::blockchain::{Blockchain, BlockchainError, ChainStats};
use crate::core::config::LedgerConfig;
use crate::core::enhanced::{EnhancedTransaction, TransactionSignature};
use crate::core::transaction::Transaction;
use crate::crypto::{MerkleError, MerkleProof};
use crate::mining::{EnhancedPool, Miner, MiningStats, PoolError, PoolStats, TransactionPool};
use crate::storage::{LedgerStore, Snapshotter, StorageError, StoreStats};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("Persistence failure: {0}")]
    Storage(#[from] StorageError),
    #[error("Proof error: {0}")]
    Proof(#[from] MerkleError),
    #[error("Invalid chain: {0}")]
    Chain(#[from] BlockchainError),
    #[error("Invalid block index: {0}")]
    InvalidBlockIndex(u64),
    #[error("Stored chain diverged: {0}")]
    ChainDivergence(String),
    #[error("No blocks found in store")]
    EmptyStore,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// Statistics
// =============================================================================

/// Result of reconciling memory with the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Latest index and hash already matched
    InSync,
    /// The chain was reloaded from the store
    Recovered,
}

/// Combined store, pool and chain statistics
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub store: StoreStats,
    pub pending_transactions: usize,
    /// Enhanced transactions currently executable
    pub pending_enhanced_transactions: usize,
    pub pool: PoolStats,
    pub chain_valid: bool,
    /// Figures for the in-memory chain
    pub chain: ChainStats,
    pub difficulty: usize,
    pub mining_reward: f64,
}

// =============================================================================
// Ledger
// =============================================================================

/// Chain plus pools, persisted through `S`
pub struct Ledger<S: LedgerStore> {
    chain: Blockchain,
    pool: TransactionPool,
    enhanced_pool: EnhancedPool,
    miner: Miner,
    config: LedgerConfig,
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    /// Open a ledger over `store`. An empty store is seeded with the genesis
    /// block; a stored chain that fails validation is refused.
    pub fn open(config: LedgerConfig, store: S) -> Result<Self, LedgerError> {
        config.validate().map_err(LedgerError::InvalidConfig)?;

        let blocks = store.load_full_chain()?;
        let chain = if blocks.is_empty() {
            let chain = Blockchain::new();
            store.save_block(chain.latest_block())?;
            info!("Initialized new ledger with genesis block {}", chain.latest_block().hash);
            chain
        } else {
            let chain = Blockchain::from_blocks(blocks)?;
            chain
                .validate()
                .map_err(|e| LedgerError::ChainDivergence(e.to_string()))?;
            info!("Loaded ledger with {} blocks from store", chain.len());
            chain
        };

        Ok(Self {
            chain,
            pool: TransactionPool::new(config.max_pool_size),
            enhanced_pool: EnhancedPool::new(config.max_pool_size),
            miner: Miner::new(&config.reward_address, config.mining_reward),
            config,
            store,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn enhanced_pool(&self) -> &EnhancedPool {
        &self.enhanced_pool
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.latest_block()
    }

    pub fn height(&self) -> u64 {
        self.chain.height()
    }

    /// Blocks in memory, genesis included
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Queue a standard transaction
    pub fn add_transaction(&self, tx: Transaction) -> Result<(), LedgerError> {
        self.pool.add(tx)?;
        Ok(())
    }

    /// Queue a multi-sig, time-lock or contract transaction
    pub fn add_enhanced_transaction(&self, tx: EnhancedTransaction) -> Result<(), LedgerError> {
        self.enhanced_pool.add_enhanced(tx)?;
        Ok(())
    }

    /// Sign a queued enhanced transaction
    pub fn add_signature(
        &self,
        tx_hash: &str,
        signature: TransactionSignature,
    ) -> Result<(), LedgerError> {
        self.enhanced_pool.add_signature(tx_hash, signature)?;
        Ok(())
    }

    // =========================================================================
    // Mining
    // =========================================================================

    /// Mine every eligible pending transaction into a new block and persist
    /// it. On a persistence failure the block is rolled back and the pools
    /// are left untouched.
    pub fn mine_pending_transactions(&mut self) -> Result<(Block, MiningStats), LedgerError> {
        let pending = self.pool.transactions();
        // `add_transaction` fills `pool`; the enhanced pool only holds standard
        // transactions queued on it directly through `enhanced_pool()`
        let (queued_standard, executable) = self.enhanced_pool.executable_transactions();

        let mut batch = Vec::with_capacity(pending.len() + queued_standard.len() + executable.len());
        batch.extend(pending.iter().cloned());
        batch.extend(queued_standard.iter().cloned());
        batch.extend(executable.iter().map(EnhancedTransaction::to_standard));

        let (block, stats) = self.miner.mine_block(
            self.chain.next_index(),
            &self.chain.latest_block().hash,
            self.config.difficulty,
            batch,
        );

        self.chain.push(block.clone());

        if let Err(e) = self.store.save_block(&block) {
            warn!("Failed to persist block {}, rolling back: {}", block.index, e);
            self.chain.pop();
            return Err(e.into());
        }

        let hashes = |txs: &[Transaction]| txs.iter().map(|tx| tx.hash.clone()).collect::<Vec<_>>();
        self.pool.remove(&hashes(&pending));
        self.enhanced_pool.remove_standard(&hashes(&queued_standard));
        self.enhanced_pool.remove_enhanced(
            &executable.iter().map(|tx| tx.hash.clone()).collect::<Vec<_>>(),
        );

        info!(
            "Block {} committed with {} transactions",
            block.index,
            block.transactions.len()
        );
        Ok((block, stats))
    }

    // =========================================================================
    // Balances and validation
    // =========================================================================

    /// Balance from the store's index, falling back to a chain scan when the
    /// index cannot be read
    pub fn get_balance(&self, address: &str) -> f64 {
        match self.store.address_balance(address) {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Balance index unavailable, scanning chain: {}", e);
                self.balance_from_chain(address)
            }
        }
    }

    /// Balance from a full scan of the in-memory chain
    pub fn balance_from_chain(&self, address: &str) -> f64 {
        self.chain.balance(address)
    }

    pub fn is_chain_valid(&self) -> bool {
        self.chain.is_valid()
    }

    /// Inclusion proof for `tx_hash` in block `block_index`
    pub fn get_transaction_proof(
        &self,
        block_index: u64,
        tx_hash: &str,
    ) -> Result<MerkleProof, LedgerError> {
        let block = self
            .chain
            .get_block(block_index)
            .ok_or(LedgerError::InvalidBlockIndex(block_index))?;
        Ok(block.generate_proof(tx_hash)?)
    }

    /// Check a proof against block `block_index`; unknown blocks verify false
    pub fn verify_transaction_in_block(&self, block_index: u64, proof: &MerkleProof) -> bool {
        self.chain
            .get_block(block_index)
            .map_or(false, |block| block.verify_proof(proof))
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Replace the in-memory chain with the stored one, only if it validates
    pub fn recover_from_database(&mut self) -> Result<(), LedgerError> {
        info!("Recovering chain from store...");

        let blocks = self.store.load_full_chain()?;
        if blocks.is_empty() {
            return Err(LedgerError::EmptyStore);
        }

        let chain = Blockchain::from_blocks(blocks)?;
        if let Err(e) = chain.validate() {
            warn!("Refusing to adopt stored chain: {}", e);
            return Err(LedgerError::ChainDivergence(e.to_string()));
        }

        self.chain = chain;
        info!("Recovered chain with {} blocks", self.chain.len());
        Ok(())
    }

    /// Compare the latest block in memory and in the store; any mismatch in
    /// index or hash triggers recovery
    pub fn sync_with_database(&mut self) -> Result<SyncOutcome, LedgerError> {
        let stored = self.store.latest_block()?.ok_or(LedgerError::EmptyStore)?;
        let latest = self.chain.latest_block();

        if stored.index != latest.index {
            warn!(
                "Chain out of sync. Store: {}, memory: {}",
                stored.index, latest.index
            );
        } else if stored.hash != latest.hash {
            warn!("Hash mismatch at block {}", stored.index);
        } else {
            info!("Chain is in sync with store");
            return Ok(SyncOutcome::InSync);
        }

        self.recover_from_database()?;
        Ok(SyncOutcome::Recovered)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Block lookup served from the store
    pub fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, LedgerError> {
        Ok(self.store.block_by_hash(hash)?)
    }

    /// Block lookup served from the store
    pub fn block_by_index(&self, index: u64) -> Result<Option<Block>, LedgerError> {
        Ok(self.store.block_by_index(index)?)
    }

    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        Ok(LedgerStats {
            store: self.store.aggregate_stats()?,
            pending_transactions: self.pool.len(),
            pending_enhanced_transactions: self.enhanced_pool.executable_transactions().1.len(),
            pool: self.enhanced_pool.stats(),
            chain_valid: self.is_chain_valid(),
            chain: self.chain.stats(),
            difficulty: self.config.difficulty,
            mining_reward: self.config.mining_reward,
        })
    }

    /// Write a JSON snapshot of the in-memory chain
    pub fn backup(&self, snapshots: &Snapshotter) -> Result<PathBuf, LedgerError> {
        Ok(snapshots.save(&self.chain)?)
    }
}
