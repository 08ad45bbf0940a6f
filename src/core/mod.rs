//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (account model, content-hashed)
//! - Enhanced transactions (multi-sig, time-lock, contract)
//! - Blocks (merkle commitment and proof of work)
//! - Blockchain (ordered, hash-linked block sequence)
//! - Ledger (chain + pools + durable store)

pub mod block;
pub mod blockchain;
pub mod config;
pub mod enhanced;
pub mod ledger;
pub mod transaction;

pub use block::{Block, GENESIS_PREV_HASH};
pub use blockchain::{Blockchain, BlockchainError, ChainStats};
pub use config::{
    LedgerConfig, DEFAULT_DIFFICULTY, DEFAULT_MAX_POOL_SIZE, DEFAULT_MINING_REWARD,
    DEFAULT_REWARD_ADDRESS,
};
pub use enhanced::{EnhancedTransaction, TransactionSignature, TransactionType};
pub use ledger::{Ledger, LedgerError, LedgerStats, SyncOutcome};
pub use transaction::{validate_fields, Transaction, TransactionError, NETWORK_ADDRESS};
