//! Mining module for block creation and transaction pooling

pub mod enhanced_pool;
pub mod mempool;
pub mod miner;

pub use enhanced_pool::{EnhancedPool, PoolStats};
pub use mempool::{PoolError, TransactionPool};
pub use miner::{Miner, MiningStats};
