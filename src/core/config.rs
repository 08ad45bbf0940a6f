//! Ledger configuration
//!
//! Caller-supplied parameters fixed at ledger construction.

use serde::{Deserialize, Serialize};

/// Default mining difficulty (number of leading zero hex characters)
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Default block reward in coins
pub const DEFAULT_MINING_REWARD: f64 = 10.0;

/// Default reward recipient
pub const DEFAULT_REWARD_ADDRESS: &str = "miner";

/// Default maximum number of pending transactions per pool
pub const DEFAULT_MAX_POOL_SIZE: usize = 1000;

/// Hex characters in a SHA-256 digest
const MAX_DIFFICULTY: usize = 64;

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Required leading `'0'` characters in a block hash
    pub difficulty: usize,
    /// Amount minted to `reward_address` by every mined block
    pub mining_reward: f64,
    pub reward_address: String,
    /// Maximum pending transactions held by each pool
    pub max_pool_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            reward_address: DEFAULT_REWARD_ADDRESS.to_string(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_reward(mut self, address: &str, amount: f64) -> Self {
        self.reward_address = address.to_string();
        self.mining_reward = amount;
        self
    }

    pub fn with_max_pool_size(mut self, max_pool_size: usize) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    /// Check every parameter, returning a description of the first bad one
    pub fn validate(&self) -> Result<(), String> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(format!(
                "difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.difficulty
            ));
        }

        if !self.mining_reward.is_finite() || self.mining_reward <= 0.0 {
            return Err(format!(
                "mining reward must be positive, got {}",
                self.mining_reward
            ));
        }

        if self.reward_address.is_empty() {
            return Err("reward address cannot be empty".to_string());
        }

        if self.max_pool_size == 0 {
            return Err("pool size must be at least 1".to_string());
        }

        Ok(())
    }
}
