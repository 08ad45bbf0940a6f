//! Chain-Ledger CLI Application
//!
//! Operator interface over a ledger database.

use chain_ledger::cli::{self, AppState};
use chain_ledger::core::{
    LedgerConfig, DEFAULT_DIFFICULTY, DEFAULT_MAX_POOL_SIZE, DEFAULT_MINING_REWARD,
    DEFAULT_REWARD_ADDRESS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chain-ledger")]
#[command(version = "0.1.0")]
#[command(about = "A single-node ledger integrity engine", long_about = None)]
struct Cli {
    /// SQLite database holding the ledger
    #[arg(long, default_value = ".ledger_data/ledger.db")]
    db: PathBuf,

    /// Mining difficulty (number of leading zero hex characters)
    #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: usize,

    /// Reward minted for every mined block
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    reward: f64,

    /// Address receiving mining rewards
    #[arg(long, default_value = DEFAULT_REWARD_ADDRESS)]
    reward_address: String,

    /// Maximum pending transactions per pool
    #[arg(long, default_value_t = DEFAULT_MAX_POOL_SIZE)]
    max_pool_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine new blocks
    Mine {
        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Send coins and commit the transfer in a new block
    Send {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: f64,

        #[arg(long, default_value = "0")]
        fee: f64,
    },

    /// Show an address balance
    Balance {
        #[arg(short, long)]
        address: String,

        /// Scan the chain instead of reading the balance index
        #[arg(long)]
        scan: bool,
    },

    /// List recent blocks
    Blocks {
        #[arg(short, long, default_value = "10")]
        count: u32,
    },

    /// Validate the chain
    Validate,

    /// Reconcile the in-memory chain with the database
    Sync,

    /// Print ledger statistics
    Stats,

    /// Produce a merkle proof for a committed transaction
    Proof {
        /// Block index
        #[arg(short, long)]
        block: u64,

        /// Transaction hash
        #[arg(short, long)]
        tx: String,
    },

    /// Write a chain snapshot
    Backup {
        /// Snapshot directory
        #[arg(long, default_value = ".ledger_data/snapshots")]
        dir: PathBuf,

        /// Number of older snapshots to keep
        #[arg(long, default_value = "5")]
        keep: usize,

        /// Check an existing snapshot file instead of writing one
        #[arg(long)]
        verify: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = LedgerConfig {
        difficulty: cli.difficulty,
        mining_reward: cli.reward,
        reward_address: cli.reward_address,
        max_pool_size: cli.max_pool_size,
    };

    let mut state = AppState::new(cli.db, config)?;

    match cli.command {
        Commands::Mine { count } => {
            cli::cmd_mine(&mut state, count)?;
        }

        Commands::Send {
            from,
            to,
            amount,
            fee,
        } => {
            cli::cmd_send(&mut state, &from, &to, amount, fee)?;
        }

        Commands::Balance { address, scan } => {
            cli::cmd_balance(&state, &address, scan)?;
        }

        Commands::Blocks { count } => {
            cli::cmd_blocks(&state, count)?;
        }

        Commands::Validate => {
            cli::cmd_validate(&state)?;
        }

        Commands::Sync => {
            cli::cmd_sync(&mut state)?;
        }

        Commands::Stats => {
            cli::cmd_stats(&state)?;
        }

        Commands::Proof { block, tx } => {
            cli::cmd_proof(&state, block, &tx)?;
        }

        Commands::Backup { dir, keep, verify } => {
            cli::cmd_backup(&state, &dir, keep, verify.as_deref())?;
        }
    }

    Ok(())
}
