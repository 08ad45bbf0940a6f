//! CLI commands for the ledger
//!
//! Implements the command handlers for the operator binary. Pools live in
//! process memory, so `send` queues and commits in the same invocation.

use crate::core::{Ledger, LedgerConfig, SyncOutcome, Transaction};
use crate::storage::{load_snapshot, SnapshotConfig, Snapshotter, SqliteStore};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub ledger: Ledger<SqliteStore>,
    pub db_path: PathBuf,
}

impl AppState {
    /// Open the ledger database, creating it with a genesis block if needed
    pub fn new(db_path: PathBuf, config: LedgerConfig) -> CliResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = SqliteStore::open(&db_path)?;
        let ledger = Ledger::open(config, store)?;
        println!("📂 Opened ledger at {:?} ({} blocks)", db_path, ledger.len());

        Ok(Self { ledger, db_path })
    }
}

fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

/// Mine blocks from the pending pools
pub fn cmd_mine(state: &mut AppState, count: u32) -> CliResult<()> {
    let config = state.ledger.config();
    println!(
        "⛏️  Mining {} block(s) for address: {}",
        count, config.reward_address
    );
    println!("   Current difficulty: {}", config.difficulty);

    for _ in 0..count {
        let (block, stats) = state.ledger.mine_pending_transactions()?;

        println!("\n   Block {} mined!", block.index);
        println!("   ├─ Hash: {}", short(&block.hash));
        println!("   ├─ Transactions: {}", block.transactions.len());
        println!("   ├─ Time: {}ms", stats.time_ms);
        println!("   ├─ Attempts: {}", stats.hash_attempts);
        println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);
    }

    let address = state.ledger.config().reward_address.clone();
    println!(
        "\n💰 New balance for miner: {} coins",
        state.ledger.get_balance(&address)
    );

    Ok(())
}

/// Queue a transfer and commit it in a new block
pub fn cmd_send(state: &mut AppState, from: &str, to: &str, amount: f64, fee: f64) -> CliResult<()> {
    let tx = Transaction::new(from, to, amount, fee);

    println!("📤 Transaction created:");
    println!("   Hash: {}", tx.hash);
    println!("   From: {}", from);
    println!("   To: {}", to);
    println!("   Amount: {} coins (fee {})", amount, fee);

    state.ledger.add_transaction(tx)?;
    let (block, _) = state.ledger.mine_pending_transactions()?;

    println!("\n✅ Transaction committed in block {}", block.index);
    Ok(())
}

/// Show an address balance
pub fn cmd_balance(state: &AppState, address: &str, scan: bool) -> CliResult<()> {
    let balance = if scan {
        state.ledger.balance_from_chain(address)
    } else {
        state.ledger.get_balance(address)
    };

    println!("💰 Balance for {}", address);
    println!("   Total: {} coins", balance);
    if scan {
        println!("   (computed from a full chain scan)");
    }

    Ok(())
}

/// List recent blocks
pub fn cmd_blocks(state: &AppState, count: u32) -> CliResult<()> {
    let blocks = state.ledger.chain().blocks();
    let start = blocks.len().saturating_sub(count as usize);

    println!("🧱 Recent blocks:");
    for block in blocks[start..].iter().rev() {
        println!(
            "   #{} | {} | {} tx | {}",
            block.index,
            short(&block.hash),
            block.transactions.len(),
            chrono::DateTime::from_timestamp(block.timestamp, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        );
    }

    Ok(())
}

/// Validate the chain
pub fn cmd_validate(state: &AppState) -> CliResult<()> {
    println!("🔍 Validating ledger...");

    match state.ledger.chain().validate() {
        Ok(()) => {
            println!("✅ Chain is valid!");
            println!("   {} blocks verified", state.ledger.len());
        }
        Err(e) => {
            println!("❌ Chain validation FAILED!");
            println!("   {}", e);
        }
    }

    Ok(())
}

/// Reconcile memory with the database
pub fn cmd_sync(state: &mut AppState) -> CliResult<()> {
    match state.ledger.sync_with_database()? {
        SyncOutcome::InSync => println!("✅ Ledger is in sync with {:?}", state.db_path),
        SyncOutcome::Recovered => println!(
            "♻️  Recovered {} blocks from {:?}",
            state.ledger.len(),
            state.db_path
        ),
    }
    Ok(())
}

/// Print ledger statistics as JSON
pub fn cmd_stats(state: &AppState) -> CliResult<()> {
    let stats = state.ledger.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Produce and check an inclusion proof
pub fn cmd_proof(state: &AppState, block_index: u64, tx_hash: &str) -> CliResult<()> {
    let proof = state.ledger.get_transaction_proof(block_index, tx_hash)?;
    let verified = state.ledger.verify_transaction_in_block(block_index, &proof);

    println!("🌳 Merkle proof for {} in block {}", short(tx_hash), block_index);
    for (i, (hash, is_left)) in proof
        .sibling_hashes
        .iter()
        .zip(&proof.sibling_is_left)
        .enumerate()
    {
        let side = if *is_left { "left" } else { "right" };
        println!("   {} | {:5} | {}", i, side, hash);
    }
    println!("   Verified: {}", verified);

    Ok(())
}

/// Write a snapshot of the chain, or check an existing one
pub fn cmd_backup(state: &AppState, dir: &Path, keep: usize, verify: Option<&Path>) -> CliResult<()> {
    if let Some(path) = verify {
        let chain = load_snapshot(path)?;
        println!("✅ Snapshot {:?} is valid ({} blocks)", path, chain.len());
        return Ok(());
    }

    let snapshots = Snapshotter::new(SnapshotConfig {
        data_dir: dir.to_path_buf(),
        max_backups: keep,
        ..Default::default()
    })?;

    let path = state.ledger.backup(&snapshots)?;
    println!("📦 Snapshot written to {:?}", path);
    println!("   Backups kept: {}", snapshots.list_backups().len());

    Ok(())
}
