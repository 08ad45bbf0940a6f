//! SQLite-backed ledger store
//!
//! Tables:
//! - `blocks`: one row per block, full block JSON in `block_data`
//! - `transactions`: one row per (block, position)
//! - `addresses`: running balance index
//! - `chain_state`: single row with latest block and totals

use crate::core::block::Block;
use crate::storage::store::{LedgerStore, StorageError, StoreStats};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Params, Transaction as SqlTransaction};
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS blocks (
        block_index INTEGER PRIMARY KEY,
        hash TEXT UNIQUE NOT NULL,
        previous_hash TEXT NOT NULL,
        merkle_root TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        nonce INTEGER NOT NULL,
        transaction_count INTEGER NOT NULL,
        block_data TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS transactions (
        block_index INTEGER NOT NULL,
        tx_index INTEGER NOT NULL,
        hash TEXT NOT NULL,
        block_hash TEXT NOT NULL,
        from_address TEXT NOT NULL,
        to_address TEXT NOT NULL,
        amount REAL NOT NULL,
        fee REAL NOT NULL,
        PRIMARY KEY (block_index, tx_index)
    );
    CREATE TABLE IF NOT EXISTS addresses (
        address TEXT PRIMARY KEY,
        balance REAL NOT NULL DEFAULT 0.0,
        transaction_count INTEGER NOT NULL DEFAULT 0,
        first_seen INTEGER NOT NULL,
        last_updated INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS chain_state (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        latest_block_hash TEXT NOT NULL,
        latest_block_index INTEGER NOT NULL,
        total_blocks INTEGER NOT NULL,
        total_transactions INTEGER NOT NULL,
        last_updated INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_hash ON transactions(hash);
    CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_address);
    CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_address);
";

/// Ledger store over a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn decode_block(data: Option<String>) -> Result<Option<Block>, StorageError> {
        data.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StorageError::from)
    }

    fn query_block<P: Params>(&self, sql: &str, params: P) -> Result<Option<Block>, StorageError> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(sql, params, |row| row.get(0))
            .optional()?;
        Self::decode_block(data)
    }

    fn apply_balance(
        tx: &SqlTransaction<'_>,
        address: &str,
        change: f64,
        now: i64,
    ) -> Result<(), StorageError> {
        tx.execute(
            "INSERT INTO addresses (address, balance, transaction_count, first_seen, last_updated)
             VALUES (?1, ?2, 1, ?3, ?3)
             ON CONFLICT(address) DO UPDATE SET
                balance = balance + excluded.balance,
                transaction_count = transaction_count + 1,
                last_updated = excluded.last_updated",
            params![address, change, now],
        )?;
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn save_block(&self, block: &Block) -> Result<(), StorageError> {
        let block_data = serde_json::to_string(block)?;
        let index = block.index as i64;
        let now = Utc::now().timestamp();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for (position, transaction) in block.transactions.iter().enumerate() {
            tx.execute(
                "INSERT INTO transactions
                    (block_index, tx_index, hash, block_hash, from_address, to_address, amount, fee)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    index,
                    position as i64,
                    transaction.hash,
                    block.hash,
                    transaction.from,
                    transaction.to,
                    transaction.amount,
                    transaction.fee,
                ],
            )?;

            Self::apply_balance(&tx, &transaction.from, -transaction.amount - transaction.fee, now)?;
            Self::apply_balance(&tx, &transaction.to, transaction.amount, now)?;
        }

        tx.execute(
            "INSERT INTO blocks
                (block_index, hash, previous_hash, merkle_root, timestamp, nonce, transaction_count, block_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                index,
                block.hash,
                block.prev_hash,
                block.merkle_root,
                block.timestamp,
                block.nonce as i64,
                block.transactions.len() as i64,
                block_data,
            ],
        )?;

        tx.execute(
            "INSERT INTO chain_state
                (id, latest_block_hash, latest_block_index, total_blocks, total_transactions, last_updated)
             VALUES (1, ?1, ?2, 1, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                latest_block_hash = excluded.latest_block_hash,
                latest_block_index = excluded.latest_block_index,
                total_blocks = total_blocks + 1,
                total_transactions = total_transactions + excluded.total_transactions,
                last_updated = excluded.last_updated",
            params![block.hash, index, block.transactions.len() as i64, now],
        )?;

        tx.commit()?;
        log::debug!("Persisted block {} ({})", block.index, block.hash);
        Ok(())
    }

    fn load_full_chain(&self) -> Result<Vec<Block>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT block_data FROM blocks ORDER BY block_index ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(serde_json::from_str(&row?)?);
        }
        Ok(blocks)
    }

    fn latest_block(&self) -> Result<Option<Block>, StorageError> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .query_row(
                "SELECT block_data FROM blocks ORDER BY block_index DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Self::decode_block(data)
    }

    fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, StorageError> {
        self.query_block("SELECT block_data FROM blocks WHERE hash = ?1", params![hash])
    }

    fn block_by_index(&self, index: u64) -> Result<Option<Block>, StorageError> {
        let index = i64::try_from(index)
            .map_err(|_| StorageError::InvalidData(format!("block index {} out of range", index)))?;
        self.query_block("SELECT block_data FROM blocks WHERE block_index = ?1", params![index])
    }

    fn address_balance(&self, address: &str) -> Result<f64, StorageError> {
        let conn = self.conn.lock();
        let balance: Option<f64> = conn
            .query_row(
                "SELECT balance FROM addresses WHERE address = ?1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance.unwrap_or(0.0))
    }

    fn aggregate_stats(&self) -> Result<StoreStats, StorageError> {
        let conn = self.conn.lock();

        let mut stats = conn
            .query_row(
                "SELECT latest_block_hash, latest_block_index, total_blocks, total_transactions, last_updated
                 FROM chain_state WHERE id = 1",
                [],
                |row| {
                    Ok(StoreStats {
                        latest_block_hash: row.get(0)?,
                        latest_block_index: row.get::<_, i64>(1)? as u64,
                        total_blocks: row.get::<_, i64>(2)? as u64,
                        total_transactions: row.get::<_, i64>(3)? as u64,
                        total_addresses: 0,
                        last_updated: row.get(4)?,
                    })
                },
            )
            .optional()?
            .unwrap_or_default();

        let addresses: i64 = conn.query_row("SELECT COUNT(*) FROM addresses", [], |row| row.get(0))?;
        stats.total_addresses = addresses as u64;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;

    fn mined(index: u64, prev_hash: &str, txs: Vec<Transaction>) -> Block {
        let mut block = Block::new(index, txs, prev_hash);
        block.mine(1);
        block
    }

    fn seeded_store() -> (SqliteStore, Vec<Block>) {
        let store = SqliteStore::open_in_memory().unwrap();
        let genesis = Block::genesis();
        let first = mined(
            1,
            &genesis.hash,
            vec![
                Transaction::reward("miner", 10.0),
                Transaction::new("alice", "bob", 10.0, 0.1),
            ],
        );
        store.save_block(&genesis).unwrap();
        store.save_block(&first).unwrap();
        (store, vec![genesis, first])
    }

    #[test]
    fn test_save_and_load_chain() {
        let (store, blocks) = seeded_store();

        let loaded = store.load_full_chain().unwrap();
        assert_eq!(loaded, blocks);
        assert_eq!(store.latest_block().unwrap(), Some(blocks[1].clone()));
        assert_eq!(store.block_by_index(0).unwrap(), Some(blocks[0].clone()));
        assert_eq!(
            store.block_by_hash(&blocks[1].hash).unwrap(),
            Some(blocks[1].clone())
        );
        assert_eq!(store.block_by_index(7).unwrap(), None);
        assert_eq!(store.block_by_hash("missing").unwrap(), None);
    }

    #[test]
    fn test_balance_index() {
        let (store, _) = seeded_store();
        assert_eq!(store.address_balance("alice").unwrap(), -10.1);
        assert_eq!(store.address_balance("bob").unwrap(), 10.0);
        assert_eq!(store.address_balance("miner").unwrap(), 10.0);
        assert_eq!(store.address_balance("nobody").unwrap(), 0.0);
    }

    #[test]
    fn test_aggregate_stats() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.aggregate_stats().unwrap(), StoreStats::default());

        let (store, blocks) = seeded_store();
        let stats = store.aggregate_stats().unwrap();
        assert_eq!(stats.latest_block_hash, blocks[1].hash);
        assert_eq!(stats.latest_block_index, 1);
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.total_addresses, 4);
    }

    #[test]
    fn test_failed_save_writes_nothing() {
        let (store, blocks) = seeded_store();

        // Same hash at a new index: transaction rows go in, the block row fails
        let mut conflicting = blocks[1].clone();
        conflicting.index = 2;
        assert!(store.save_block(&conflicting).is_err());

        assert_eq!(store.address_balance("bob").unwrap(), 10.0);
        assert_eq!(store.load_full_chain().unwrap().len(), 2);
        assert_eq!(store.aggregate_stats().unwrap().total_transactions, 2);
    }

    #[test]
    fn test_reopen_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let genesis = Block::genesis();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_block(&genesis).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_full_chain().unwrap(), vec![genesis]);
    }
}
