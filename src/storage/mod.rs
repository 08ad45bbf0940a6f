//! Storage module for ledger persistence
//!
//! - [`LedgerStore`]: the durable store interface the ledger writes through
//! - [`SqliteStore`]: SQLite implementation with a balance index
//! - [`Snapshotter`]: JSON chain snapshots with rotating backups

pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use snapshot::{load_snapshot, SnapshotConfig, Snapshotter};
pub use sqlite::SqliteStore;
pub use store::{LedgerStore, StorageError, StoreStats};
