//! JSON snapshots of the chain
//!
//! Point-in-time backups written next to the database. A snapshot is only
//! handed back after the chain it contains validates.

use crate::core::blockchain::Blockchain;
use crate::storage::store::StorageError;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Snapshot configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub data_dir: PathBuf,
    pub file_name: String,
    /// Older snapshots kept as `<file>.backup.N`, 0 disables rotation
    pub max_backups: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ledger_data"),
            file_name: "chain-snapshot.json".to_string(),
            max_backups: 5,
        }
    }
}

/// Writes and restores chain snapshots
pub struct Snapshotter {
    config: SnapshotConfig,
}

impl Snapshotter {
    pub fn new(config: SnapshotConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Path of the current snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.file_name)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.file_name, index))
    }

    /// Write a snapshot, rotating the previous one into the backups
    pub fn save(&self, chain: &Blockchain) -> Result<PathBuf, StorageError> {
        let path = self.snapshot_path();

        if self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), chain)?;

        fs::rename(&temp_path, &path)?;
        log::info!("Wrote snapshot of {} blocks to {}", chain.len(), path.display());

        Ok(path)
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Load the current snapshot
    pub fn load(&self) -> Result<Blockchain, StorageError> {
        load_snapshot(&self.snapshot_path())
    }

    /// Load backup `index` (0 is the most recent)
    pub fn restore_backup(&self, index: usize) -> Result<Blockchain, StorageError> {
        load_snapshot(&self.backup_path(index))
    }

    /// Indexes of the backups present on disk
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Read a snapshot file and check the chain inside it
pub fn load_snapshot(path: &Path) -> Result<Blockchain, StorageError> {
    if !path.exists() {
        return Err(StorageError::InvalidData(format!(
            "snapshot {} not found",
            path.display()
        )));
    }

    let file = fs::File::open(path)?;
    let chain: Blockchain = serde_json::from_reader(BufReader::new(file))?;

    if chain.is_empty() {
        return Err(StorageError::InvalidData("snapshot has no blocks".to_string()));
    }

    chain
        .validate()
        .map_err(|e| StorageError::InvalidData(format!("snapshot chain is invalid: {}", e)))?;

    Ok(chain)
}
