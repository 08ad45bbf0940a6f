//! Command-line interface for the ledger operator binary

pub mod commands;

pub use commands::*;
