//! Core types for tamefile.
//!
//! This crate provides the data structures shared by the scanner and the
//! analysis crates: file records, the scanned inventory, and configuration.

mod config;
mod error;
mod inventory;
mod record;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use inventory::{HardlinkGroup, Inventory, InventoryStats};
pub use record::{FileRecord, total_size};
