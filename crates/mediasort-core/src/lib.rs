//! Core functionality for classifying and organizing media files by device
//! of origin.
//!
//! This library provides the foundational components for media sorting:
//! - Metadata extraction through external tools
//! - Layered Apple-device detection and destination routing
//! - Checkpointed, hash-verified file organization with undo manifests
//! - Duplicate detection, folder comparison and inventory generation

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::{default_state_dir, Config};
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod checkpoint;
pub mod config;
pub mod detector;
pub mod duplicates;
pub mod error_log;
pub mod fsops;
pub mod hasher;
pub mod inventory;
pub mod logging;
pub mod manifest;
pub mod metadata;
pub mod observer;
pub mod organizer;
pub mod router;
pub mod tools;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;
