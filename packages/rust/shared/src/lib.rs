//! Shared types, error model, and configuration for IndexSync.
//!
//! This crate is the foundation depended on by all other IndexSync crates.
//! It provides:
//! - [`IndexSyncError`] — the unified error type
//! - Domain types ([`TypeName`], [`ObjectRef`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConnectionConfig, DefaultsConfig, IndexConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{IndexSyncError, Result};
pub use types::{ObjectRef, TypeName};
