//! Shared types, error model, and configuration for LeadSift.
//!
//! This crate is the foundation depended on by all other LeadSift crates.
//! It provides:
//! - [`LeadSiftError`]: the unified error type
//! - Domain types ([`RunId`], [`ExclusionPolicy`], [`CleanProfile`])
//! - Configuration ([`AppConfig`], [`SortSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BUILTIN_PROFILES, OutputConfig, ReferenceConfig, SortSettings, config_dir,
    config_file_path, desktop_dir, init_config, load_config, load_config_from,
};
pub use error::{ErrorKind, LeadSiftError, Result};
pub use types::{CleanProfile, ExclusionPolicy, MAX_EMAIL_COLUMNS, RunId};
