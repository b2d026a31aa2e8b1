//! Configuration for gitdiff
//!
//! This crate provides:
//! - Config file discovery (CWD, home directory, platform config directory)
//! - Ingestion configuration (IngestConfig) with per-field defaults
//! - Construction-time validation, so a bad config fails before any git
//!   process is spawned

pub mod config_file;
pub mod ingest_config;
pub mod paths;

pub use config_file::load_config_file;
pub use ingest_config::{
    ConfigError, DiffTool, IngestConfig, LimitsConfig, WhitespaceBehavior,
};
