//! Shared types, error model, and configuration for promptkit.
//!
//! This crate is the foundation depended on by all other promptkit crates.
//! It provides:
//! - [`PromptKitError`], the unified error type
//! - Domain records ([`Lead`], [`QueryPlan`], [`SearchFinding`], [`Video`], ...)
//! - Configuration ([`AppConfig`], [`FanoutConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AdsConfig, AppConfig, DatagenConfig, DefaultsConfig, FanoutConfig, FanoutSettings,
    LeadsConfig, ProviderConfig, ProvidersConfig, TrackerConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{PromptKitError, Result};
pub use types::{
    Lead, MinimalLead, NaturalKey, OutreachDraft, QueryPlan, RunId, SearchFinding,
    SearchOutcome, Snapshot, Task, Video,
};
