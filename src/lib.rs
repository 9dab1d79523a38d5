//! Hadith-Harvest: a paginating hadith collector
//!
//! This crate walks the listing pages of a hadith collection in a headless
//! browser, extracts one record per panel, and inserts the records into a
//! relational table, following the "next page" link until there is none.

pub mod config;
pub mod driver;
pub mod harvest;
pub mod store;

use thiserror::Error;

/// Main error type for Hadith-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The store could not be reached, or the liveness query failed.
    #[error("error connecting to store: {0}")]
    Connectivity(store::StoreError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Browser error: {0}")]
    Driver(#[from] driver::DriverError),
}

impl HarvestError {
    /// Returns true when the run failed before any page was visited because
    /// the store was unreachable
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),
}

/// Result type alias for Hadith-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{run_harvest, HadithRecord, HarvestStats, Harvester};
