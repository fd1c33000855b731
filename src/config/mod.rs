//! Configuration management for Ferry.
//!
//! Ferry reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FERRY_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! name = "ferry"
//! work_dir = "/tmp"
//!
//! [remote]
//! base_url = "https://folio.example.org"
//! tenant = "diku"
//! token = "${FERRY_REMOTE_TOKEN}"
//!
//! [sources.circulation-log]
//! path = "audit-data/circulation/logs"
//! records_field = "logRecords"
//! page_size = 100
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ferry.toml")?;
//! println!("Remote: {}", config.remote.base_url);
//! for name in config.sources.keys() {
//!     println!("Source: {name}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CacheConfig, DescribedStepConfig, EnrichRule, FerryConfig, LoggingConfig,
    NotifierConfig, PaginationMode, PublisherConfig, PublisherKind, RemoteConfig, RetryConfig,
    RollbackConfig, SourceConfig, StorageConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
