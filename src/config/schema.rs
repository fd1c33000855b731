//! Configuration schema types
//!
//! Maps the sections of `ferry.toml` onto typed structs. Every section has
//! defaults so a minimal file only needs the sources it exports.

use crate::config::SecretString;
use crate::core::reference::ReferenceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main Ferry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Upstream REST services
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Reference data cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where job status records go
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Where finished output files are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where update snapshots are restored to
    #[serde(default)]
    pub rollback: RollbackConfig,

    /// Completion summary settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Named export sources
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FerryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.remote.validate()?;
        self.cache.validate()?;
        self.publisher.validate()?;
        self.notifier.validate()?;
        for (name, source) in &self.sources {
            source
                .validate()
                .map_err(|e| format!("sources.{name}: {e}"))?;
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Look up a configured source by name
    pub fn source(&self, name: &str) -> Result<&SourceConfig, String> {
        self.sources.get(name).ok_or_else(|| {
            let known: Vec<_> = self.sources.keys().map(String::as_str).collect();
            format!(
                "Unknown source '{}'. Configured sources: {}",
                name,
                if known.is_empty() {
                    "<none>".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name, also the temp directory under `work_dir`
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root for job temp files
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("application.name cannot be empty".to_string());
        }
        if self.name.contains(['/', '\\']) {
            return Err("application.name cannot contain path separators".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            work_dir: default_work_dir(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self
            .backoff_multiplier
            .powf(attempt.saturating_sub(1) as f64);
        let delay_ms = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// Upstream REST service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL all source and reference paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Tenant sent with every request
    #[serde(default)]
    pub tenant: Option<String>,

    /// Access token sent with every request
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub token: Option<SecretString>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl RemoteConfig {
    fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("remote.base_url cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("remote.base_url must start with http:// or https://".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("remote.timeout_seconds must be greater than 0".to_string());
        }
        if self.retry.max_retries == 0 {
            return Err("remote.retry.max_retries must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tenant: None,
            token: None,
            timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

/// Reference data cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries per partition unless overridden
    #[serde(default = "default_cache_capacity")]
    pub default_capacity: u64,

    /// Expiry after insertion; unset keeps entries until evicted
    #[serde(default)]
    pub ttl_seconds: Option<u64>,

    /// Per-partition capacity, keyed by cache name (e.g. `users`)
    #[serde(default)]
    pub capacities: BTreeMap<String, u64>,
}

impl CacheConfig {
    fn validate(&self) -> Result<(), String> {
        if self.default_capacity == 0 {
            return Err("cache.default_capacity must be greater than 0".to_string());
        }
        for name in self.capacities.keys() {
            name.parse::<ReferenceKind>()
                .map_err(|e| format!("cache.capacities: {e}"))?;
        }
        Ok(())
    }

    /// Capacities resolved to reference kinds, unknown names skipped
    pub fn kind_capacities(&self) -> Vec<(ReferenceKind, u64)> {
        self.capacities
            .iter()
            .filter_map(|(name, capacity)| {
                name.parse::<ReferenceKind>()
                    .ok()
                    .map(|kind| (kind, *capacity))
            })
            .collect()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_cache_capacity(),
            ttl_seconds: None,
            capacities: BTreeMap::new(),
        }
    }
}

/// Status publisher selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Write status records to the log
    #[default]
    Log,
    /// POST status records to an HTTP endpoint
    Http,
}

/// Status publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub kind: PublisherKind,

    /// Base endpoint for the `http` publisher
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Topic appended to the endpoint
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl PublisherConfig {
    fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("publisher.topic cannot be empty".to_string());
        }
        if self.kind == PublisherKind::Http {
            match self.endpoint.as_deref() {
                None | Some("") => {
                    return Err(
                        "publisher.endpoint is required when publisher.kind = 'http'".to_string(),
                    )
                }
                Some(endpoint)
                    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") =>
                {
                    return Err(
                        "publisher.endpoint must start with http:// or https://".to_string()
                    )
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: PublisherKind::Log,
            endpoint: None,
            topic: default_topic(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Output storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Rollback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    /// Directory snapshots are copied back into
    #[serde(default = "default_restore_dir")]
    pub restore_dir: PathBuf,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            restore_dir: default_restore_dir(),
        }
    }
}

/// A step whose write count appears in the completion description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedStepConfig {
    pub step: String,
    pub label: String,
}

/// Completion notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_described_steps")]
    pub described_steps: Vec<DescribedStepConfig>,
}

impl NotifierConfig {
    fn validate(&self) -> Result<(), String> {
        for step in &self.described_steps {
            if step.step.trim().is_empty() || step.label.trim().is_empty() {
                return Err(
                    "notifier.described_steps entries need a step and a label".to_string()
                );
            }
        }
        Ok(())
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            described_steps: default_described_steps(),
        }
    }
}

/// Paging style of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// offset/limit query parameters
    #[default]
    Offset,
    /// continuation marker returned by the server
    Cursor,
}

/// Reference enrichment applied to every exported record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichRule {
    /// Record field holding the reference id
    pub field: String,
    /// Reference kind the id points at
    pub kind: ReferenceKind,
    /// Record field that receives the resolved name
    pub target: String,
}

/// One remote collection that can be exported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Collection path relative to `remote.base_url`
    pub path: String,

    #[serde(default)]
    pub pagination: PaginationMode,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub start_offset: u64,

    #[serde(default)]
    pub max_items: Option<u64>,

    /// Inclusive lower bound, required for cursor paging
    #[serde(default)]
    pub range_start: Option<String>,

    /// Inclusive upper bound, required for cursor paging
    #[serde(default)]
    pub range_end: Option<String>,

    /// Response field holding the records
    #[serde(default = "default_records_field")]
    pub records_field: String,

    /// Response field holding the continuation marker
    #[serde(default = "default_next_field")]
    pub next_field: String,

    /// Query passed through unchanged
    #[serde(default)]
    pub query: Option<String>,

    /// Extra query parameters sent with every page request
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Records written per chunk
    #[serde(default = "default_page_size")]
    pub chunk_size: usize,

    /// Step name reported in job status, `<source>ExportStep` when unset
    #[serde(default)]
    pub step_name: Option<String>,

    /// Record field used to identify failed records
    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default)]
    pub enrich: Vec<EnrichRule>,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("path cannot be empty".to_string());
        }
        if self.page_size == 0 || self.page_size > 10_000 {
            return Err(format!(
                "page_size must be between 1 and 10000, got {}",
                self.page_size
            ));
        }
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.records_field.trim().is_empty() {
            return Err("records_field cannot be empty".to_string());
        }
        if self.pagination == PaginationMode::Cursor
            && (self.range_start.is_none() || self.range_end.is_none())
        {
            return Err("cursor pagination requires range_start and range_end".to_string());
        }
        for rule in &self.enrich {
            if rule.field.trim().is_empty() || rule.target.trim().is_empty() {
                return Err("enrich rules need a field and a target".to_string());
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid = ["daily", "hourly", "never"];
        if !valid.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_app_name() -> String {
    "ferry".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_base_url() -> String {
    "http://localhost:9130".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_cache_capacity() -> u64 {
    1000
}

fn default_topic() -> String {
    "data-export.job.update".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_restore_dir() -> PathBuf {
    PathBuf::from("./restore")
}

fn default_described_steps() -> Vec<DescribedStepConfig> {
    vec![
        DescribedStepConfig {
            step: "chargeFeesFinesExportStep".to_string(),
            label: "# of charges".to_string(),
        },
        DescribedStepConfig {
            step: "refundFeesFinesExportStep".to_string(),
            label: "# of refunds".to_string(),
        },
    ]
}

fn default_page_size() -> usize {
    100
}

fn default_records_field() -> String {
    "records".to_string()
}

fn default_next_field() -> String {
    "next".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceConfig {
        toml::from_str(r#"path = "audit-data/circulation/logs""#).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FerryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_source_defaults() {
        let source = source();
        assert_eq!(source.pagination, PaginationMode::Offset);
        assert_eq!(source.page_size, 100);
        assert_eq!(source.records_field, "records");
        assert!(source.validate().is_ok());
    }

    #[test]
    fn test_cursor_source_requires_range() {
        let mut source = source();
        source.pagination = PaginationMode::Cursor;
        assert!(source.validate().is_err());

        source.range_start = Some("2024-01-01T00:00:00Z".to_string());
        source.range_end = Some("2024-02-01T00:00:00Z".to_string());
        assert!(source.validate().is_ok());
    }

    #[test]
    fn test_http_publisher_requires_endpoint() {
        let mut config = PublisherConfig {
            kind: PublisherKind::Http,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.endpoint = Some("https://events.example.org".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_cache_name_rejected() {
        let mut config = CacheConfig::default();
        config.capacities.insert("users".to_string(), 10);
        assert!(config.validate().is_ok());
        assert_eq!(config.kind_capacities(), vec![(ReferenceKind::User, 10)]);

        config.capacities.insert("widgets".to_string(), 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_delay_ms: 100,
            max_delay_ms: 300,
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for(3), Duration::from_millis(300));
    }

    #[test]
    fn test_enrich_rule_parses_kind() {
        let rule: EnrichRule = toml::from_str(
            r#"
field = "materialTypeId"
kind = "material-type"
target = "materialType"
"#,
        )
        .unwrap();
        assert_eq!(rule.kind, ReferenceKind::MaterialType);
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let config = LoggingConfig {
            local_rotation: "weekly".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
