//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{FerryConfig, PublisherKind};
use super::secret::secret_string_opt;
use crate::domain::{FerryError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FerryConfig
/// 4. Applies environment variable overrides (FERRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`FerryError::Configuration`] if the file is missing or
/// unreadable, a referenced variable is unset, parsing fails, or
/// validation fails.
///
/// # Examples
///
/// ```no_run
/// use ferry::config::load_config;
///
/// let config = load_config("ferry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FerryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FerryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FerryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parse configuration text with the same steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<FerryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FerryConfig = toml::from_str(&contents)
        .map_err(|e| FerryError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        FerryError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap_or_else(|e| panic!("invalid pattern: {e}"))
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FerryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env(key) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            FerryError::Configuration(format!("Invalid value '{raw}' for {key}"))
        }),
        None => Ok(None),
    }
}

/// Applies environment variable overrides using FERRY_* prefix
///
/// Environment variables follow the pattern: FERRY_<SECTION>_<KEY>
/// For example: FERRY_REMOTE_BASE_URL, FERRY_PUBLISHER_KIND
fn apply_env_overrides(config: &mut FerryConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("FERRY_APPLICATION_NAME") {
        config.application.name = val;
    }
    if let Some(val) = env("FERRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env("FERRY_APPLICATION_WORK_DIR") {
        config.application.work_dir = PathBuf::from(val);
    }

    // Remote overrides
    if let Some(val) = env("FERRY_REMOTE_BASE_URL") {
        config.remote.base_url = val;
    }
    if let Some(val) = env("FERRY_REMOTE_TENANT") {
        config.remote.tenant = Some(val);
    }
    if let Some(token) = secret_string_opt(env("FERRY_REMOTE_TOKEN")) {
        config.remote.token = Some(token);
    }
    if let Some(timeout) = env_parsed("FERRY_REMOTE_TIMEOUT_SECONDS")? {
        config.remote.timeout_seconds = timeout;
    }
    if let Some(retries) = env_parsed("FERRY_REMOTE_RETRY_MAX_RETRIES")? {
        config.remote.retry.max_retries = retries;
    }

    // Cache overrides
    if let Some(capacity) = env_parsed("FERRY_CACHE_DEFAULT_CAPACITY")? {
        config.cache.default_capacity = capacity;
    }
    if let Some(ttl) = env_parsed("FERRY_CACHE_TTL_SECONDS")? {
        config.cache.ttl_seconds = Some(ttl);
    }

    // Publisher overrides
    if let Some(val) = env("FERRY_PUBLISHER_KIND") {
        config.publisher.kind = match val.to_lowercase().as_str() {
            "log" => PublisherKind::Log,
            "http" => PublisherKind::Http,
            other => {
                return Err(FerryError::Configuration(format!(
                    "Invalid FERRY_PUBLISHER_KIND '{other}'. Must be 'log' or 'http'"
                )))
            }
        };
    }
    if let Some(val) = env("FERRY_PUBLISHER_ENDPOINT") {
        config.publisher.endpoint = Some(val);
    }
    if let Some(val) = env("FERRY_PUBLISHER_TOPIC") {
        config.publisher.topic = val;
    }

    // Storage and rollback overrides
    if let Some(val) = env("FERRY_STORAGE_OUTPUT_DIR") {
        config.storage.output_dir = PathBuf::from(val);
    }
    if let Some(val) = env("FERRY_ROLLBACK_RESTORE_DIR") {
        config.rollback.restore_dir = PathBuf::from(val);
    }

    // Logging overrides
    if let Some(enabled) = env_parsed("FERRY_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Some(val) = env("FERRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("FERRY_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
