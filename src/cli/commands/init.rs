//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "ferry.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Ferry configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set FERRY_REMOTE_TENANT and FERRY_REMOTE_TOKEN");
                println!("  3. Validate configuration: ferry validate-config");
                println!("  4. Run export: ferry export <source>");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Ferry Configuration File

[application]
name = "ferry"
log_level = "info"
work_dir = "/tmp"

[remote]
base_url = "http://localhost:9130"
tenant = "${FERRY_REMOTE_TENANT}"
token = "${FERRY_REMOTE_TOKEN}"

[publisher]
kind = "log"

[storage]
output_dir = "./output"

[sources.circulation-log]
path = "audit-data/circulation/logs"
page_size = 100

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r##"# Ferry Configuration File
#
# This file contains all configuration options with examples and explanations.
# Values of the form ${VAR} are substituted from the environment, and any
# key can be overridden with FERRY_<SECTION>_<KEY>.

# Application Settings
[application]
# Application name (also the temp directory under work_dir)
name = "ferry"

# Log level (trace, debug, info, warn, error)
log_level = "info"

# Root for job temp files: <work_dir>/<name>/<jobId>-<source>*
work_dir = "/tmp"

# Remote Services
[remote]
# Base URL of the upstream REST services
base_url = "http://localhost:9130"

# Tenant and token sent with every request (use environment variables)
tenant = "${FERRY_REMOTE_TENANT}"
token = "${FERRY_REMOTE_TOKEN}"

# Request timeout in seconds
timeout_seconds = 60

[remote.retry]
# Attempts per request for connection errors, timeouts and 5xx responses
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# Reference Data Cache
[cache]
# Entries kept per reference kind
default_capacity = 1000

# Optional: expire entries after this many seconds
# ttl_seconds = 3600

# Per-kind capacities, keyed by cache name
[cache.capacities]
users = 5000
servicePoints = 200

# Job Status Publication
[publisher]
# "log" writes status records to the log, "http" POSTs them
kind = "log"
# endpoint = "http://localhost:8080/topics"
topic = "data-export.job.update"

# Output Storage
[storage]
output_dir = "./output"

# Update Job Rollback
[rollback]
restore_dir = "./restore"

# Completion Description
# Steps whose write counts are listed in the job description
[[notifier.described_steps]]
step = "chargeFeesFinesExportStep"
label = "# of charges"

[[notifier.described_steps]]
step = "refundFeesFinesExportStep"
label = "# of refunds"

# Sources
# Offset paging: offset/limit query parameters with a fixed stride
[sources.circulation-log]
path = "audit-data/circulation/logs"
pagination = "offset"
page_size = 100
records_field = "logRecords"
# query = "action==\"Checked out\""

# Resolve reference ids into readable names
[[sources.circulation-log.enrich]]
field = "servicePointId"
kind = "service-point"
target = "servicePointName"

# Cursor paging: the server returns the next upper bound
[sources.authority-stats]
path = "authority-storage/authorities"
pagination = "cursor"
page_size = 500
range_start = "2024-01-01T00:00:00Z"
range_end = "2024-12-31T23:59:59Z"
records_field = "authorities"
next_field = "next"

# Logging
[logging]
# Enable local JSON file logging
local_enabled = true

# Local log file directory
local_path = "./logs"

# Log rotation (daily, hourly or never)
local_rotation = "daily"
"##
        .to_string()
    }
}
