//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Ferry configuration file.

use crate::config::{load_config, PublisherKind};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Application: {}", config.application.name);
                println!("  Log Level: {}", config.application.log_level);
                println!("  Work Dir: {}", config.application.work_dir.display());
                println!("  Remote: {}", config.remote.base_url);
                println!(
                    "  Tenant: {}",
                    config.remote.tenant.as_deref().unwrap_or("<none>")
                );
                println!(
                    "  Token: {}",
                    if config.remote.token.is_some() { "set" } else { "<none>" }
                );

                match config.publisher.kind {
                    PublisherKind::Log => println!("  Publisher: log"),
                    PublisherKind::Http => println!(
                        "  Publisher: http {}/{}",
                        config.publisher.endpoint.as_deref().unwrap_or_default(),
                        config.publisher.topic
                    ),
                }

                println!("  Cache Capacity: {}", config.cache.default_capacity);
                println!("  Output Dir: {}", config.storage.output_dir.display());
                println!("  Restore Dir: {}", config.rollback.restore_dir.display());
                println!("  Sources:");
                for (name, source) in &config.sources {
                    println!(
                        "    - {name}: {} ({:?}, page size {})",
                        source.path, source.pagination, source.page_size
                    );
                }
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}
