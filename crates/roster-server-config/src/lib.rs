// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Roster server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`ROSTER_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use roster_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Environment variable holding the webhook signing secret (`_FILE` variant
/// supported).
pub const WEBHOOK_SECRET_ENV: &str = "ROSTER_SERVER_WEBHOOK_SECRET";

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub webhook: WebhookConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ROSTER_SERVER_*`)
/// 2. Config file (`/etc/roster/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	let secret = roster_common_config::load_secret_env(WEBHOOK_SECRET_ENV)
		.map_err(|e| ConfigError::Secret(e.to_string()))?;
	let webhook = layer.webhook.unwrap_or_default().finalize(secret);

	validate_config(&webhook)?;

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		provider = %webhook.provider,
		tolerance_secs = webhook.tolerance_secs,
		secret_configured = webhook.secret.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		logging,
		webhook,
	})
}

/// Validate cross-field configuration rules.
///
/// The webhook secret is required here so a misconfigured deployment fails
/// at startup instead of rejecting every delivery with a 500.
fn validate_config(webhook: &WebhookConfig) -> Result<(), ConfigError> {
	match &webhook.secret {
		None => {
			return Err(ConfigError::Validation(format!(
				"webhook signing secret is not configured: set {WEBHOOK_SECRET_ENV} or \
				 {WEBHOOK_SECRET_ENV}_FILE"
			)));
		}
		Some(secret) if secret.expose().is_empty() => {
			return Err(ConfigError::Validation(format!(
				"webhook signing secret is empty: check {WEBHOOK_SECRET_ENV}"
			)));
		}
		Some(_) => {}
	}

	if webhook.tolerance_secs == 0 {
		return Err(ConfigError::Validation(
			"webhook.tolerance_secs must be at least 1; a zero window rejects every delivery"
				.to_string(),
		));
	}

	Ok(())
}
