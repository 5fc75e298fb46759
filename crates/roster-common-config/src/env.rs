// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable helpers for loading secrets.
//!
//! This module provides utilities for loading secrets from environment
//! variables with support for the `*_FILE` convention used by Docker secrets
//! and Kubernetes.

use std::path::PathBuf;
use std::{env, fs};

use roster_common_secret::Secret;
use thiserror::Error;

/// Errors that can occur when loading secrets from environment variables.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	/// Failed to read the secret file.
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The secret file path was empty.
	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from the environment using the `VAR` / `VAR_FILE` convention.
///
/// # Precedence
///
/// 1. If `{var}_FILE` is set, read the secret from that file path
/// 2. Otherwise, if `{var}` is set, use its value directly
/// 3. Otherwise, return `Ok(None)`
///
/// # File Format
///
/// When reading from a file a single trailing newline is stripped (common in
/// secret files); all other content is preserved as-is. This convention is
/// used by Docker secrets (`/run/secrets/`), Kubernetes secret mounts, and
/// Vault Agent file sinks.
///
/// # Example
///
/// ```no_run
/// use roster_common_config::load_secret_env;
///
/// // If ROSTER_SERVER_WEBHOOK_SECRET_FILE=/run/secrets/webhook is set,
/// // reads the secret from that file.
/// // Otherwise, if ROSTER_SERVER_WEBHOOK_SECRET=whsec_xxx is set, uses that.
/// let secret = load_secret_env("ROSTER_SERVER_WEBHOOK_SECRET")?;
///
/// if let Some(secret) = secret {
///     println!("webhook secret configured: {}", secret); // prints "[REDACTED]"
///     // Use secret.expose() when the value is actually needed
/// }
/// # Ok::<(), roster_common_config::SecretEnvError>(())
/// ```
pub fn load_secret_env(var: &str) -> Result<Option<Secret<String>>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(Secret::new(secret)));
	}

	if let Ok(value) = env::var(var) {
		return Ok(Some(Secret::new(value)));
	}

	Ok(None)
}

/// Load a required secret from the environment.
///
/// Convenience wrapper around [`load_secret_env`] that returns an error if
/// neither `VAR` nor `VAR_FILE` is set.
pub fn require_secret_env(var: &str) -> Result<Secret<String>, RequiredSecretError> {
	load_secret_env(var)
		.map_err(RequiredSecretError::Load)?
		.ok_or_else(|| RequiredSecretError::Missing {
			var: var.to_string(),
			file_var: format!("{var}_FILE"),
		})
}

/// Error returned when a required secret is not found.
#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}
