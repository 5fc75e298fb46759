// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook ingestion configuration.
//!
//! The signing secret is deliberately absent from the layer: it is loaded
//! from `ROSTER_SERVER_WEBHOOK_SECRET` (or `..._SECRET_FILE`) at finalize
//! time and never read from a TOML file.

use roster_common_config::SecretString;
use serde::Deserialize;

const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Webhook ingestion configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct WebhookConfig {
	/// Label for the identity provider; appears in the ingestion path and
	/// request spans, never in routing decisions.
	pub provider: String,
	/// Acceptance window for delivery timestamps, in seconds, enforced in
	/// both directions around server time.
	pub tolerance_secs: u64,
	/// Shared signing secret. `None` means ingestion cannot verify anything;
	/// startup validation rejects that state.
	pub secret: Option<SecretString>,
}

impl Default for WebhookConfig {
	fn default() -> Self {
		Self {
			provider: "idp".to_string(),
			tolerance_secs: DEFAULT_TOLERANCE_SECS,
			secret: None,
		}
	}
}

/// Webhook configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfigLayer {
	#[serde(default)]
	pub provider: Option<String>,
	#[serde(default)]
	pub tolerance_secs: Option<u64>,
}

impl WebhookConfigLayer {
	pub fn merge(&mut self, other: WebhookConfigLayer) {
		if other.provider.is_some() {
			self.provider = other.provider;
		}
		if other.tolerance_secs.is_some() {
			self.tolerance_secs = other.tolerance_secs;
		}
	}

	pub fn finalize(self, secret: Option<SecretString>) -> WebhookConfig {
		WebhookConfig {
			provider: self.provider.unwrap_or_else(|| "idp".to_string()),
			tolerance_secs: self.tolerance_secs.unwrap_or(DEFAULT_TOLERANCE_SECS),
			secret,
		}
	}
}
