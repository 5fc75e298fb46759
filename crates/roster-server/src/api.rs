// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use roster_server_config::ServerConfig;
use roster_server_db::DirectoryStore;
use roster_server_sync::{sync_routes, SignatureVerifier};

use crate::health;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<dyn DirectoryStore>,
	pub verifier: Option<Arc<SignatureVerifier>>,
}

/// Creates the application state from resolved configuration.
///
/// Configuration loading already refuses to start without a signing secret,
/// so `verifier` is `Some` in any normally started server. The `None` path
/// exists so the router can still be assembled in tests and degraded
/// deployments; deliveries are then refused per request.
pub fn create_app_state(store: Arc<dyn DirectoryStore>, config: &ServerConfig) -> AppState {
	let verifier = config
		.webhook
		.secret
		.clone()
		.map(|secret| Arc::new(SignatureVerifier::new(secret, config.webhook.tolerance_secs)));

	if verifier.is_some() {
		tracing::info!(
			provider = %config.webhook.provider,
			tolerance_secs = config.webhook.tolerance_secs,
			"webhook ingestion configured"
		);
	} else {
		tracing::warn!("webhook signing secret not configured, deliveries will be refused");
	}

	AppState { store, verifier }
}

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health::health_check))
		.with_state(state.clone())
		.merge(sync_routes(state.verifier, state.store))
}
