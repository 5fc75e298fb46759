// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route definitions for webhook ingestion.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use roster_server_db::DirectoryStore;

use crate::handlers::{self, SyncState};
use crate::verify::SignatureVerifier;

/// Build the ingestion router.
///
/// `POST /webhooks/{provider}` accepts signed lifecycle deliveries. Passing
/// `verifier: None` keeps the route mounted but refuses every delivery as a
/// configuration error, without touching the store.
pub fn sync_routes(verifier: Option<Arc<SignatureVerifier>>, store: Arc<dyn DirectoryStore>) -> Router {
	let state = SyncState { verifier, store };

	Router::new()
		.route("/webhooks/{provider}", post(handlers::ingest_delivery))
		.with_state(state)
}
