// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ingestion endpoint and per-event sync handlers.
//!
//! The endpoint runs every delivery through the same pipeline: authenticate,
//! parse, dispatch. Each recognized event maps to one conditional write in
//! the directory store, so a redelivered event converges to the same state
//! it produced the first time.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use roster_server_db::{DirectoryStore, SyncOutcome};

use crate::error::SyncError;
use crate::events::{parse_event, LifecycleEvent};
use crate::verify::{InboundDelivery, SignatureVerifier};

/// Shared state for the ingestion routes.
///
/// `verifier` is `None` when no signing secret was configured; deliveries
/// are then refused without touching the store.
#[derive(Clone)]
pub struct SyncState {
	pub verifier: Option<Arc<SignatureVerifier>>,
	pub store: Arc<dyn DirectoryStore>,
}

/// Acknowledgement body returned for every accepted delivery.
#[derive(Debug, Serialize)]
pub struct AckResponse {
	pub status: AckStatus,
}

/// What processing a delivery did to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
	/// The event changed directory state.
	Applied,
	/// The event was recognized but the directory was already current.
	NoOp,
	/// The event type is not handled by this service.
	Ignored,
}

/// Accept one provider delivery.
///
/// Pipeline order: configured secret, delivery headers, signature and
/// freshness, payload parse, dispatch. Anything rejected before dispatch
/// leaves the directory untouched.
#[axum::debug_handler]
pub async fn ingest_delivery(
	State(state): State<SyncState>,
	Path(provider): Path<String>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<AckResponse>, SyncError> {
	let verifier = state.verifier.as_ref().ok_or(SyncError::MissingSecret)?;

	let delivery = InboundDelivery::from_request(&headers, body)?;
	tracing::debug!(
		provider = %provider,
		delivery_id = %delivery.delivery_id,
		"received webhook delivery"
	);

	verifier.verify(&delivery)?;
	let event = parse_event(&delivery.raw_body)?;

	let status = match event {
		LifecycleEvent::UserCreated {
			external_user_id,
			email,
			full_name,
		} => {
			handle_user_created(
				state.store.as_ref(),
				&external_user_id,
				&email,
				full_name.as_deref(),
			)
			.await?
		}
		LifecycleEvent::UserUpdated {
			external_user_id,
			email,
			full_name,
		} => {
			handle_user_updated(
				state.store.as_ref(),
				&external_user_id,
				email.as_deref(),
				full_name.as_deref(),
			)
			.await?
		}
		LifecycleEvent::UserDeleted { external_user_id } => {
			handle_user_deleted(state.store.as_ref(), &external_user_id).await?
		}
		LifecycleEvent::Unrecognized { event_type } => {
			tracing::debug!(
				provider = %provider,
				event_type = %event_type,
				"acknowledging unrecognized event type"
			);
			AckStatus::Ignored
		}
	};

	tracing::info!(
		provider = %provider,
		delivery_id = %delivery.delivery_id,
		status = ?status,
		"delivery processed"
	);
	Ok(Json(AckResponse { status }))
}

/// Apply a `user.created` event.
///
/// Insert when the user is new; converge an existing record instead when the
/// provider redelivers or re-sends with changed attributes.
#[tracing::instrument(skip(store, email, full_name))]
async fn handle_user_created(
	store: &dyn DirectoryStore,
	external_user_id: &str,
	email: &str,
	full_name: Option<&str>,
) -> Result<AckStatus, SyncError> {
	match store.upsert_created(external_user_id, email, full_name).await? {
		SyncOutcome::Applied => Ok(AckStatus::Applied),
		SyncOutcome::NoOpAlreadyCurrent => Ok(AckStatus::NoOp),
		SyncOutcome::NotFound => Err(SyncError::RecordNotFound(external_user_id.to_string())),
	}
}

/// Apply a `user.updated` event to an existing record.
///
/// An update for an unknown user is a conflict: the provider delivered it
/// before (or instead of) the creation, and must retry after the record
/// exists.
#[tracing::instrument(skip(store, email, full_name))]
async fn handle_user_updated(
	store: &dyn DirectoryStore,
	external_user_id: &str,
	email: Option<&str>,
	full_name: Option<&str>,
) -> Result<AckStatus, SyncError> {
	match store.apply_update(external_user_id, email, full_name).await? {
		SyncOutcome::Applied => Ok(AckStatus::Applied),
		SyncOutcome::NoOpAlreadyCurrent => Ok(AckStatus::NoOp),
		SyncOutcome::NotFound => Err(SyncError::RecordNotFound(external_user_id.to_string())),
	}
}

/// Apply a `user.deleted` event.
///
/// Deletion deactivates rather than removes, and a deletion for an already
/// inactive or unknown user acknowledges as a no-op. Repeat deletes must
/// never error, or the provider would retry them forever.
#[tracing::instrument(skip(store))]
async fn handle_user_deleted(
	store: &dyn DirectoryStore,
	external_user_id: &str,
) -> Result<AckStatus, SyncError> {
	match store.apply_deletion(external_user_id).await? {
		SyncOutcome::Applied => Ok(AckStatus::Applied),
		SyncOutcome::NoOpAlreadyCurrent | SyncOutcome::NotFound => Ok(AckStatus::NoOp),
	}
}
