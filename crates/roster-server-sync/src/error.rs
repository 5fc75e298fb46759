// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pipeline error types and HTTP response conversions.
//!
//! The status code class is the only thing the provider's retry logic keys
//! on: 4xx responses other than 409 are terminal for a delivery, 5xx
//! responses are retried, and 409 signals ordering drift the provider
//! resolves by re-delivering.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;

use roster_server_db::DbError;

/// Errors produced while processing one inbound delivery.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	/// One or more delivery headers are absent.
	#[error("Missing required headers: {0}")]
	MissingHeaders(String),

	/// The server-side signing secret is not configured.
	#[error("Webhook signing secret is not configured")]
	MissingSecret,

	/// The supplied signature does not match the signed content.
	#[error("Delivery signature verification failed")]
	SignatureMismatch,

	/// The delivery timestamp falls outside the acceptance window.
	#[error("Delivery timestamp outside acceptance window")]
	StaleTimestamp,

	/// The payload could not be decoded into a lifecycle event.
	#[error("Malformed payload: {0}")]
	MalformedPayload(String),

	/// A recognized event omitted a field it is required to carry.
	#[error("Missing required field: {0}")]
	MissingRequiredField(&'static str),

	/// An update event arrived before the record it targets was created.
	#[error("No directory record for external user id: {0}")]
	RecordNotFound(String),

	/// The directory store could not be reached or failed.
	#[error("Storage unavailable: {0}")]
	StorageUnavailable(#[from] DbError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl IntoResponse for SyncError {
	fn into_response(self) -> Response {
		let (status, error_response) = match &self {
			SyncError::MissingHeaders(names) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "missing_headers".to_string(),
					message: format!("Missing required headers: {names}"),
				},
			),
			SyncError::MissingSecret => {
				tracing::error!("webhook signing secret is not configured");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse {
						error: "missing_secret".to_string(),
						message: "Webhook signing secret is not configured on the server".to_string(),
					},
				)
			}
			// Never echo signature material back to the caller.
			SyncError::SignatureMismatch => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "signature_mismatch".to_string(),
					message: "Delivery signature verification failed".to_string(),
				},
			),
			SyncError::StaleTimestamp => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "stale_timestamp".to_string(),
					message: "Delivery timestamp outside acceptance window".to_string(),
				},
			),
			SyncError::MalformedPayload(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "malformed_payload".to_string(),
					message: format!("Malformed payload: {msg}"),
				},
			),
			SyncError::MissingRequiredField(field) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse {
					error: "missing_required_field".to_string(),
					message: format!("Missing required field: {field}"),
				},
			),
			SyncError::RecordNotFound(id) => {
				tracing::warn!(external_user_id = %id, "update delivered before creation");
				(
					StatusCode::CONFLICT,
					ErrorResponse {
						error: "record_not_found".to_string(),
						message: format!("No directory record for external user id: {id}"),
					},
				)
			}
			SyncError::StorageUnavailable(e) => {
				tracing::error!(error = %e, "storage error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse {
						error: "storage_unavailable".to_string(),
						message: "A storage error occurred".to_string(),
					},
				)
			}
		};

		(status, Json(error_response)).into_response()
	}
}
