// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle event parsing.
//!
//! Translates a verified delivery body into a typed [`LifecycleEvent`].
//! Parsing is deliberately tolerant of unknown event types: providers add
//! types over time, and an unknown type must be acknowledged rather than
//! retried forever. Field validation only applies to recognized types.

use serde::Deserialize;

use crate::error::SyncError;

/// Wire shape of a provider event body. All attribute fields are optional at
/// this level; [`parse_event`] enforces per-type requirements.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload {
	event_type: String,
	#[serde(default)]
	external_user_id: Option<String>,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	full_name: Option<String>,
}

/// A provider lifecycle event, validated for its type.
///
/// Each variant carries exactly the fields its handler needs, so a
/// constructed event is always complete: `UserCreated` cannot exist without
/// an email, and no handler re-checks presence.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
	UserCreated {
		external_user_id: String,
		email: String,
		full_name: Option<String>,
	},
	UserUpdated {
		external_user_id: String,
		email: Option<String>,
		full_name: Option<String>,
	},
	UserDeleted {
		external_user_id: String,
	},
	/// An event type this service does not handle. Carried through so the
	/// endpoint can acknowledge it and log what arrived.
	Unrecognized {
		event_type: String,
	},
}

/// Treat absent and empty-string attributes identically.
fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}

/// Parse a raw delivery body into a [`LifecycleEvent`].
///
/// # Errors
/// `MalformedPayload` when the body is not a JSON object with a string
/// `eventType`; `MissingRequiredField` when a recognized type lacks its
/// identifying fields. Unrecognized types never fail validation.
pub fn parse_event(raw_body: &[u8]) -> Result<LifecycleEvent, SyncError> {
	let payload: WirePayload =
		serde_json::from_slice(raw_body).map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

	let external_user_id = non_empty(payload.external_user_id);
	let email = non_empty(payload.email);
	let full_name = non_empty(payload.full_name);

	match payload.event_type.as_str() {
		"user.created" => Ok(LifecycleEvent::UserCreated {
			external_user_id: external_user_id
				.ok_or(SyncError::MissingRequiredField("externalUserId"))?,
			email: email.ok_or(SyncError::MissingRequiredField("email"))?,
			full_name,
		}),
		"user.updated" => Ok(LifecycleEvent::UserUpdated {
			external_user_id: external_user_id
				.ok_or(SyncError::MissingRequiredField("externalUserId"))?,
			email,
			full_name,
		}),
		"user.deleted" => Ok(LifecycleEvent::UserDeleted {
			external_user_id: external_user_id
				.ok_or(SyncError::MissingRequiredField("externalUserId"))?,
		}),
		_ => Ok(LifecycleEvent::Unrecognized {
			event_type: payload.event_type,
		}),
	}
}
