// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery authentication for inbound webhooks.
//!
//! Every delivery carries three headers: `delivery-id`, `delivery-timestamp`
//! and `delivery-signature`. The signature is an HMAC-SHA256 tag over the
//! dot-joined signed content (see `roster-common-webhook`); the timestamp is
//! unix seconds and doubles as replay protection via the acceptance window.

use axum::body::Bytes;
use axum::http::HeaderMap;
use chrono::Utc;
use roster_common_secret::SecretString;
use roster_common_webhook::verify_delivery_signature;

use crate::error::SyncError;

pub const DELIVERY_ID_HEADER: &str = "delivery-id";
pub const DELIVERY_TIMESTAMP_HEADER: &str = "delivery-timestamp";
pub const DELIVERY_SIGNATURE_HEADER: &str = "delivery-signature";

/// One provider delivery attempt, as read off the wire.
///
/// Created at request arrival and discarded after processing; never
/// persisted.
#[derive(Debug)]
pub struct InboundDelivery {
	pub delivery_id: String,
	/// The raw `delivery-timestamp` header value. Kept as a string because
	/// the signature covers the exact bytes the provider sent.
	pub timestamp: String,
	pub signature: String,
	pub raw_body: Bytes,
}

impl InboundDelivery {
	/// Read the delivery headers off a request.
	///
	/// # Errors
	/// Returns `SyncError::MissingHeaders` naming every absent header, so a
	/// misconfigured provider can be fixed in one round trip.
	pub fn from_request(headers: &HeaderMap, raw_body: Bytes) -> Result<InboundDelivery, SyncError> {
		let mut missing = Vec::new();
		let delivery_id = header_value(headers, DELIVERY_ID_HEADER, &mut missing);
		let timestamp = header_value(headers, DELIVERY_TIMESTAMP_HEADER, &mut missing);
		let signature = header_value(headers, DELIVERY_SIGNATURE_HEADER, &mut missing);

		match (delivery_id, timestamp, signature) {
			(Some(delivery_id), Some(timestamp), Some(signature)) => Ok(InboundDelivery {
				delivery_id,
				timestamp,
				signature,
				raw_body,
			}),
			_ => Err(SyncError::MissingHeaders(missing.join(", "))),
		}
	}
}

fn header_value(
	headers: &HeaderMap,
	name: &'static str,
	missing: &mut Vec<&'static str>,
) -> Option<String> {
	match headers.get(name).and_then(|v| v.to_str().ok()) {
		Some(value) => Some(value.to_string()),
		None => {
			missing.push(name);
			None
		}
	}
}

/// Verifies that an inbound delivery genuinely originated from the identity
/// provider and is fresh enough to process.
///
/// The signing secret is injected at construction rather than read from
/// ambient state, so tests can run with distinct secrets side by side.
pub struct SignatureVerifier {
	secret: SecretString,
	tolerance_secs: u64,
}

impl SignatureVerifier {
	/// Create a verifier for the given secret and acceptance window.
	///
	/// # Arguments
	/// * `secret` - Shared signing secret agreed with the provider
	/// * `tolerance_secs` - Accepted clock skew in seconds, in both directions
	pub fn new(secret: SecretString, tolerance_secs: u64) -> Self {
		Self {
			secret,
			tolerance_secs,
		}
	}

	/// Verify a delivery against the configured secret and window.
	///
	/// Order is signature first, then freshness. Both checks must pass; a
	/// delivery is never trusted on signature alone.
	///
	/// # Errors
	/// `SignatureMismatch` when the tag does not cover this exact
	/// `(delivery_id, timestamp, body)` tuple (a non-hex signature is a
	/// mismatch, not a parse error), `StaleTimestamp` when the timestamp is
	/// non-numeric or outside the window.
	pub fn verify(&self, delivery: &InboundDelivery) -> Result<(), SyncError> {
		self.verify_at(delivery, Utc::now().timestamp())
	}

	fn verify_at(&self, delivery: &InboundDelivery, now_unix: i64) -> Result<(), SyncError> {
		let authentic = verify_delivery_signature(
			self.secret.expose().as_bytes(),
			&delivery.delivery_id,
			&delivery.timestamp,
			&delivery.raw_body,
			&delivery.signature,
		);
		if !authentic {
			return Err(SyncError::SignatureMismatch);
		}

		let sent_at: i64 = delivery
			.timestamp
			.parse()
			.map_err(|_| SyncError::StaleTimestamp)?;
		if now_unix.abs_diff(sent_at) > self.tolerance_secs {
			return Err(SyncError::StaleTimestamp);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use roster_common_secret::Secret;
	use roster_common_webhook::compute_delivery_signature;

	const TEST_SECRET: &str = "whsec_test_0123456789";
	const TOLERANCE: u64 = 300;

	fn verifier() -> SignatureVerifier {
		SignatureVerifier::new(Secret::new(TEST_SECRET.to_string()), TOLERANCE)
	}

	fn signed_delivery(delivery_id: &str, timestamp: &str, body: &[u8]) -> InboundDelivery {
		let signature =
			compute_delivery_signature(TEST_SECRET.as_bytes(), delivery_id, timestamp, body);
		InboundDelivery {
			delivery_id: delivery_id.to_string(),
			timestamp: timestamp.to_string(),
			signature,
			raw_body: Bytes::copy_from_slice(body),
		}
	}

	#[test]
	fn test_valid_delivery_verifies() {
		let delivery = signed_delivery("msg_1", "1700000000", b"{}");
		let result = verifier().verify_at(&delivery, 1_700_000_010);
		assert!(result.is_ok());
	}

	#[test]
	fn test_tampered_body_is_mismatch() {
		let mut delivery = signed_delivery("msg_1", "1700000000", b"{\"a\":1}");
		delivery.raw_body = Bytes::from_static(b"{\"a\":2}");
		let result = verifier().verify_at(&delivery, 1_700_000_010);
		assert!(matches!(result, Err(SyncError::SignatureMismatch)));
	}

	#[test]
	fn test_wrong_secret_is_mismatch() {
		let delivery = signed_delivery("msg_1", "1700000000", b"{}");
		let other = SignatureVerifier::new(Secret::new("other-secret".to_string()), TOLERANCE);
		let result = other.verify_at(&delivery, 1_700_000_010);
		assert!(matches!(result, Err(SyncError::SignatureMismatch)));
	}

	#[test]
	fn test_non_hex_signature_is_mismatch() {
		let mut delivery = signed_delivery("msg_1", "1700000000", b"{}");
		delivery.signature = "not-valid-hex".to_string();
		let result = verifier().verify_at(&delivery, 1_700_000_010);
		assert!(matches!(result, Err(SyncError::SignatureMismatch)));
	}

	/// Verifies that a correctly signed delivery is still rejected when its
	/// timestamp is too old.
	#[test]
	fn test_stale_timestamp_rejected_despite_valid_signature() {
		let delivery = signed_delivery("msg_1", "1700000000", b"{}");
		let now = 1_700_000_000 + TOLERANCE as i64 + 1;
		let result = verifier().verify_at(&delivery, now);
		assert!(matches!(result, Err(SyncError::StaleTimestamp)));
	}

	/// Verifies that the window is enforced in both directions: a timestamp
	/// too far in the future is also rejected.
	#[test]
	fn test_future_timestamp_rejected() {
		let delivery = signed_delivery("msg_1", "1700000000", b"{}");
		let now = 1_700_000_000 - TOLERANCE as i64 - 1;
		let result = verifier().verify_at(&delivery, now);
		assert!(matches!(result, Err(SyncError::StaleTimestamp)));
	}

	#[test]
	fn test_timestamp_at_window_edge_accepted() {
		let delivery = signed_delivery("msg_1", "1700000000", b"{}");
		let now = 1_700_000_000 + TOLERANCE as i64;
		assert!(verifier().verify_at(&delivery, now).is_ok());
	}

	/// Verifies that a non-numeric timestamp is treated as stale, not as a
	/// parse failure, once the signature itself checks out.
	#[test]
	fn test_non_numeric_timestamp_is_stale() {
		let delivery = signed_delivery("msg_1", "yesterday", b"{}");
		let result = verifier().verify_at(&delivery, 1_700_000_000);
		assert!(matches!(result, Err(SyncError::StaleTimestamp)));
	}

	#[test]
	fn test_from_request_with_all_headers() {
		let mut headers = HeaderMap::new();
		headers.insert(DELIVERY_ID_HEADER, "msg_1".parse().unwrap());
		headers.insert(DELIVERY_TIMESTAMP_HEADER, "1700000000".parse().unwrap());
		headers.insert(DELIVERY_SIGNATURE_HEADER, "abcd".parse().unwrap());

		let delivery = InboundDelivery::from_request(&headers, Bytes::from_static(b"{}")).unwrap();
		assert_eq!(delivery.delivery_id, "msg_1");
		assert_eq!(delivery.timestamp, "1700000000");
		assert_eq!(delivery.signature, "abcd");
	}

	/// Verifies that every absent header is named in the error.
	#[test]
	fn test_from_request_names_all_missing_headers() {
		let headers = HeaderMap::new();
		let err = InboundDelivery::from_request(&headers, Bytes::new()).unwrap_err();
		match err {
			SyncError::MissingHeaders(names) => {
				assert!(names.contains(DELIVERY_ID_HEADER));
				assert!(names.contains(DELIVERY_TIMESTAMP_HEADER));
				assert!(names.contains(DELIVERY_SIGNATURE_HEADER));
			}
			other => panic!("expected MissingHeaders, got {other:?}"),
		}
	}

	#[test]
	fn test_from_request_names_only_missing_headers() {
		let mut headers = HeaderMap::new();
		headers.insert(DELIVERY_ID_HEADER, "msg_1".parse().unwrap());

		let err = InboundDelivery::from_request(&headers, Bytes::new()).unwrap_err();
		match err {
			SyncError::MissingHeaders(names) => {
				assert!(!names.contains(DELIVERY_ID_HEADER));
				assert!(names.contains(DELIVERY_TIMESTAMP_HEADER));
				assert!(names.contains(DELIVERY_SIGNATURE_HEADER));
			}
			other => panic!("expected MissingHeaders, got {other:?}"),
		}
	}

	proptest! {
		/// Verifies that verification succeeds exactly when the signature was
		/// computed over the same tuple with the same secret.
		#[test]
		fn prop_verifier_accepts_what_the_provider_signs(
			delivery_id in "[a-zA-Z0-9_-]{1,40}",
			timestamp in 1_500_000_000i64..2_000_000_000,
			body in proptest::collection::vec(proptest::num::u8::ANY, 0..500)
		) {
			let delivery = signed_delivery(&delivery_id, &timestamp.to_string(), &body);
			prop_assert!(verifier().verify_at(&delivery, timestamp).is_ok());
		}

		#[test]
		fn prop_wrong_delivery_id_fails(
			delivery_id in "[a-zA-Z0-9_]{1,40}",
			other_id in "[a-zA-Z0-9_]{1,40}",
			timestamp in 1_500_000_000i64..2_000_000_000,
			body in proptest::collection::vec(proptest::num::u8::ANY, 1..500)
		) {
			prop_assume!(delivery_id != other_id);
			let mut delivery = signed_delivery(&delivery_id, &timestamp.to_string(), &body);
			delivery.delivery_id = other_id;
			prop_assert!(matches!(
				verifier().verify_at(&delivery, timestamp),
				Err(SyncError::SignatureMismatch)
			));
		}
	}
}
