// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HMAC-SHA256 webhook delivery signature utilities.
//!
//! Identity-provider deliveries are signed over the dot-joined content
//! `"{delivery_id}.{timestamp}.{body}"`. The timestamp is signed as the raw
//! header string, so formatting differences between sender and receiver can
//! never break verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Build the signed content for a delivery: `"{delivery_id}.{timestamp}."`
/// followed by the raw body bytes.
pub fn signed_content(delivery_id: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
	let mut content = Vec::with_capacity(delivery_id.len() + timestamp.len() + body.len() + 2);
	content.extend_from_slice(delivery_id.as_bytes());
	content.push(b'.');
	content.extend_from_slice(timestamp.as_bytes());
	content.push(b'.');
	content.extend_from_slice(body);
	content
}

/// Compute an HMAC-SHA256 signature for a payload.
///
/// Returns the hex-encoded signature without any prefix.
pub fn compute_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(payload);
	let result = mac.finalize();
	hex::encode(result.into_bytes())
}

/// Verify an HMAC-SHA256 signature for a payload.
///
/// The `signature` should be the raw hex-encoded signature (no prefix).
/// Comparison happens inside [`Mac::verify_slice`], which is constant-time;
/// a signature that is not valid hex verifies as false.
pub fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let expected_bytes = match hex::decode(signature) {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};

	let mut mac = match HmacSha256::new_from_slice(secret) {
		Ok(m) => m,
		Err(_) => return false,
	};

	mac.update(payload);
	mac.verify_slice(&expected_bytes).is_ok()
}

/// Compute the hex-encoded signature for a delivery's signed content.
pub fn compute_delivery_signature(
	secret: &[u8],
	delivery_id: &str,
	timestamp: &str,
	body: &[u8],
) -> String {
	compute_hmac_sha256(secret, &signed_content(delivery_id, timestamp, body))
}

/// Verify a delivery signature against the `(delivery_id, timestamp, body)`
/// tuple it claims to cover.
pub fn verify_delivery_signature(
	secret: &[u8],
	delivery_id: &str,
	timestamp: &str,
	body: &[u8],
	signature: &str,
) -> bool {
	verify_hmac_sha256(secret, &signed_content(delivery_id, timestamp, body), signature)
}
