// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper type that prevents accidental logging of sensitive values.
//!
//! The [`Secret<T>`] type wraps sensitive values like the webhook signing
//! secret, ensuring they:
//!
//! - Never appear in logs (redacted Debug/Display)
//! - Are zeroized from memory on drop
//! - Require an explicit `.expose()` call to access the inner value
//!
//! # Example
//!
//! ```
//! use roster_common_secret::Secret;
//!
//! let signing_secret = Secret::new("whsec_0123456789".to_string());
//!
//! // Debug and Display are redacted
//! assert_eq!(format!("{:?}", signing_secret), "Secret(\"[REDACTED]\")");
//! assert_eq!(format!("{}", signing_secret), "[REDACTED]");
//!
//! // Must explicitly expose to use the value
//! assert_eq!(signing_secret.expose(), "whsec_0123456789");
//! ```
//!
//! When used with `tracing` structured logging, both `%secret` (Display) and
//! `?secret` (Debug) render as `[REDACTED]`, so a secret can never leak
//! through a log field.

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// # Features
///
/// - **Redacted Debug/Display**: Always prints `[REDACTED]` instead of the actual value
/// - **Zeroize on drop**: Memory is securely zeroed when the value is dropped
/// - **Explicit access**: No `Deref` impl; must call `.expose()` to get the inner value
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Convenience alias for the common case of secret strings.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	/// Create a new secret wrapper around the given value.
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Explicitly access the inner value.
	///
	/// Call sites must opt-in to seeing the secret by calling this method.
	/// This makes secret access visible in code review.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}
