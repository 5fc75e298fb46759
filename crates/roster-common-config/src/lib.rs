// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Common configuration primitives for Roster.
//!
//! This crate provides shared helpers for configuration across the Roster
//! crates:
//!
//! - [`load_secret_env`]: load a secret from environment variables with
//!   `*_FILE` support
//! - [`Secret<T>`]: wrapper type that prevents accidental logging of
//!   sensitive values (re-exported from [`roster_common_secret`])

pub mod env;

// Re-export Secret types for convenience
pub use roster_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};
