// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod error;
pub mod events;
pub mod handlers;
pub mod routes;
pub mod verify;

pub use routes::sync_routes;
pub use verify::SignatureVerifier;
