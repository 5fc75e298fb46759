// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Roster user directory synchronization server.
//!
//! This crate provides an HTTP server that ingests identity provider webhook
//! deliveries and keeps the local user directory table consistent with the
//! provider's view of each user.

pub mod api;
pub mod health;

pub use api::{create_app_state, create_router, AppState};
pub use roster_server_config::ServerConfig;
pub use roster_server_db::DirectoryRepository;
