// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # roster-server-db
//!
//! Persistence layer for the roster server using SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! The directory domain has two components:
//! - **[`DirectoryStore`] trait**: the interface the sync pipeline depends on
//! - **[`DirectoryRepository`] struct**: concrete implementation holding a `SqlitePool`
//!
//! Handlers take `Arc<dyn DirectoryStore>` so tests can substitute fakes.
//!
//! ## Error Handling
//!
//! Use [`DbError`] variants appropriately:
//! - `Sqlx` - let sqlx errors propagate via `?` for unexpected database errors
//! - `Internal` - invalid stored data (e.g., unparseable UUID or timestamp)
//!
//! Absence of a record is not an error at this layer: lookups return
//! `Result<Option<T>>` and mutations report it through
//! [`SyncOutcome::NotFound`].
//!
//! ## Testing
//!
//! Tests use in-memory SQLite pools with the real migrations applied
//! (`testing::create_test_pool`). Prefer property-based tests (`proptest`)
//! for pure codec/enum invariants.

pub mod directory;
mod error;
pub mod migrations;
pub mod pool;

#[cfg(test)]
pub mod testing;

pub use directory::{
	DirectoryRepository, DirectoryRole, DirectoryStore, DirectoryUser, SyncOutcome,
};
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
