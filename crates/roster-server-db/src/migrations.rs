// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema migrations for the directory store.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Run all database migrations.
///
/// # Arguments
/// * `pool` - SQLite connection pool
///
/// # Errors
/// Returns `DbError::Sqlx` if a migration statement fails.
///
/// # Note
/// Migrations are idempotent - safe to run multiple times.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	let m1 = include_str!("../migrations/001_directory_users.sql");
	for stmt in m1.split(';').filter(|s| !s.trim().is_empty()) {
		if let Err(e) = sqlx::query(stmt).execute(pool).await {
			let msg = e.to_string();
			if !msg.contains("already exists") && !msg.contains("duplicate column") {
				return Err(e.into());
			}
		}
	}

	tracing::debug!("database migrations complete");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies that migrations can be re-run against an already-migrated
	/// database without erroring.
	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let pool = SqlitePool::connect(":memory:").await.unwrap();

		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM directory_users")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(count.0, 0);
	}
}
