// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory user repository for database operations.
//!
//! This module owns all writes to the `directory_users` table. Records are
//! keyed by the identity provider's `external_user_id` and soft-deleted via
//! `is_active`; every operation is a single conditional statement so that
//! re-delivered events resolve to no-ops instead of duplicate rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

/// Result of applying a lifecycle event to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
	/// The store was mutated.
	Applied,
	/// The store already reflected the event; nothing was written.
	NoOpAlreadyCurrent,
	/// The target record does not exist; nothing was written.
	NotFound,
}

/// Directory role assigned to a user record.
///
/// No lifecycle event in scope carries a role, so records always receive
/// [`DirectoryRole::Member`] on first creation and keep it thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryRole {
	#[default]
	Member,
	Admin,
}

impl DirectoryRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			DirectoryRole::Member => "member",
			DirectoryRole::Admin => "admin",
		}
	}

	pub fn parse(s: &str) -> Option<DirectoryRole> {
		match s {
			"member" => Some(DirectoryRole::Member),
			"admin" => Some(DirectoryRole::Admin),
			_ => None,
		}
	}
}

/// A user record synchronized from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
	pub id: Uuid,
	pub external_user_id: String,
	pub email: String,
	pub full_name: Option<String>,
	pub role: DirectoryRole,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
	async fn upsert_created(
		&self,
		external_user_id: &str,
		email: &str,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError>;
	async fn apply_update(
		&self,
		external_user_id: &str,
		email: Option<&str>,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError>;
	async fn apply_deletion(&self, external_user_id: &str) -> Result<SyncOutcome, DbError>;
	async fn get_by_external_id(
		&self,
		external_user_id: &str,
	) -> Result<Option<DirectoryUser>, DbError>;
	async fn health_check(&self) -> Result<(), DbError>;
}

/// Repository for directory user database operations.
///
/// All record IDs are UUIDs stored as strings in SQLite; timestamps are
/// RFC 3339 text.
#[derive(Clone)]
pub struct DirectoryRepository {
	pool: SqlitePool,
}

impl DirectoryRepository {
	/// Create a new repository with the given connection pool.
	///
	/// # Arguments
	/// * `pool` - SQLite connection pool
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Apply a `user.created` event.
	///
	/// Inserts a new active record with the default role, or - when a record
	/// for `external_user_id` already exists - updates its profile attributes
	/// in place. The insert and the conflict arm are one statement, so a
	/// concurrent creation race resolves as an update rather than a
	/// uniqueness violation.
	///
	/// # Arguments
	/// * `external_user_id` - Provider-assigned stable identifier
	/// * `email` - Contact address (required on creation events)
	/// * `full_name` - Optional display name; `None` leaves a stored value untouched
	///
	/// # Returns
	/// `Applied` when a row was inserted or changed, `NoOpAlreadyCurrent`
	/// when the record already carried these attributes.
	///
	/// # Database Constraints
	/// - `external_user_id` must be unique
	/// - the conflict arm never touches `role` or `is_active`, so a creation
	///   re-delivered for an inactive record does not reactivate it
	#[tracing::instrument(skip(self, email, full_name))]
	pub async fn upsert_created(
		&self,
		external_user_id: &str,
		email: &str,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO directory_users (
				id, external_user_id, email, full_name, role, is_active, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, 1, ?, ?)
			ON CONFLICT(external_user_id) DO UPDATE SET
				email = excluded.email,
				full_name = CASE
					WHEN excluded.full_name IS NOT NULL THEN excluded.full_name
					ELSE directory_users.full_name
				END,
				updated_at = excluded.updated_at
			WHERE directory_users.email <> excluded.email
				OR (excluded.full_name IS NOT NULL
					AND excluded.full_name IS NOT directory_users.full_name)
			"#,
		)
		.bind(Uuid::new_v4().to_string())
		.bind(external_user_id)
		.bind(email)
		.bind(full_name)
		.bind(DirectoryRole::default().as_str())
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		let outcome = if result.rows_affected() > 0 {
			SyncOutcome::Applied
		} else {
			SyncOutcome::NoOpAlreadyCurrent
		};
		tracing::debug!(external_user_id, outcome = ?outcome, "creation event applied");
		Ok(outcome)
	}

	/// Apply a `user.updated` event to an existing record.
	///
	/// An attribute passed as `None` was not provided by the event and leaves
	/// the stored value untouched; the merge happens inside the update
	/// statement itself, so concurrent partial updates to the same record
	/// both take effect. `role` and `is_active` are never modified by
	/// updates.
	///
	/// # Returns
	/// `NotFound` (with no write performed) when no record exists for
	/// `external_user_id`; otherwise `Applied` or `NoOpAlreadyCurrent`
	/// depending on whether the provided attributes differ.
	#[tracing::instrument(skip(self, email, full_name))]
	pub async fn apply_update(
		&self,
		external_user_id: &str,
		email: Option<&str>,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError> {
		if self.get_by_external_id(external_user_id).await?.is_none() {
			tracing::debug!(external_user_id, "update event for unknown record");
			return Ok(SyncOutcome::NotFound);
		}

		// The read above only classifies NotFound; rows are never physically
		// deleted, so existence still holds at write time. Absent attributes
		// coalesce against stored values inside the statement, and the WHERE
		// clause decides applied vs no-op.
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE directory_users
			SET email = COALESCE(?, email),
				full_name = COALESCE(?, full_name),
				updated_at = ?
			WHERE external_user_id = ?
				AND (email <> COALESCE(?, email)
					OR full_name IS NOT COALESCE(?, full_name))
			"#,
		)
		.bind(email)
		.bind(full_name)
		.bind(&now)
		.bind(external_user_id)
		.bind(email)
		.bind(full_name)
		.execute(&self.pool)
		.await?;

		let outcome = if result.rows_affected() > 0 {
			SyncOutcome::Applied
		} else {
			SyncOutcome::NoOpAlreadyCurrent
		};
		tracing::debug!(external_user_id, outcome = ?outcome, "update event applied");
		Ok(outcome)
	}

	/// Apply a `user.deleted` event by marking the record inactive.
	///
	/// Deleting an already-inactive or never-created record is a no-op, never
	/// an error, so provider retry loops always terminate.
	#[tracing::instrument(skip(self))]
	pub async fn apply_deletion(&self, external_user_id: &str) -> Result<SyncOutcome, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE directory_users
			SET is_active = 0, updated_at = ?
			WHERE external_user_id = ? AND is_active = 1
			"#,
		)
		.bind(&now)
		.bind(external_user_id)
		.execute(&self.pool)
		.await?;

		let outcome = if result.rows_affected() > 0 {
			SyncOutcome::Applied
		} else {
			SyncOutcome::NoOpAlreadyCurrent
		};
		tracing::debug!(external_user_id, outcome = ?outcome, "deletion event applied");
		Ok(outcome)
	}

	/// Get a directory record by the provider's stable identifier.
	///
	/// # Returns
	/// `None` if no record exists; inactive records are returned.
	#[tracing::instrument(skip(self))]
	pub async fn get_by_external_id(
		&self,
		external_user_id: &str,
	) -> Result<Option<DirectoryUser>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, external_user_id, email, full_name, role, is_active,
				   created_at, updated_at
			FROM directory_users
			WHERE external_user_id = ?
			"#,
		)
		.bind(external_user_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn health_check(&self) -> Result<(), DbError> {
		sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
		Ok(())
	}

	fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<DirectoryUser, DbError> {
		let id_str: String = row.get("id");
		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid record ID: {e}")))?;

		let role_str: String = row.get("role");
		let role = DirectoryRole::parse(&role_str)
			.ok_or_else(|| DbError::Internal(format!("Unknown role: {role_str}")))?;

		let created_at_str: String = row.get("created_at");
		let created_at = DateTime::parse_from_rfc3339(&created_at_str)
			.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
			.with_timezone(&Utc);

		let updated_at_str: String = row.get("updated_at");
		let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
			.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
			.with_timezone(&Utc);

		let is_active: i32 = row.get("is_active");

		Ok(DirectoryUser {
			id,
			external_user_id: row.get("external_user_id"),
			email: row.get("email"),
			full_name: row.get("full_name"),
			role,
			is_active: is_active != 0,
			created_at,
			updated_at,
		})
	}
}

#[async_trait]
impl DirectoryStore for DirectoryRepository {
	async fn upsert_created(
		&self,
		external_user_id: &str,
		email: &str,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError> {
		self.upsert_created(external_user_id, email, full_name).await
	}

	async fn apply_update(
		&self,
		external_user_id: &str,
		email: Option<&str>,
		full_name: Option<&str>,
	) -> Result<SyncOutcome, DbError> {
		self.apply_update(external_user_id, email, full_name).await
	}

	async fn apply_deletion(&self, external_user_id: &str) -> Result<SyncOutcome, DbError> {
		self.apply_deletion(external_user_id).await
	}

	async fn get_by_external_id(
		&self,
		external_user_id: &str,
	) -> Result<Option<DirectoryUser>, DbError> {
		self.get_by_external_id(external_user_id).await
	}

	async fn health_check(&self) -> Result<(), DbError> {
		self.health_check().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::migrations::run_migrations;
	use crate::testing::create_test_pool;
	use proptest::prelude::*;
	use sqlx::sqlite::SqlitePoolOptions;

	/// Verifies that a creation event inserts an active record with the
	/// default role.
	#[tokio::test]
	async fn test_upsert_created_inserts_new_record() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		let outcome = repo
			.upsert_created("u1", "a@x.com", Some("Ada Xu"))
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(user.external_user_id, "u1");
		assert_eq!(user.email, "a@x.com");
		assert_eq!(user.full_name.as_deref(), Some("Ada Xu"));
		assert_eq!(user.role, DirectoryRole::Member);
		assert!(user.is_active);
	}

	/// Verifies that re-delivering an identical creation event leaves exactly
	/// one record with nothing changed, including `updated_at`.
	#[tokio::test]
	async fn test_upsert_created_identical_redelivery_is_noop() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", Some("Ada Xu"))
			.await
			.unwrap();
		let before = repo.get_by_external_id("u1").await.unwrap().unwrap();

		let outcome = repo
			.upsert_created("u1", "a@x.com", Some("Ada Xu"))
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::NoOpAlreadyCurrent);

		let after = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(after.id, before.id);
		assert_eq!(after.updated_at, before.updated_at);
	}

	/// Verifies that a creation re-delivered with corrected attributes updates
	/// the existing row instead of duplicating it.
	#[tokio::test]
	async fn test_upsert_created_differing_email_updates_record() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();
		let before = repo.get_by_external_id("u1").await.unwrap().unwrap();

		let outcome = repo
			.upsert_created("u1", "corrected@x.com", None)
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let after = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(after.id, before.id, "conflict must not mint a new row");
		assert_eq!(after.email, "corrected@x.com");
		assert_eq!(after.created_at, before.created_at);
	}

	/// Verifies that a creation event omitting `full_name` preserves a
	/// previously stored value.
	#[tokio::test]
	async fn test_upsert_created_absent_full_name_preserves_stored_value() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", Some("Ada Xu"))
			.await
			.unwrap();

		let outcome = repo.upsert_created("u1", "a@x.com", None).await.unwrap();
		assert_eq!(outcome, SyncOutcome::NoOpAlreadyCurrent);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(user.full_name.as_deref(), Some("Ada Xu"));
	}

	/// Verifies that a creation event for an inactive record updates its
	/// attributes without reactivating it.
	#[tokio::test]
	async fn test_upsert_created_does_not_reactivate_inactive_record() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();
		repo.apply_deletion("u1").await.unwrap();

		let outcome = repo
			.upsert_created("u1", "new@x.com", None)
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(user.email, "new@x.com");
		assert!(!user.is_active, "creation conflict must not reactivate");
	}

	/// Verifies that an update for an unknown record reports `NotFound` and
	/// writes nothing.
	#[tokio::test]
	async fn test_apply_update_missing_record_returns_not_found() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		let outcome = repo
			.apply_update("ghost", Some("a@x.com"), None)
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::NotFound);
		assert!(repo.get_by_external_id("ghost").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_apply_update_changes_attributes() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();

		let outcome = repo
			.apply_update("u1", None, Some("A B"))
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(user.email, "a@x.com", "omitted attribute must not change");
		assert_eq!(user.full_name.as_deref(), Some("A B"));
	}

	/// Verifies that an update carrying only already-current values is a
	/// no-op and does not bump `updated_at`.
	#[tokio::test]
	async fn test_apply_update_identical_values_is_noop() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", Some("Ada Xu"))
			.await
			.unwrap();
		let before = repo.get_by_external_id("u1").await.unwrap().unwrap();

		let outcome = repo
			.apply_update("u1", Some("a@x.com"), Some("Ada Xu"))
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::NoOpAlreadyCurrent);

		let after = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(after.updated_at, before.updated_at);
	}

	#[tokio::test]
	async fn test_apply_update_on_inactive_record_updates_attributes() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();
		repo.apply_deletion("u1").await.unwrap();

		let outcome = repo
			.apply_update("u1", Some("new@x.com"), None)
			.await
			.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(user.email, "new@x.com");
		assert!(!user.is_active);
	}

	/// Verifies that concurrent partial updates to different attributes of
	/// the same record both take effect, whichever order their reads and
	/// writes interleave in.
	#[tokio::test]
	async fn test_apply_update_concurrent_partial_updates_both_take_effect() {
		// One connection so both tasks share the same in-memory database
		// and contend for it between their read and write statements.
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.connect(":memory:")
			.await
			.unwrap();
		run_migrations(&pool).await.unwrap();
		let repo = DirectoryRepository::new(pool);

		for round in 0..50 {
			let id = format!("u{round}");
			repo.upsert_created(&id, "old@x.com", Some("Old Name"))
				.await
				.unwrap();

			let new_email = format!("new{round}@x.com");
			let new_name = format!("New Name {round}");
			let (email_only, name_only) = tokio::join!(
				repo.apply_update(&id, Some(&new_email), None),
				repo.apply_update(&id, None, Some(&new_name)),
			);
			assert_eq!(email_only.unwrap(), SyncOutcome::Applied);
			assert_eq!(name_only.unwrap(), SyncOutcome::Applied);

			let user = repo.get_by_external_id(&id).await.unwrap().unwrap();
			assert_eq!(user.email, new_email, "email update did not survive");
			assert_eq!(
				user.full_name.as_deref(),
				Some(new_name.as_str()),
				"full_name update did not survive"
			);
		}
	}

	#[tokio::test]
	async fn test_apply_deletion_sets_inactive() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();

		let outcome = repo.apply_deletion("u1").await.unwrap();
		assert_eq!(outcome, SyncOutcome::Applied);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert!(!user.is_active);
	}

	/// Verifies that deletion is idempotent: a second delivery reports a
	/// no-op and the record stays inactive.
	#[tokio::test]
	async fn test_apply_deletion_repeat_is_noop() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		repo.upsert_created("u1", "a@x.com", None).await.unwrap();
		repo.apply_deletion("u1").await.unwrap();

		let outcome = repo.apply_deletion("u1").await.unwrap();
		assert_eq!(outcome, SyncOutcome::NoOpAlreadyCurrent);

		let user = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert!(!user.is_active);
	}

	/// Verifies that deleting a never-created record is a no-op, not an
	/// error.
	#[tokio::test]
	async fn test_apply_deletion_missing_record_is_noop() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		let outcome = repo.apply_deletion("ghost").await.unwrap();
		assert_eq!(outcome, SyncOutcome::NoOpAlreadyCurrent);
	}

	/// Walks a record through its full lifecycle: creation, profile update,
	/// deletion, and an idempotent re-delivered deletion.
	#[tokio::test]
	async fn test_full_lifecycle_create_update_delete_redeliver() {
		let pool = create_test_pool().await;
		let repo = DirectoryRepository::new(pool);

		assert_eq!(
			repo.upsert_created("u1", "a@x.com", None).await.unwrap(),
			SyncOutcome::Applied
		);
		let created = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert!(created.is_active);
		assert_eq!(created.email, "a@x.com");

		assert_eq!(
			repo.apply_update("u1", None, Some("A B")).await.unwrap(),
			SyncOutcome::Applied
		);
		let updated = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert_eq!(updated.id, created.id);
		assert_eq!(updated.email, "a@x.com");
		assert_eq!(updated.full_name.as_deref(), Some("A B"));

		assert_eq!(
			repo.apply_deletion("u1").await.unwrap(),
			SyncOutcome::Applied
		);
		let deleted = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert!(!deleted.is_active);

		assert_eq!(
			repo.apply_deletion("u1").await.unwrap(),
			SyncOutcome::NoOpAlreadyCurrent
		);
		let after = repo.get_by_external_id("u1").await.unwrap().unwrap();
		assert!(!after.is_active);
		assert_eq!(after.updated_at, deleted.updated_at);
	}

	proptest! {
		#[test]
		fn role_as_str_parse_round_trips(role in prop_oneof![
			Just(DirectoryRole::Member),
			Just(DirectoryRole::Admin),
		]) {
			prop_assert_eq!(DirectoryRole::parse(role.as_str()), Some(role));
		}

		#[test]
		fn unknown_role_strings_are_rejected(s in "[a-z]{1,12}") {
			prop_assume!(s != "member" && s != "admin");
			prop_assert_eq!(DirectoryRole::parse(&s), None);
		}
	}
}
