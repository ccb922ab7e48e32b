//! Postgres-backed claims store.
//!
//! Role/scope mutations and the administrator-count check run inside a
//! transaction holding a `pg_advisory_xact_lock`, so concurrent demotions
//! cannot race past the count check. Plain reads never take the lock and run
//! concurrently with in-flight mutations (read-committed visibility is
//! sufficient). Rows are re-normalized on the way out, so downstream code
//! never sees malformed claims even if the table was touched out-of-band.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use clavis_auth::{Role, Scope, UserClaims, normalize_role, normalize_scopes, normalize_token_version};
use clavis_core::UserId;

use crate::claims_store::{ClaimsStore, ClaimsStoreError};

/// Advisory lock serializing the first-admin bootstrap.
const BOOTSTRAP_FIRST_ADMIN_LOCK_ID: i64 = 86_421_357;
/// Advisory lock serializing authorization updates (the admin-count check).
const ADMIN_AUTH_UPDATE_LOCK_ID: i64 = 86_421_358;

/// Postgres-backed claims store.
///
/// `PgPool` is `Send + Sync`; the store can be shared across tasks.
#[derive(Debug, Clone)]
pub struct PostgresClaimsStore {
    pool: PgPool,
}

impl PostgresClaimsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Apply the embedded migrations (users table + constraints).
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn claims_from_row(row: &sqlx::postgres::PgRow) -> Result<UserClaims, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let scopes: Vec<String> = row.try_get("scopes")?;
    let token_version: i64 = row.try_get("token_version")?;

    Ok(UserClaims {
        role: normalize_role(&role),
        scopes: normalize_scopes(scopes.iter().map(String::as_str)),
        token_version: normalize_token_version(Some(token_version)),
    })
}

#[async_trait]
impl ClaimsStore for PostgresClaimsStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn read(&self, user_id: UserId) -> Result<Option<UserClaims>, ClaimsStoreError> {
        let row = sqlx::query(
            r#"
            SELECT role, scopes, token_version
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(claims_from_row(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, scopes), fields(user_id = %user_id, role = %role))]
    async fn update_role_and_scopes(
        &self,
        user_id: UserId,
        role: Role,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ADMIN_AUTH_UPDATE_LOCK_ID)
            .execute(&mut *tx)
            .await?;

        let target = sqlx::query("SELECT role FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(target) = target else {
            return Err(ClaimsStoreError::NotFound);
        };

        let current_role = normalize_role(&target.try_get::<String, _>("role")?);
        if current_role.is_admin() && !role.is_admin() {
            let admin_count: i64 =
                sqlx::query_scalar("SELECT count(*) FROM users WHERE role = 'admin'")
                    .fetch_one(&mut *tx)
                    .await?;
            if admin_count <= 1 {
                // Dropping the transaction rolls back; no version bump.
                return Err(ClaimsStoreError::CannotDemoteLastAdmin);
            }
        }

        let scope_values: Vec<String> = scopes.iter().map(|s| s.as_str().to_string()).collect();
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET role = $2, scopes = $3, token_version = token_version + 1
            WHERE id = $1
            RETURNING role, scopes, token_version
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .bind(&scope_values)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(updated) = updated else {
            return Err(ClaimsStoreError::NotFound);
        };

        let claims = claims_from_row(&updated)?;
        tx.commit().await?;
        Ok(claims)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn revoke(&self, user_id: UserId) -> Result<u64, ClaimsStoreError> {
        // Role and scopes are untouched, so this cannot race the admin-count
        // invariant; a single-statement bump is already atomic.
        let row = sqlx::query(
            r#"
            UPDATE users
            SET token_version = token_version + 1
            WHERE id = $1
            RETURNING token_version
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(ClaimsStoreError::NotFound);
        };
        Ok(normalize_token_version(Some(row.try_get("token_version")?)))
    }

    #[instrument(skip(self, scopes), fields(user_id = %user_id))]
    async fn bootstrap_first_admin(
        &self,
        user_id: UserId,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BOOTSTRAP_FIRST_ADMIN_LOCK_ID)
            .execute(&mut *tx)
            .await?;

        let existing = sqlx::query("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(ClaimsStoreError::AlreadyInitialized);
        }

        let scope_values: Vec<String> = scopes.iter().map(|s| s.as_str().to_string()).collect();
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET role = 'admin', scopes = $2, token_version = token_version + 1
            WHERE id = $1
            RETURNING role, scopes, token_version
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&scope_values)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(updated) = updated else {
            return Err(ClaimsStoreError::NotFound);
        };

        let claims = claims_from_row(&updated)?;
        tx.commit().await?;
        Ok(claims)
    }

    async fn has_any_admin(&self) -> Result<bool, ClaimsStoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
