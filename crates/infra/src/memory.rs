//! In-memory claims store.
//!
//! Intended for tests/dev. A single async mutex stands in for the advisory
//! lock: every operation runs under it, which serializes the admin-count
//! check exactly like the Postgres transaction does. The store counts reads
//! so tests can assert that fresh credentials cause no store access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use clavis_auth::{Role, Scope, UserClaims};
use clavis_core::UserId;

use crate::claims_store::{ClaimsStore, ClaimsStoreError};

/// Identity record fields owned by this store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub role: Role,
    pub scopes: Vec<Scope>,
    pub token_version: u64,
}

impl UserRecord {
    pub fn new(role: Role, scopes: Vec<Scope>) -> Self {
        Self {
            role,
            scopes,
            token_version: 0,
        }
    }

    fn claims(&self) -> UserClaims {
        UserClaims {
            role: self.role,
            scopes: self.scopes.clone(),
            token_version: self.token_version,
        }
    }
}

/// In-memory claims store.
#[derive(Debug, Default)]
pub struct InMemoryClaimsStore {
    records: Mutex<HashMap<UserId, UserRecord>>,
    reads: AtomicU64,
}

impl InMemoryClaimsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: UserId, record: UserRecord) {
        self.records.lock().await.insert(user_id, record);
    }

    /// Number of `read` calls served so far (refresh reconciliations and
    /// strict re-verifications; mutations are not counted).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimsStore for InMemoryClaimsStore {
    async fn read(&self, user_id: UserId) -> Result<Option<UserClaims>, ClaimsStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;
        Ok(records.get(&user_id).map(UserRecord::claims))
    }

    async fn update_role_and_scopes(
        &self,
        user_id: UserId,
        role: Role,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError> {
        let mut records = self.records.lock().await;

        let current_role = match records.get(&user_id) {
            Some(record) => record.role,
            None => return Err(ClaimsStoreError::NotFound),
        };

        if current_role.is_admin() && !role.is_admin() {
            let admin_count = records.values().filter(|r| r.role.is_admin()).count();
            if admin_count <= 1 {
                return Err(ClaimsStoreError::CannotDemoteLastAdmin);
            }
        }

        let record = records.get_mut(&user_id).ok_or(ClaimsStoreError::NotFound)?;
        record.role = role;
        record.scopes = scopes;
        record.token_version += 1;
        Ok(record.claims())
    }

    async fn revoke(&self, user_id: UserId) -> Result<u64, ClaimsStoreError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(&user_id).ok_or(ClaimsStoreError::NotFound)?;
        record.token_version += 1;
        Ok(record.token_version)
    }

    async fn bootstrap_first_admin(
        &self,
        user_id: UserId,
        scopes: Vec<Scope>,
    ) -> Result<UserClaims, ClaimsStoreError> {
        let mut records = self.records.lock().await;

        if records.values().any(|r| r.role.is_admin()) {
            return Err(ClaimsStoreError::AlreadyInitialized);
        }

        let record = records.get_mut(&user_id).ok_or(ClaimsStoreError::NotFound)?;
        record.role = Role::Admin;
        record.scopes = scopes;
        record.token_version += 1;
        Ok(record.claims())
    }

    async fn has_any_admin(&self) -> Result<bool, ClaimsStoreError> {
        let records = self.records.lock().await;
        Ok(records.values().any(|r| r.role.is_admin()))
    }
}
