//! Test helper module for identity-service integration tests.
//!
//! Provides an assembled in-memory engine plus record factories.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use identity_service::config::IdentityConfig;
use identity_service::models::{AuthRecord, LinkEdge, RecipeAttributes, RecipeKind};
use identity_service::services::Deadline;
use identity_service::store::{IdentityStore, MemoryStore, StoreError};
use identity_service::IdentityCore;
use service_core::async_trait::async_trait;
use uuid::Uuid;

/// Assembled engine over a fresh in-memory store.
pub struct TestCore {
    pub core: IdentityCore,
    pub tenant: Uuid,
}

impl TestCore {
    pub fn spawn() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn IdentityStore>) -> Self {
        service_core::observability::logging::try_init_tracing("identity-service", "warn");
        Self {
            core: IdentityCore::new(IdentityConfig::default(), store),
            tenant: Uuid::new_v4(),
        }
    }

    /// Sign up a third-party record in the default test tenant.
    pub async fn third_party_user(&self, provider_user_id: &str, email: &str) -> AuthRecord {
        self.third_party_user_in(self.tenant, provider_user_id, email)
            .await
    }

    pub async fn third_party_user_in(
        &self,
        tenant: Uuid,
        provider_user_id: &str,
        email: &str,
    ) -> AuthRecord {
        self.core
            .sign_in_up(
                tenant,
                RecipeKind::ThirdParty,
                provider_user_id,
                &RecipeAttributes::third_party("google", email),
                Deadline::none(),
            )
            .await
            .expect("sign in up failed")
            .record
    }

    /// Designate a record primary and link the rest beneath it.
    pub async fn group(&self, records: &[&AuthRecord]) -> Uuid {
        let primary = self
            .core
            .create_primary_user(records[0].record_id, Deadline::none())
            .await
            .expect("create primary failed");
        for record in &records[1..] {
            self.core
                .link_accounts(record.record_id, primary, Deadline::none())
                .await
                .expect("link failed");
        }
        primary
    }
}

/// Store wrapper that fails the first N edge batches with a transaction
/// conflict, for exercising the engine's retry path.
pub struct ConflictInjectingStore {
    inner: MemoryStore,
    remaining: AtomicU32,
}

impl ConflictInjectingStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: AtomicU32::new(failures),
        }
    }

    fn take_failure(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl IdentityStore for ConflictInjectingStore {
    async fn put_record(&self, record: AuthRecord) -> Result<Uuid, StoreError> {
        self.inner.put_record(record).await
    }

    async fn get_record(&self, record_id: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        self.inner.get_record(record_id).await
    }

    async fn find_record(
        &self,
        tenant_id: Uuid,
        recipe: RecipeKind,
        external_id: &str,
    ) -> Result<Option<AuthRecord>, StoreError> {
        self.inner.find_record(tenant_id, recipe, external_id).await
    }

    async fn get_edge(&self, record_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.inner.get_edge(record_id).await
    }

    async fn put_edges(&self, writes: &[LinkEdge]) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Conflict("injected edge-batch conflict".into()));
        }
        self.inner.put_edges(writes).await
    }

    async fn remove_edge(&self, record_id: Uuid) -> Result<(), StoreError> {
        self.inner.remove_edge(record_id).await
    }

    async fn list_records_by_primary(
        &self,
        primary_id: Uuid,
    ) -> Result<Vec<AuthRecord>, StoreError> {
        self.inner.list_records_by_primary(primary_id).await
    }

    async fn count_records(&self) -> Result<u64, StoreError> {
        self.inner.count_records().await
    }
}
