//! Persistence contract for the linking engine.
//!
//! Real deployments implement [`IdentityStore`] over their storage engine;
//! the engine itself never talks to a database directly. The in-memory
//! implementation in [`memory`] backs tests and embedded use.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthRecord, LinkEdge, RecipeKind};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate {recipe} record for external id {external_id}")]
    DuplicateRecord {
        recipe: RecipeKind,
        external_id: String,
    },

    /// Transient transaction contention; safe to retry.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Durable keyed storage for authentication records and link metadata.
///
/// Edge semantics: `get_edge` returns `None` for a record that was never
/// linked (it resolves to itself and is not a designated primary) and
/// `Some(primary_id)` otherwise; a designated group root returns its own id.
/// `list_records_by_primary` is indexed by primary id and must never scan;
/// callers pass a resolved group root (or an unlinked record's own id, for
/// which the record itself is the whole group).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Persist a new record. Fails with [`StoreError::DuplicateRecord`] if
    /// `(tenant_id, recipe, external_id)` is already taken.
    async fn put_record(&self, record: AuthRecord) -> Result<Uuid, StoreError>;

    async fn get_record(&self, record_id: Uuid) -> Result<Option<AuthRecord>, StoreError>;

    /// Look up a record by its recipe-scoped credential key.
    async fn find_record(
        &self,
        tenant_id: Uuid,
        recipe: RecipeKind,
        external_id: &str,
    ) -> Result<Option<AuthRecord>, StoreError>;

    async fn get_edge(&self, record_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Apply a batch of edge writes atomically: either every write lands or
    /// none does. This is the transaction boundary the link graph relies on
    /// to never expose a partially rewritten edge set.
    async fn put_edges(&self, writes: &[LinkEdge]) -> Result<(), StoreError>;

    async fn remove_edge(&self, record_id: Uuid) -> Result<(), StoreError>;

    async fn list_records_by_primary(
        &self,
        primary_id: Uuid,
    ) -> Result<Vec<AuthRecord>, StoreError>;

    /// Total number of stored records.
    async fn count_records(&self) -> Result<u64, StoreError>;
}
