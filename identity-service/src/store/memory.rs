//! In-memory identity store.
//!
//! Record arena and credential index are concurrent maps; the edge table
//! sits behind a single `RwLock` so a batch of edge writes applies
//! atomically. Readers hold the guard only long enough to copy ids.

use std::collections::{BTreeSet, HashMap};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityStore, StoreError};
use crate::models::{AuthRecord, LinkEdge, RecipeKind};
use async_trait::async_trait;

type CredentialKey = (Uuid, RecipeKind, String);

#[derive(Default)]
struct EdgeTable {
    /// record id -> primary id (parent pointer; self for a designated root).
    parent: HashMap<Uuid, Uuid>,
    /// primary id -> member record ids (including the root's self-edge).
    members: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl EdgeTable {
    fn apply(&mut self, write: &LinkEdge) {
        if let Some(old) = self.parent.insert(write.record_id, write.primary_id) {
            if old != write.primary_id {
                if let Some(set) = self.members.get_mut(&old) {
                    set.remove(&write.record_id);
                    if set.is_empty() {
                        self.members.remove(&old);
                    }
                }
            }
        }
        self.members
            .entry(write.primary_id)
            .or_default()
            .insert(write.record_id);
    }

    fn remove(&mut self, record_id: Uuid) {
        if let Some(old) = self.parent.remove(&record_id) {
            if let Some(set) = self.members.get_mut(&old) {
                set.remove(&record_id);
                if set.is_empty() {
                    self.members.remove(&old);
                }
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<Uuid, AuthRecord>,
    credentials: DashMap<CredentialKey, Uuid>,
    edges: RwLock<EdgeTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn put_record(&self, record: AuthRecord) -> Result<Uuid, StoreError> {
        let key = (record.tenant_id, record.recipe, record.external_id.clone());
        match self.credentials.entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateRecord {
                recipe: record.recipe,
                external_id: record.external_id,
            }),
            Entry::Vacant(slot) => {
                // The arena insert comes first: a concurrent find_record
                // must never see a credential whose record is not there yet.
                let record_id = record.record_id;
                self.records.insert(record_id, record);
                slot.insert(record_id);
                Ok(record_id)
            }
        }
    }

    async fn get_record(&self, record_id: Uuid) -> Result<Option<AuthRecord>, StoreError> {
        Ok(self.records.get(&record_id).map(|r| r.clone()))
    }

    async fn find_record(
        &self,
        tenant_id: Uuid,
        recipe: RecipeKind,
        external_id: &str,
    ) -> Result<Option<AuthRecord>, StoreError> {
        let key = (tenant_id, recipe, external_id.to_string());
        let record_id = match self.credentials.get(&key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.records.get(&record_id).map(|r| r.clone()))
    }

    async fn get_edge(&self, record_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let edges = self.edges.read().await;
        Ok(edges.parent.get(&record_id).copied())
    }

    async fn put_edges(&self, writes: &[LinkEdge]) -> Result<(), StoreError> {
        let mut edges = self.edges.write().await;
        for write in writes {
            edges.apply(write);
        }
        Ok(())
    }

    async fn remove_edge(&self, record_id: Uuid) -> Result<(), StoreError> {
        let mut edges = self.edges.write().await;
        edges.remove(record_id);
        Ok(())
    }

    async fn list_records_by_primary(
        &self,
        primary_id: Uuid,
    ) -> Result<Vec<AuthRecord>, StoreError> {
        let mut ids: BTreeSet<Uuid> = {
            let edges = self.edges.read().await;
            edges.members.get(&primary_id).cloned().unwrap_or_default()
        };
        // An unlinked record is the whole group by itself.
        ids.insert(primary_id);

        Ok(ids
            .into_iter()
            .filter_map(|id| self.records.get(&id).map(|r| r.clone()))
            .collect())
    }

    async fn count_records(&self) -> Result<u64, StoreError> {
        Ok(self.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant: Uuid, email: &str) -> AuthRecord {
        AuthRecord::new_email_password(tenant, email.to_string())
    }

    #[tokio::test]
    async fn test_duplicate_credential_rejected() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        store.put_record(record(tenant, "a@example.com")).await.unwrap();

        let err = store
            .put_record(record(tenant, "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRecord { .. }));

        // Same credential in another tenant is a different record.
        store
            .put_record(record(Uuid::new_v4(), "a@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_edge_rewrite_moves_membership() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let a = store.put_record(record(tenant, "a@example.com")).await.unwrap();
        let p = store.put_record(record(tenant, "p@example.com")).await.unwrap();
        let q = store.put_record(record(tenant, "q@example.com")).await.unwrap();

        store
            .put_edges(&[LinkEdge::root(p), LinkEdge::new(a, p)])
            .await
            .unwrap();
        assert_eq!(store.get_edge(a).await.unwrap(), Some(p));
        assert_eq!(store.list_records_by_primary(p).await.unwrap().len(), 2);

        // Rewriting a's edge to q removes it from p's group atomically.
        store
            .put_edges(&[LinkEdge::root(q), LinkEdge::new(a, q)])
            .await
            .unwrap();
        assert_eq!(store.get_edge(a).await.unwrap(), Some(q));
        let p_group = store.list_records_by_primary(p).await.unwrap();
        assert_eq!(p_group.len(), 1);
        assert_eq!(store.list_records_by_primary(q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unlinked_record_is_its_own_group() {
        let store = MemoryStore::new();
        let id = store
            .put_record(record(Uuid::new_v4(), "solo@example.com"))
            .await
            .unwrap();

        assert_eq!(store.get_edge(id).await.unwrap(), None);
        let group = store.list_records_by_primary(id).await.unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].record_id, id);
    }

    #[tokio::test]
    async fn test_remove_edge_clears_membership() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let a = store.put_record(record(tenant, "a@example.com")).await.unwrap();
        let p = store.put_record(record(tenant, "p@example.com")).await.unwrap();

        store
            .put_edges(&[LinkEdge::root(p), LinkEdge::new(a, p)])
            .await
            .unwrap();
        store.remove_edge(a).await.unwrap();

        assert_eq!(store.get_edge(a).await.unwrap(), None);
        assert_eq!(store.list_records_by_primary(p).await.unwrap().len(), 1);
    }
}
