//! Link graph - owns the linking/unlinking algorithm and its invariants.
//!
//! Union-find over the store's edge table with eager path compression on
//! every link: edges always point directly at the group root, so resolving
//! any record costs a single edge read regardless of link history depth.
//! Lookups dominate writes in a running identity service, which is why
//! compression happens on link rather than lazily on find.

use std::sync::Arc;

use dashmap::DashMap;
use service_core::retry::{retry_with_backoff, RetryConfig};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{AuthRecord, LinkEdge};
use crate::store::{IdentityStore, StoreError};

use super::deadline::Deadline;
use super::error::ServiceError;

/// Bound on lock-revalidation rounds before reporting contention.
const MAX_ROOT_REVALIDATIONS: u32 = 8;

/// Maintains the many-to-one mapping from records to primary identities.
///
/// Mutations serialize through per-root async locks acquired in sorted key
/// order, so two concurrent calls touching overlapping groups never race;
/// reads take no locks at all.
#[derive(Clone)]
pub struct LinkGraph {
    store: Arc<dyn IdentityStore>,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    retry: RetryConfig,
}

impl LinkGraph {
    pub fn new(store: Arc<dyn IdentityStore>, retry: RetryConfig) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            retry,
        }
    }

    /// Designate `record_id` as the root of a new single-member group.
    ///
    /// Calling this on a record that is already a designated root returns
    /// the existing primary id instead of failing, so at-least-once callers
    /// never see spurious errors.
    pub async fn create_primary_user(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<Uuid, ServiceError> {
        const OP: &str = "create_primary_user";
        deadline.check(OP)?;

        self.fetch_record(record_id, OP, deadline).await?;

        let _guard = self.lock_keys(vec![record_id], OP, deadline).await?;
        match deadline.bound(OP, self.store.get_edge(record_id)).await?? {
            None => {
                self.write_edges(&[LinkEdge::root(record_id)], OP, deadline)
                    .await?;
                tracing::info!(record_id = %record_id, "Primary user created");
                Ok(record_id)
            }
            Some(primary_id) if primary_id == record_id => Ok(record_id),
            Some(primary_id) => Err(ServiceError::AlreadyLinked {
                record_id,
                primary_id,
            }),
        }
    }

    /// Make `record_id`'s group join `primary_id`'s group.
    ///
    /// `primary_id` must currently be a designated root; `record_id` may be
    /// an unlinked record or the lone root of a single-member group (which
    /// demotes it to a member). The rewritten edges point directly at
    /// `primary_id`.
    pub async fn link_accounts(
        &self,
        record_id: Uuid,
        primary_id: Uuid,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        const OP: &str = "link_accounts";
        deadline.check(OP)?;

        let child = self.fetch_record(record_id, OP, deadline).await?;
        let primary = self.fetch_record(primary_id, OP, deadline).await?;
        if child.tenant_id != primary.tenant_id {
            return Err(ServiceError::TenantMismatch);
        }

        let _guards = self
            .lock_group_roots(&[record_id, primary_id], OP, deadline)
            .await?;

        // Preconditions, evaluated under the locks.
        match deadline.bound(OP, self.store.get_edge(primary_id)).await?? {
            Some(root) if root == primary_id => {}
            _ => return Err(ServiceError::InputIsNotAPrimaryUser(primary_id)),
        }

        match deadline.bound(OP, self.store.get_edge(record_id)).await?? {
            Some(root) if root == primary_id => {
                return Err(ServiceError::AccountsAlreadyLinked(record_id, primary_id));
            }
            Some(root) if root == record_id => {
                // The child is itself a designated root; only a lone root
                // may be demoted to a member.
                let members = deadline
                    .bound(OP, self.store.list_records_by_primary(record_id))
                    .await??;
                if members.len() > 1 {
                    return Err(ServiceError::AlreadyLinked {
                        record_id,
                        primary_id: record_id,
                    });
                }
            }
            Some(root) => {
                return Err(ServiceError::AlreadyLinked {
                    record_id,
                    primary_id: root,
                });
            }
            None => {}
        }

        self.write_edges(&[LinkEdge::new(record_id, primary_id)], OP, deadline)
            .await?;
        tracing::info!(
            record_id = %record_id,
            primary_id = %primary_id,
            "Accounts linked"
        );
        Ok(())
    }

    /// Remove `record_id` from its group, making it resolve to itself again.
    ///
    /// Unlinking a record that has no edge is a no-op; unlinking the root of
    /// a group that still has other members is rejected, since members still
    /// point at it.
    pub async fn unlink_account(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        const OP: &str = "unlink_account";
        deadline.check(OP)?;

        self.fetch_record(record_id, OP, deadline).await?;

        let _guards = self.lock_group_roots(&[record_id], OP, deadline).await?;

        match deadline.bound(OP, self.store.get_edge(record_id)).await?? {
            None => Ok(()),
            Some(root) if root == record_id => {
                let members = deadline
                    .bound(OP, self.store.list_records_by_primary(record_id))
                    .await??;
                if members.len() > 1 {
                    return Err(ServiceError::AlreadyLinked {
                        record_id,
                        primary_id: record_id,
                    });
                }
                self.remove_edge(record_id, OP, deadline).await?;
                tracing::info!(record_id = %record_id, "Primary designation removed");
                Ok(())
            }
            Some(root) => {
                self.remove_edge(record_id, OP, deadline).await?;
                tracing::info!(
                    record_id = %record_id,
                    primary_id = %root,
                    "Account unlinked"
                );
                Ok(())
            }
        }
    }

    async fn fetch_record(
        &self,
        record_id: Uuid,
        op: &'static str,
        deadline: Deadline,
    ) -> Result<AuthRecord, ServiceError> {
        deadline
            .bound(op, self.store.get_record(record_id))
            .await??
            .ok_or(ServiceError::RecordNotFound(record_id))
    }

    async fn root_of(
        &self,
        record_id: Uuid,
        op: &'static str,
        deadline: Deadline,
    ) -> Result<Uuid, ServiceError> {
        Ok(deadline
            .bound(op, self.store.get_edge(record_id))
            .await??
            .unwrap_or(record_id))
    }

    fn lock_handle(&self, key: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().clone()
    }

    /// Acquire locks for a set of keys in sorted order (deadlock-free).
    async fn lock_keys(
        &self,
        mut keys: Vec<Uuid>,
        op: &'static str,
        deadline: Deadline,
    ) -> Result<Vec<OwnedMutexGuard<()>>, ServiceError> {
        keys.sort_unstable();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let handle = self.lock_handle(key);
            guards.push(deadline.bound(op, handle.lock_owned()).await?);
        }
        Ok(guards)
    }

    /// Lock the given records and their current group roots.
    ///
    /// Roots can move between the read and the lock acquisition, so the
    /// locked set is re-validated and re-acquired until it is current.
    async fn lock_group_roots(
        &self,
        record_ids: &[Uuid],
        op: &'static str,
        deadline: Deadline,
    ) -> Result<Vec<OwnedMutexGuard<()>>, ServiceError> {
        let mut attempts = 0;
        loop {
            let mut roots = Vec::with_capacity(record_ids.len());
            for &id in record_ids {
                roots.push(self.root_of(id, op, deadline).await?);
            }

            let mut keys = roots.clone();
            keys.extend_from_slice(record_ids);
            let guards = self.lock_keys(keys, op, deadline).await?;

            let mut stable = true;
            for (&id, &root) in record_ids.iter().zip(roots.iter()) {
                if self.root_of(id, op, deadline).await? != root {
                    stable = false;
                    break;
                }
            }
            if stable {
                return Ok(guards);
            }

            drop(guards);
            attempts += 1;
            if attempts >= MAX_ROOT_REVALIDATIONS {
                return Err(ServiceError::StorageConflict(
                    "group roots kept moving under concurrent linking".to_string(),
                ));
            }
        }
    }

    /// Apply an edge batch, retrying transient store conflicts with backoff.
    async fn write_edges(
        &self,
        writes: &[LinkEdge],
        op: &'static str,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        deadline
            .bound(
                op,
                retry_with_backoff(&self.retry, op, StoreError::is_conflict, || {
                    self.store.put_edges(writes)
                }),
            )
            .await?
            .map_err(ServiceError::from)
    }

    async fn remove_edge(
        &self,
        record_id: Uuid,
        op: &'static str,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        deadline
            .bound(
                op,
                retry_with_backoff(&self.retry, op, StoreError::is_conflict, || {
                    self.store.remove_edge(record_id)
                }),
            )
            .await?
            .map_err(ServiceError::from)
    }
}
