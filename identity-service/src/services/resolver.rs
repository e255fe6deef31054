//! Identity resolver - answers "who is this user, and what is linked to them".

use std::sync::Arc;

use uuid::Uuid;

use crate::models::MergedIdentity;
use crate::store::IdentityStore;

use super::deadline::Deadline;
use super::error::ServiceError;

/// Resolves any record id to its merged identity view.
///
/// Cost is a function of the target group's size, never of the total
/// population: one edge read (edges are kept flattened) plus one indexed
/// fetch of the group's records.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub async fn get_user_by_id(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<MergedIdentity, ServiceError> {
        const OP: &str = "get_user_by_id";
        deadline.check(OP)?;

        let record = deadline
            .bound(OP, self.store.get_record(record_id))
            .await??
            .ok_or(ServiceError::RecordNotFound(record_id))?;

        let edge = deadline.bound(OP, self.store.get_edge(record_id)).await??;
        let primary_id = edge.unwrap_or(record_id);

        let mut records = deadline
            .bound(OP, self.store.list_records_by_primary(primary_id))
            .await??;
        if records.is_empty() {
            records.push(record);
        }

        Ok(MergedIdentity::assemble(primary_id, edge.is_some(), records))
    }
}
