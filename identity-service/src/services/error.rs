use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unknown auth record: {0}")]
    RecordNotFound(Uuid),

    #[error("Record {record_id} is already linked under primary user {primary_id}")]
    AlreadyLinked { record_id: Uuid, primary_id: Uuid },

    #[error("Record {0} is not a primary user")]
    InputIsNotAPrimaryUser(Uuid),

    #[error("Records {0} and {1} are already linked")]
    AccountsAlreadyLinked(Uuid, Uuid),

    #[error("Records belong to different tenants")]
    TenantMismatch,

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Whether the failed call is worth retrying at the caller's discretion.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::StorageConflict(_) | ServiceError::DeadlineExceeded(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::StorageConflict(msg),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::RecordNotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Unknown auth record: {}", id))
            }
            ServiceError::AlreadyLinked { record_id, primary_id } => AppError::Conflict(
                anyhow::anyhow!("Record {} is already linked under {}", record_id, primary_id),
            ),
            ServiceError::InputIsNotAPrimaryUser(id) => AppError::PreconditionFailed(
                anyhow::anyhow!("Record {} is not a primary user", id),
            ),
            ServiceError::AccountsAlreadyLinked(a, b) => {
                AppError::Conflict(anyhow::anyhow!("Records {} and {} are already linked", a, b))
            }
            ServiceError::TenantMismatch => {
                AppError::PreconditionFailed(anyhow::anyhow!("Records belong to different tenants"))
            }
            ServiceError::StorageConflict(msg) => AppError::Contention(msg),
            ServiceError::DeadlineExceeded(op) => AppError::DeadlineExceeded(op.to_string()),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Storage(e) => AppError::StorageError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
