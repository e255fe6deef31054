//! Operation deadlines.
//!
//! Every engine operation accepts a [`Deadline`]; an expired one surfaces
//! [`ServiceError::DeadlineExceeded`] and the store transaction boundary
//! guarantees no partial edge writes are left behind.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::ServiceError;

/// Absolute point in time after which an operation gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; the operation runs to completion.
    pub fn none() -> Self {
        Self(None)
    }

    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// Deadline at an absolute instant.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn is_unbounded(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_expired(&self) -> bool {
        match self.0 {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Run `fut` under this deadline; `op` names the operation in the error.
    pub async fn bound<F, T>(&self, op: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = T>,
    {
        match self.0 {
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| ServiceError::DeadlineExceeded(op)),
            None => Ok(fut.await),
        }
    }

    /// Fail fast before starting work if the deadline already passed.
    pub fn check(&self, op: &'static str) -> Result<(), ServiceError> {
        if self.is_expired() {
            Err(ServiceError::DeadlineExceeded(op))
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
