//! Recipe adapters - the only write path that creates auth records.
//!
//! Each sign-in method gets its own adapter behind the [`IdentityProvider`]
//! capability trait. Adapters create or look up opaque records; they never
//! authenticate (no password hashing, no OAuth handshakes) and never touch
//! link edges.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    normalize_email, third_party_external_id, AuthRecord, RecipeAttributes, RecipeKind,
};
use crate::store::{IdentityStore, StoreError};

use super::deadline::Deadline;
use super::error::ServiceError;

/// Outcome of a sign-in-or-up call.
#[derive(Debug, Clone)]
pub struct SignInUp {
    pub record: AuthRecord,
    pub created: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn recipe(&self) -> RecipeKind;

    /// Look up the record for `(tenant_id, recipe, external_id)`, creating
    /// it on first sign-in.
    async fn sign_in_up(
        &self,
        tenant_id: Uuid,
        external_id: &str,
        attrs: &RecipeAttributes,
        deadline: Deadline,
    ) -> Result<SignInUp, ServiceError>;
}

pub struct ThirdPartyProvider {
    store: Arc<dyn IdentityStore>,
}

impl ThirdPartyProvider {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for ThirdPartyProvider {
    fn recipe(&self) -> RecipeKind {
        RecipeKind::ThirdParty
    }

    async fn sign_in_up(
        &self,
        tenant_id: Uuid,
        external_id: &str,
        attrs: &RecipeAttributes,
        deadline: Deadline,
    ) -> Result<SignInUp, ServiceError> {
        let provider_id = attrs
            .third_party_provider_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ServiceError::Validation("third-party sign-in requires a provider id".to_string())
            })?;
        if external_id.is_empty() {
            return Err(ServiceError::Validation(
                "third-party sign-in requires a provider user id".to_string(),
            ));
        }

        let key = third_party_external_id(provider_id, external_id);
        let email = attrs.email.clone();
        let provider_id = provider_id.to_string();
        let provider_user_id = external_id.to_string();
        create_or_get(
            self.store.as_ref(),
            tenant_id,
            RecipeKind::ThirdParty,
            &key,
            deadline,
            move || AuthRecord::new_third_party(tenant_id, provider_id, provider_user_id, email),
        )
        .await
    }
}

pub struct EmailPasswordProvider {
    store: Arc<dyn IdentityStore>,
}

impl EmailPasswordProvider {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for EmailPasswordProvider {
    fn recipe(&self) -> RecipeKind {
        RecipeKind::EmailPassword
    }

    async fn sign_in_up(
        &self,
        tenant_id: Uuid,
        external_id: &str,
        _attrs: &RecipeAttributes,
        deadline: Deadline,
    ) -> Result<SignInUp, ServiceError> {
        let email = normalize_email(external_id);
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation(
                "email/password sign-in requires a valid email".to_string(),
            ));
        }

        let key = email.clone();
        create_or_get(
            self.store.as_ref(),
            tenant_id,
            RecipeKind::EmailPassword,
            &key,
            deadline,
            move || AuthRecord::new_email_password(tenant_id, email),
        )
        .await
    }
}

pub struct PasswordlessProvider {
    store: Arc<dyn IdentityStore>,
}

impl PasswordlessProvider {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for PasswordlessProvider {
    fn recipe(&self) -> RecipeKind {
        RecipeKind::Passwordless
    }

    async fn sign_in_up(
        &self,
        tenant_id: Uuid,
        external_id: &str,
        _attrs: &RecipeAttributes,
        deadline: Deadline,
    ) -> Result<SignInUp, ServiceError> {
        let contact = external_id.trim();
        if contact.is_empty() {
            return Err(ServiceError::Validation(
                "passwordless sign-in requires an email or phone number".to_string(),
            ));
        }

        let (email, phone) = if contact.contains('@') {
            (Some(normalize_email(contact)), None)
        } else {
            (None, Some(contact.to_string()))
        };
        let key = email.clone().or_else(|| phone.clone()).unwrap_or_default();

        create_or_get(
            self.store.as_ref(),
            tenant_id,
            RecipeKind::Passwordless,
            &key,
            deadline,
            move || AuthRecord::new_passwordless(tenant_id, email, phone),
        )
        .await
    }
}

/// Shared create-or-get path. Concurrent first sign-ins race on the store's
/// credential uniqueness; the loser fetches the winner's record.
async fn create_or_get<F>(
    store: &dyn IdentityStore,
    tenant_id: Uuid,
    recipe: RecipeKind,
    external_id: &str,
    deadline: Deadline,
    build: F,
) -> Result<SignInUp, ServiceError>
where
    F: FnOnce() -> AuthRecord + Send,
{
    const OP: &str = "sign_in_up";
    deadline.check(OP)?;

    if let Some(existing) = deadline
        .bound(OP, store.find_record(tenant_id, recipe, external_id))
        .await??
    {
        return Ok(SignInUp {
            record: existing,
            created: false,
        });
    }

    let record = build();
    match deadline.bound(OP, store.put_record(record.clone())).await? {
        Ok(_) => {
            tracing::debug!(
                record_id = %record.record_id,
                recipe = %recipe,
                "Auth record created"
            );
            Ok(SignInUp {
                record,
                created: true,
            })
        }
        Err(StoreError::DuplicateRecord { .. }) => {
            let existing = deadline
                .bound(OP, store.find_record(tenant_id, recipe, external_id))
                .await??
                .ok_or_else(|| {
                    ServiceError::Internal(anyhow::anyhow!(
                        "record vanished after duplicate-credential conflict"
                    ))
                })?;
            Ok(SignInUp {
                record: existing,
                created: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> Arc<dyn IdentityStore> {
        Arc::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_third_party_requires_provider_id() {
        let provider = ThirdPartyProvider::new(store());
        let err = provider
            .sign_in_up(
                Uuid::new_v4(),
                "googleid0",
                &RecipeAttributes::default(),
                Deadline::none(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_email_password_rejects_bad_email() {
        let provider = EmailPasswordProvider::new(store());
        let err = provider
            .sign_in_up(
                Uuid::new_v4(),
                "not-an-email",
                &RecipeAttributes::default(),
                Deadline::none(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_passwordless_routes_contact_kind() {
        let provider = PasswordlessProvider::new(store());
        let tenant = Uuid::new_v4();

        let by_email = provider
            .sign_in_up(
                tenant,
                "someone@example.com",
                &RecipeAttributes::default(),
                Deadline::none(),
            )
            .await
            .unwrap();
        assert_eq!(by_email.record.email.as_deref(), Some("someone@example.com"));
        assert!(by_email.record.phone_number.is_none());

        let by_phone = provider
            .sign_in_up(
                tenant,
                "+15551234567",
                &RecipeAttributes::default(),
                Deadline::none(),
            )
            .await
            .unwrap();
        assert!(by_phone.record.email.is_none());
        assert_eq!(by_phone.record.phone_number.as_deref(), Some("+15551234567"));
    }

    #[tokio::test]
    async fn test_second_sign_in_returns_existing_record() {
        let provider = ThirdPartyProvider::new(store());
        let tenant = Uuid::new_v4();
        let attrs = RecipeAttributes::third_party("google", "user0@example.com");

        let first = provider
            .sign_in_up(tenant, "googleid0", &attrs, Deadline::none())
            .await
            .unwrap();
        assert!(first.created);

        let second = provider
            .sign_in_up(tenant, "googleid0", &attrs, Deadline::none())
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.record.record_id, first.record.record_id);
    }
}
