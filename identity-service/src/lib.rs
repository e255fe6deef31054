//! Account-linking and identity-resolution engine.
//!
//! Lets several independent sign-in methods (recipes) for the same human be
//! merged into one logical primary user while each underlying method keeps
//! its own record. The engine maintains the record-to-primary mapping under
//! concurrent writes and resolves any record to its merged identity in
//! near-constant time.
//!
//! The HTTP/RPC surface, process bootstrap, and the concrete storage engine
//! live outside this crate; storage plugs in through
//! [`store::IdentityStore`].

pub mod config;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::models::{MergedIdentity, RecipeAttributes, RecipeKind};
use crate::services::{
    Deadline, EmailPasswordProvider, IdentityProvider, IdentityResolver, LinkGraph,
    PasswordlessProvider, ServiceError, SignInUp, ThirdPartyProvider,
};
use crate::store::IdentityStore;

/// Assembled engine state handed to API layers.
///
/// One instance per tenant-serving process; the storage handle is explicit,
/// so tests and multi-tenant embedders can hold several cores side by side.
#[derive(Clone)]
pub struct IdentityCore {
    pub config: IdentityConfig,
    pub store: Arc<dyn IdentityStore>,
    pub link_graph: LinkGraph,
    pub resolver: IdentityResolver,
    third_party: Arc<ThirdPartyProvider>,
    email_password: Arc<EmailPasswordProvider>,
    passwordless: Arc<PasswordlessProvider>,
}

impl IdentityCore {
    pub fn new(config: IdentityConfig, store: Arc<dyn IdentityStore>) -> Self {
        let link_graph = LinkGraph::new(store.clone(), config.linking.retry());
        let resolver = IdentityResolver::new(store.clone());
        Self {
            third_party: Arc::new(ThirdPartyProvider::new(store.clone())),
            email_password: Arc::new(EmailPasswordProvider::new(store.clone())),
            passwordless: Arc::new(PasswordlessProvider::new(store.clone())),
            config,
            store,
            link_graph,
            resolver,
        }
    }

    /// Dispatch to the adapter for a recipe.
    pub fn provider_for(&self, recipe: RecipeKind) -> &dyn IdentityProvider {
        match recipe {
            RecipeKind::ThirdParty => self.third_party.as_ref(),
            RecipeKind::EmailPassword => self.email_password.as_ref(),
            RecipeKind::Passwordless => self.passwordless.as_ref(),
        }
    }

    pub async fn sign_in_up(
        &self,
        tenant_id: Uuid,
        recipe: RecipeKind,
        external_id: &str,
        attrs: &RecipeAttributes,
        deadline: Deadline,
    ) -> Result<SignInUp, ServiceError> {
        self.provider_for(recipe)
            .sign_in_up(tenant_id, external_id, attrs, self.effective(deadline))
            .await
    }

    pub async fn create_primary_user(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<Uuid, ServiceError> {
        self.link_graph
            .create_primary_user(record_id, self.effective(deadline))
            .await
    }

    pub async fn link_accounts(
        &self,
        record_id: Uuid,
        primary_id: Uuid,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        self.link_graph
            .link_accounts(record_id, primary_id, self.effective(deadline))
            .await
    }

    pub async fn unlink_account(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<(), ServiceError> {
        self.link_graph
            .unlink_account(record_id, self.effective(deadline))
            .await
    }

    pub async fn get_user_by_id(
        &self,
        record_id: Uuid,
        deadline: Deadline,
    ) -> Result<MergedIdentity, ServiceError> {
        self.resolver
            .get_user_by_id(record_id, self.effective(deadline))
            .await
    }

    /// Apply the configured default deadline when the caller passes none.
    fn effective(&self, deadline: Deadline) -> Deadline {
        if deadline.is_unbounded() {
            self.config.linking.default_deadline()
        } else {
            deadline
        }
    }
}
