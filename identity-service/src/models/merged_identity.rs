//! Merged identity view - the "who is this user" answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth_record::{AuthRecord, RecipeKind};

/// Aggregated view of every record linked under one primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedIdentity {
    pub primary_id: Uuid,
    pub tenant_id: Uuid,
    /// Whether the primary was explicitly designated (false for a record
    /// that was never linked and resolves to itself).
    pub is_primary: bool,
    /// Constituent records, oldest first.
    pub login_methods: Vec<AuthRecord>,
    /// Creation time of the oldest constituent record.
    pub created_utc: DateTime<Utc>,
}

impl MergedIdentity {
    /// Assemble the view from a non-empty member set.
    pub fn assemble(primary_id: Uuid, is_primary: bool, mut records: Vec<AuthRecord>) -> Self {
        records.sort_by(|a, b| {
            a.created_utc
                .cmp(&b.created_utc)
                .then(a.record_id.cmp(&b.record_id))
        });
        let tenant_id = records
            .first()
            .map(|r| r.tenant_id)
            .unwrap_or_else(Uuid::nil);
        let created_utc = records
            .first()
            .map(|r| r.created_utc)
            .unwrap_or_else(Utc::now);
        Self {
            primary_id,
            tenant_id,
            is_primary,
            login_methods: records,
            created_utc,
        }
    }

    /// All distinct emails across the linked records.
    pub fn emails(&self) -> Vec<&str> {
        let mut emails: Vec<&str> = self
            .login_methods
            .iter()
            .filter_map(|r| r.email.as_deref())
            .collect();
        emails.sort_unstable();
        emails.dedup();
        emails
    }

    /// Whether any linked record was created by the given recipe.
    pub fn has_recipe(&self, recipe: RecipeKind) -> bool {
        self.login_methods.iter().any(|r| r.recipe == recipe)
    }

    /// Ids of the constituent records.
    pub fn record_ids(&self) -> Vec<Uuid> {
        self.login_methods.iter().map(|r| r.record_id).collect()
    }
}
