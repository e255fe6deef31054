//! Authentication record model - one identity as created by one recipe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipe codes - the sign-in methods whose records the engine links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    ThirdParty,
    EmailPassword,
    Passwordless,
}

impl RecipeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeKind::ThirdParty => "thirdparty",
            RecipeKind::EmailPassword => "emailpassword",
            RecipeKind::Passwordless => "passwordless",
        }
    }
}

impl std::str::FromStr for RecipeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "thirdparty" => Ok(RecipeKind::ThirdParty),
            "emailpassword" => Ok(RecipeKind::EmailPassword),
            "passwordless" => Ok(RecipeKind::Passwordless),
            _ => Err(format!("Invalid recipe kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Third-party provider reference ("google" plus the provider's user id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyInfo {
    pub provider_id: String,
    pub provider_user_id: String,
}

/// Recipe-specific profile attributes supplied at sign-in-up time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeAttributes {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub third_party_provider_id: Option<String>,
}

impl RecipeAttributes {
    /// Attributes for a third-party sign-in.
    pub fn third_party(provider_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone_number: None,
            third_party_provider_id: Some(provider_id.into()),
        }
    }

    /// Attributes for an email-based sign-in.
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// Attributes for a phone-based passwordless sign-in.
    pub fn phone(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: Some(phone_number.into()),
            ..Default::default()
        }
    }
}

/// Authentication record entity (tenant-scoped).
///
/// Immutable after creation except for the recipe profile fields; the
/// linking engine only ever changes its group membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRecord {
    pub record_id: Uuid,
    pub tenant_id: Uuid,
    pub recipe: RecipeKind,
    /// Recipe-scoped stable identifier the record was created from.
    pub external_id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub third_party: Option<ThirdPartyInfo>,
    pub created_utc: DateTime<Utc>,
}

impl AuthRecord {
    /// Create a new third-party record.
    pub fn new_third_party(
        tenant_id: Uuid,
        provider_id: String,
        provider_user_id: String,
        email: Option<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            tenant_id,
            recipe: RecipeKind::ThirdParty,
            external_id: third_party_external_id(&provider_id, &provider_user_id),
            email: email.map(normalize_email),
            phone_number: None,
            third_party: Some(ThirdPartyInfo {
                provider_id,
                provider_user_id,
            }),
            created_utc: Utc::now(),
        }
    }

    /// Create a new email/password record.
    pub fn new_email_password(tenant_id: Uuid, email: String) -> Self {
        let email = normalize_email(email);
        Self {
            record_id: Uuid::new_v4(),
            tenant_id,
            recipe: RecipeKind::EmailPassword,
            external_id: email.clone(),
            email: Some(email),
            phone_number: None,
            third_party: None,
            created_utc: Utc::now(),
        }
    }

    /// Create a new passwordless record from an email or phone contact.
    pub fn new_passwordless(
        tenant_id: Uuid,
        email: Option<String>,
        phone_number: Option<String>,
    ) -> Self {
        let email = email.map(normalize_email);
        let external_id = email
            .clone()
            .or_else(|| phone_number.clone())
            .unwrap_or_default();
        Self {
            record_id: Uuid::new_v4(),
            tenant_id,
            recipe: RecipeKind::Passwordless,
            external_id,
            email,
            phone_number,
            third_party: None,
            created_utc: Utc::now(),
        }
    }
}

/// Store key for a third-party identity: provider and provider user id
/// together identify the account.
pub fn third_party_external_id(provider_id: &str, provider_user_id: &str) -> String {
    format!("{}|{}", provider_id, provider_user_id)
}

/// Lowercase email normalization; lookups are case-insensitive.
pub fn normalize_email(email: impl Into<String>) -> String {
    email.into().trim().to_lowercase()
}
