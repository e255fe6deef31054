//! Sign-in-up integration tests.
//!
//! The recipe adapters are the only path that creates auth records.

mod common;

use common::TestCore;
use identity_service::models::{RecipeAttributes, RecipeKind};
use identity_service::services::{Deadline, ServiceError};
use identity_service::store::IdentityStore;
use uuid::Uuid;

#[tokio::test]
async fn first_sign_in_creates_record() {
    // Arrange
    let app = TestCore::spawn();

    // Act
    let outcome = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::ThirdParty,
            "googleid0",
            &RecipeAttributes::third_party("google", "user0@example.com"),
            Deadline::none(),
        )
        .await
        .expect("sign in up failed");

    // Assert
    assert!(outcome.created);
    assert_eq!(outcome.record.tenant_id, app.tenant);
    assert_eq!(outcome.record.recipe, RecipeKind::ThirdParty);
    assert_eq!(outcome.record.email.as_deref(), Some("user0@example.com"));
    assert_eq!(app.core.store.count_records().await.unwrap(), 1);
}

#[tokio::test]
async fn repeated_sign_in_returns_same_record() {
    // Arrange
    let app = TestCore::spawn();
    let first = app.third_party_user("googleid0", "user0@example.com").await;

    // Act
    let outcome = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::ThirdParty,
            "googleid0",
            &RecipeAttributes::third_party("google", "user0@example.com"),
            Deadline::none(),
        )
        .await
        .expect("sign in up failed");

    // Assert
    assert!(!outcome.created);
    assert_eq!(outcome.record.record_id, first.record_id);
    assert_eq!(app.core.store.count_records().await.unwrap(), 1);
}

#[tokio::test]
async fn same_external_id_in_two_tenants_creates_distinct_records() {
    // Arrange
    let app = TestCore::spawn();
    let other_tenant = Uuid::new_v4();

    // Act
    let a = app.third_party_user("googleid0", "user0@example.com").await;
    let b = app
        .third_party_user_in(other_tenant, "googleid0", "user0@example.com")
        .await;

    // Assert
    assert_ne!(a.record_id, b.record_id);
    assert_eq!(app.core.store.count_records().await.unwrap(), 2);
}

#[tokio::test]
async fn same_email_across_recipes_creates_distinct_records() {
    // Arrange
    let app = TestCore::spawn();

    // Act
    let password = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::EmailPassword,
            "user0@example.com",
            &RecipeAttributes::default(),
            Deadline::none(),
        )
        .await
        .expect("email/password sign in failed");
    let passwordless = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::Passwordless,
            "user0@example.com",
            &RecipeAttributes::default(),
            Deadline::none(),
        )
        .await
        .expect("passwordless sign in failed");

    // Assert
    assert!(password.created);
    assert!(passwordless.created);
    assert_ne!(password.record.record_id, passwordless.record.record_id);
}

#[tokio::test]
async fn email_lookup_is_case_insensitive() {
    // Arrange
    let app = TestCore::spawn();

    // Act
    let first = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::EmailPassword,
            "User0@Example.com",
            &RecipeAttributes::default(),
            Deadline::none(),
        )
        .await
        .unwrap();
    let second = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::EmailPassword,
            "user0@example.COM",
            &RecipeAttributes::default(),
            Deadline::none(),
        )
        .await
        .unwrap();

    // Assert
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.record.record_id, first.record.record_id);
}

#[tokio::test]
async fn third_party_sign_in_without_provider_fails_validation() {
    // Arrange
    let app = TestCore::spawn();

    // Act
    let err = app
        .core
        .sign_in_up(
            app.tenant,
            RecipeKind::ThirdParty,
            "googleid0",
            &RecipeAttributes::default(),
            Deadline::none(),
        )
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(app.core.store.count_records().await.unwrap(), 0);
}
