use std::sync::Arc;

use backend_lib::{
    auth::{AuthService, Credentials, DefaultAuth, TokenValidator},
    storage::FlatFileCredentialStore,
    AuthError,
};
use tempfile::tempdir;

use crate::test_utils::{hash, test_settings, CountingStore, FailingStore, HangingStore};

#[tokio::test]
async fn test_login_against_flat_file_store() {
    let dir = tempdir().unwrap();
    let store = FlatFileCredentialStore::new(dir.path().join("users.json"));
    store.upsert("alice", &hash("correct-horse")).await.unwrap();
    store.upsert("carol", &hash("hunter22")).await.unwrap();

    let settings = test_settings();
    let auth = DefaultAuth::from_settings(Arc::new(store), &settings).unwrap();
    let validator = TokenValidator::new(&settings.token).unwrap();

    let token = auth
        .login(Credentials::new("carol", "hunter22"))
        .await
        .unwrap();
    assert_eq!(validator.validate(token.as_str()).unwrap().sub, "carol");

    assert_eq!(
        auth.login(Credentials::new("carol", "correct-horse"))
            .await
            .unwrap_err(),
        AuthError::InvalidCredentials
    );
}

#[tokio::test]
async fn test_provisioning_takes_effect_without_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.json");
    let store = FlatFileCredentialStore::new(&path);
    store.upsert("alice", &hash("correct-horse")).await.unwrap();

    let auth = DefaultAuth::from_settings(Arc::new(store.clone()), &test_settings()).unwrap();
    assert!(auth
        .login(Credentials::new("dave", "new-password"))
        .await
        .is_err());

    store.upsert("dave", &hash("new-password")).await.unwrap();
    assert!(auth
        .login(Credentials::new("dave", "new-password"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_missing_users_file_is_store_unavailable() {
    let dir = tempdir().unwrap();
    let store = FlatFileCredentialStore::new(dir.path().join("missing.json"));
    let auth = DefaultAuth::from_settings(Arc::new(store), &test_settings()).unwrap();

    assert_eq!(
        auth.login(Credentials::new("alice", "correct-horse"))
            .await
            .unwrap_err(),
        AuthError::StoreUnavailable
    );
}

#[tokio::test]
async fn test_store_errors_map_to_store_unavailable() {
    let settings = test_settings();

    let failing = DefaultAuth::from_settings(Arc::new(FailingStore), &settings).unwrap();
    assert_eq!(
        failing
            .login(Credentials::new("alice", "correct-horse"))
            .await
            .unwrap_err(),
        AuthError::StoreUnavailable
    );

    let hanging = DefaultAuth::from_settings(Arc::new(HangingStore), &settings).unwrap();
    let started = std::time::Instant::now();
    assert_eq!(
        hanging
            .login(Credentials::new("alice", "correct-horse"))
            .await
            .unwrap_err(),
        AuthError::StoreUnavailable
    );
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn test_invalid_input_skips_the_store() {
    let store = Arc::new(CountingStore::with_alice());
    let auth = DefaultAuth::from_settings(store.clone(), &test_settings()).unwrap();

    for (user, pass) in [("", ""), ("alice", ""), ("", "correct-horse")] {
        assert_eq!(
            auth.login(Credentials::new(user, pass)).await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }
    let oversized = "x".repeat(backend_lib::validation::MAX_PASSWORD_LENGTH + 1);
    assert_eq!(
        auth.login(Credentials::new("alice", oversized)).await.unwrap_err(),
        AuthError::InvalidCredentials
    );
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_logins_are_independent() {
    let auth = Arc::new(
        DefaultAuth::from_settings(Arc::new(CountingStore::with_alice()), &test_settings())
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let auth = Arc::clone(&auth);
        handles.push(tokio::spawn(async move {
            let password = if i % 2 == 0 { "correct-horse" } else { "wrong" };
            auth.login(Credentials::new("alice", password)).await
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await.unwrap() {
            Ok(token) => {
                assert_eq!(i % 2, 0);
                assert!(ids.insert(token.id));
            },
            Err(err) => {
                assert_eq!(i % 2, 1);
                assert_eq!(err, AuthError::InvalidCredentials);
            },
        }
    }
    assert_eq!(ids.len(), 4);
}

#[test]
fn test_missing_signing_key_fails_construction() {
    let mut settings = test_settings();
    settings.token.secret = None;
    let err = DefaultAuth::from_settings(Arc::new(FailingStore), &settings)
        .err()
        .expect("construction should fail without a signing key");
    assert!(matches!(
        err.downcast_ref::<AuthError>(),
        Some(AuthError::SigningFailure(_))
    ));
}
