use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use backend_lib::{
    auth::{AuthService, Credentials, Token, TokenValidator},
    router::create_router,
    AppState, AuthError,
};
use keygate_common::{HealthResponse, HealthStatus, LoginResponse};
use tower::ServiceExt;

use crate::test_utils::{
    body_json, login_body, login_request, post_login, post_login_raw, setup_app, test_settings,
    CountingStore, FailingStore, HangingStore,
};

#[tokio::test]
async fn test_alice_bob_scenario() {
    let store = Arc::new(CountingStore::with_alice());
    let app = setup_app(store.clone(), test_settings());
    let validator = TokenValidator::new(&test_settings().token).unwrap();

    // registered user with the right password
    let (status, body) = post_login(&app, "alice", "correct-horse", None).await;
    assert_eq!(status, StatusCode::OK);
    let response: LoginResponse = serde_json::from_value(body).unwrap();
    let claims = validator.validate(&response.token).unwrap();
    assert_eq!(claims.sub, "alice");

    // wrong password and unknown user look the same
    let (wrong_status, wrong_body) = post_login(&app, "alice", "wrong", None).await;
    let (unknown_status, unknown_body) = post_login(&app, "bob", "anything", None).await;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"]["message"], "Authentication failed");
    assert_eq!(store.calls(), 3);

    // empty credentials never reach the store
    let (status, body) = post_login(&app, "", "", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, wrong_body);
    assert_eq!(store.calls(), 3);
}

#[tokio::test]
async fn test_repeated_logins_issue_independent_tokens() {
    let app = setup_app(Arc::new(CountingStore::with_alice()), test_settings());
    let validator = TokenValidator::new(&test_settings().token).unwrap();

    let (_, first) = post_login(&app, "alice", "correct-horse", None).await;
    let (_, second) = post_login(&app, "alice", "correct-horse", None).await;
    let first = first["token"].as_str().unwrap().to_string();
    let second = second["token"].as_str().unwrap().to_string();

    assert_ne!(first, second);
    let first_claims = validator.validate(&first).unwrap();
    let second_claims = validator.validate(&second).unwrap();
    assert_ne!(first_claims.jti, second_claims.jti);
    assert_eq!(first_claims.sub, second_claims.sub);
}

#[tokio::test]
async fn test_pascal_case_request_fields() {
    let app = setup_app(Arc::new(CountingStore::with_alice()), test_settings());
    let body = r#"{"Username":"alice","Password":"correct-horse"}"#.to_string();
    let response = post_login_raw(&app, body, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_store_failure_is_service_unavailable() {
    let app = setup_app(Arc::new(FailingStore), test_settings());
    let response = post_login_raw(
        &app,
        r#"{"username":"alice","password":"correct-horse"}"#.to_string(),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_002");
    assert!(!body.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_store_timeout_is_service_unavailable() {
    let app = setup_app(Arc::new(HangingStore), test_settings());
    let (status, _) = post_login(&app, "alice", "correct-horse", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_app(Arc::new(CountingStore::with_alice()), test_settings());

    let response = post_login_raw(&app, "{ not json".to_string(), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_login_raw(&app, r#"{"username":"alice"}"#.to_string(), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "VAL_001");
}

#[tokio::test]
async fn test_failed_logins_lock_out_client() {
    let mut settings = test_settings();
    settings.rate_limit.max_attempts = 2;
    let store = Arc::new(CountingStore::with_alice());
    let app = setup_app(store.clone(), settings);
    let ip = Some("198.51.100.23");

    assert_eq!(post_login(&app, "alice", "wrong", ip).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(post_login(&app, "bob", "wrong", ip).await.0, StatusCode::UNAUTHORIZED);

    // locked out, even with the right password, and without a store call
    let calls = store.calls();
    let (status, body) = post_login(&app, "alice", "correct-horse", ip).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "AUTH_004");
    assert_eq!(store.calls(), calls);

    // other clients are unaffected
    let (status, _) = post_login(&app, "alice", "correct-horse", Some("198.51.100.24")).await;
    assert_eq!(status, StatusCode::OK);
}

async fn login_status(
    app: &axum::Router,
    username: &str,
    password: &str,
    peer: &str,
    real_ip: &str,
) -> StatusCode {
    let request = login_request(login_body(username, password), Some(peer), Some(real_ip));
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_forged_client_headers_are_ignored() {
    let mut settings = test_settings();
    settings.rate_limit.max_attempts = 3;
    let app = setup_app(Arc::new(CountingStore::with_alice()), settings);
    let attacker = "192.0.2.66";
    let victim = "203.0.113.50";

    // guesses claiming to come from the victim are charged to the attacker
    for _ in 0..3 {
        let status = login_status(&app, "alice", "wrong", attacker, victim).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        post_login(&app, "alice", "correct-horse", Some(victim)).await.0,
        StatusCode::OK
    );

    // rotating the header does not reset the attacker's count
    for i in 0..3 {
        let status = login_status(&app, "alice", "wrong", attacker, &format!("10.9.{i}.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn test_trusted_proxy_reports_client_address() {
    let proxy = "10.0.0.1";
    let mut settings = test_settings();
    settings.rate_limit.max_attempts = 2;
    settings.rate_limit.trusted_proxies = vec![proxy.parse().unwrap()];
    let app = setup_app(Arc::new(CountingStore::with_alice()), settings);

    for _ in 0..2 {
        let status = login_status(&app, "alice", "wrong", proxy, "198.51.100.7").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        login_status(&app, "alice", "correct-horse", proxy, "198.51.100.7").await,
        StatusCode::TOO_MANY_REQUESTS
    );
    // another client behind the same proxy is unaffected
    assert_eq!(
        login_status(&app, "alice", "correct-horse", proxy, "198.51.100.8").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_disabled_limiter_never_locks_out() {
    let mut settings = test_settings();
    settings.rate_limit.enabled = false;
    settings.rate_limit.max_attempts = 1;
    let app = setup_app(Arc::new(CountingStore::with_alice()), settings);
    let ip = Some("198.51.100.23");

    for _ in 0..3 {
        assert_eq!(post_login(&app, "alice", "wrong", ip).await.0, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        post_login(&app, "alice", "correct-horse", ip).await.0,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_health_ok() {
    let app = setup_app(Arc::new(CountingStore::with_alice()), test_settings());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(body.status, HealthStatus::Ok);
}

/// Auth service whose signer is broken
struct BrokenSigner;

#[async_trait]
impl AuthService for BrokenSigner {
    async fn login(&self, _credentials: Credentials) -> Result<Token, AuthError> {
        Err(AuthError::SigningFailure("key vanished".to_string()))
    }

    fn health(&self) -> Result<(), AuthError> {
        Err(AuthError::SigningFailure("key vanished".to_string()))
    }
}

#[tokio::test]
async fn test_signing_failure_surfaces_distinctly() {
    let state = AppState::new(Arc::new(BrokenSigner), test_settings());
    let app = create_router(Arc::new(state));

    let (status, body) = post_login(&app, "alice", "correct-horse", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "AUTH_003");
    assert!(!body.to_string().contains("key vanished"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
