mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use common::{seed_user, test_state};
use jsonwebtoken::{EncodingKey, Header, encode};
use mars_colony::{
    AppConfig, InMemoryRepository,
    auth::{Claims, hash_password, issue_token, verify_password},
    config::Env,
    create_router,
    errors::ManagerError,
};
use std::sync::Arc;
use tower::ServiceExt;

// --- Helpers ---

async fn get_me(state: mars_colony::AppState, headers: &[(&str, String)]) -> StatusCode {
    let mut builder = Request::builder().uri("/me");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let response = create_router(state)
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {token}"))
}

fn signed(secret: &str, sub: &str, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: exp as usize,
        iat: Utc::now().timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

// --- Bearer tokens ---

#[tokio::test]
async fn test_issued_token_authenticates() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);

    let (token, expires_at) = issue_token(&state.config, user.id, false).unwrap();
    assert!(expires_at > Utc::now());

    assert_eq!(get_me(state, &[bearer(&token)]).await, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_credentials_are_unauthorized() {
    let state = test_state(Arc::new(InMemoryRepository::new()));
    assert_eq!(get_me(state, &[]).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);

    let exp = Utc::now().timestamp() + 3600;
    let forged = signed("not-the-secret", &user.id.to_string(), exp);

    assert_eq!(get_me(state, &[bearer(&forged)]).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);

    // Well past the default validation leeway.
    let exp = Utc::now().timestamp() - 3600;
    let expired = signed(&state.config.jwt_secret, &user.id.to_string(), exp);

    assert_eq!(get_me(state, &[bearer(&expired)]).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let state = test_state(Arc::new(InMemoryRepository::new()));
    let (token, _) = issue_token(&state.config, 42, false).unwrap();

    assert_eq!(get_me(state, &[bearer(&token)]).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_numeric_subject_is_rejected() {
    let repo = Arc::new(InMemoryRepository::new());
    seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);

    let exp = Utc::now().timestamp() + 3600;
    let token = signed(&state.config.jwt_secret, "not-a-number", exp);

    assert_eq!(get_me(state, &[bearer(&token)]).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorization_without_bearer_scheme_is_rejected() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);
    let (token, _) = issue_token(&state.config, user.id, false).unwrap();

    let headers = [(header::AUTHORIZATION.as_str(), token)];
    assert_eq!(get_me(state, &headers).await, StatusCode::UNAUTHORIZED);
}

// --- Session lifetime ---

#[test]
fn test_remember_me_extends_session() {
    let config = AppConfig::default();

    let (_, short) = issue_token(&config, 1, false).unwrap();
    let (_, long) = issue_token(&config, 1, true).unwrap();

    let short_hours = (short - Utc::now()).num_hours();
    let long_days = (long - Utc::now()).num_days();
    assert!((23..=24).contains(&short_hours));
    assert!((29..=30).contains(&long_days));
}

#[test]
fn test_out_of_range_session_lifetime_is_an_error() {
    for session_ttl_hours in [i64::MAX / 1000, 0, -5] {
        let config = AppConfig {
            session_ttl_hours,
            ..AppConfig::default()
        };

        let result = issue_token(&config, 1, false);

        assert!(
            matches!(result, Err(ManagerError::SessionLifetime(h)) if h == session_ttl_hours),
            "ttl {session_ttl_hours}"
        );
    }
}

// --- Local bypass ---

#[tokio::test]
async fn test_local_bypass_header_accepts_existing_user() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let state = test_state(repo);

    let headers = [("x-user-id", user.id.to_string())];
    assert_eq!(get_me(state, &headers).await, StatusCode::OK);
}

#[tokio::test]
async fn test_local_bypass_header_for_unknown_user_is_rejected() {
    let state = test_state(Arc::new(InMemoryRepository::new()));

    let headers = [("x-user-id", "7".to_string())];
    assert_eq!(get_me(state, &headers).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bypass_header_is_ignored_in_production() {
    let repo = Arc::new(InMemoryRepository::new());
    let user = seed_user(&repo, "a@x.com", "Scott").await;
    let mut state = test_state(repo);
    state.config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };

    let headers = [("x-user-id", user.id.to_string())];
    assert_eq!(get_me(state, &headers).await, StatusCode::UNAUTHORIZED);
}

// --- Password hashing ---

#[tokio::test]
async fn test_password_hash_round_trip() {
    let hashed = hash_password("secret".to_string()).await.unwrap();

    assert_ne!(hashed, "secret");
    assert!(verify_password("secret".to_string(), hashed.clone()).await);
    assert!(!verify_password("Secret".to_string(), hashed).await);
}

#[tokio::test]
async fn test_malformed_hash_never_verifies() {
    assert!(!verify_password("unusable".to_string(), "unusable".to_string()).await);
}
