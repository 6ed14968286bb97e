use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::{SaltString, rand_core::OsRng};
use serde::{Deserialize, Serialize};

use crate::{
    access::Principal,
    config::{AppConfig, Env},
    errors::ManagerError,
    repository::RepositoryState,
};

/// Lifetime of a session issued with `remember_me`.
const REMEMBERED_SESSION_DAYS: i64 = 30;

/// Claims
///
/// Payload of the session token issued by `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id of the principal, as a decimal string.
    pub sub: String,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// issue_token
///
/// Signs a session token for `user_id`. Returns the token and its expiry.
/// A configured lifetime that is not positive or overflows a timestamp is
/// rejected as `SessionLifetime`.
pub fn issue_token(
    config: &AppConfig,
    user_id: i64,
    remember_me: bool,
) -> Result<(String, DateTime<Utc>), ManagerError> {
    let now = Utc::now();
    let ttl = if remember_me {
        TimeDelta::try_days(REMEMBERED_SESSION_DAYS)
    } else {
        TimeDelta::try_hours(config.session_ttl_hours)
    };
    let expires_at = ttl
        .filter(|ttl| *ttl > TimeDelta::zero())
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(ManagerError::SessionLifetime(config.session_ttl_hours))?;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)?;
    Ok((token, expires_at))
}

/// hash_password
///
/// Produces an argon2 PHC string. Runs on the blocking pool so the hash does not
/// stall the async runtime.
pub async fn hash_password(password: String) -> Result<String, ManagerError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ManagerError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| ManagerError::Hashing(e.to_string()))?
}

/// verify_password
///
/// Checks `password` against a stored PHC string. Malformed hashes never verify.
pub async fn verify_password(password: String, hashed: String) -> bool {
    tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hashed) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .unwrap_or(false)
}

/// Principal Extractor Implementation
///
/// Resolves the acting principal for authenticated routes:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. Bearer token: HS256 session token issued by `POST /login`.
/// 3. Store lookup: the subject must still exist.
///
/// Rejection: `401 {"error": ...}` on any failure; a store failure is a 500.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ManagerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| id.parse::<i64>().ok());
            if let Some(user_id) = bypass_id {
                if let Ok(Some(user)) = repo.get_user(user_id).await {
                    return Ok(Principal::new(user.id));
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ManagerError::Unauthenticated)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("rejected session token: {:?}", e.kind());
            ManagerError::Unauthenticated
        })?;

        let user_id = token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ManagerError::Unauthenticated)?;

        // The subject must still exist; a token outliving its user is void.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(ManagerError::Unauthenticated)?;

        Ok(Principal::new(user.id))
    }
}
