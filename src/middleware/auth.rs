use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::AppError;
use crate::models::user::{Claims, Session};
use crate::state::AppState;

/// Caller authenticated by a bearer JWT. Rejects with 401 when absent or invalid.
pub struct AuthSession(pub Session);

/// Like `AuthSession`, but anonymous callers are allowed through.
/// A token that is present but invalid is still rejected.
pub struct MaybeSession(pub Option<Session>);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn decode_session(token: &str, secret: &str) -> Result<Session, AppError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let token_data = decode::<Claims>(token, &decoding_key, &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::AuthError
        })?;

    Ok(Session::from(token_data.claims))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::AuthError)?;
        Ok(AuthSession(decode_session(token, &state.jwt_secret)?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(MaybeSession(Some(decode_session(token, &state.jwt_secret)?))),
            None => Ok(MaybeSession(None)),
        }
    }
}
