use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{handlers::ApiError, state::AppState};

/// Header carrying the session token on authenticated requests.
pub const SESSION_HEADER: &str = "jolokia-session-id";

pub const API_PREFIX: &str = "/api/v1";
pub const LOGIN_PATH: &str = "/api/v1/jolokia/login";
pub const API_INFO_PATH: &str = "/api/v1/api-info";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid scheme `{0}`: expected http or https")]
    Scheme(String),
    #[error("invalid port `{0}`")]
    Port(String),
    #[error("invalid jolokia host")]
    Host,
}

pub fn validate_scheme(scheme: &str) -> Result<(), ValidationError> {
    match scheme {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::Scheme(other.to_string())),
    }
}

/// A port string is valid only when it parses into [1, 65535] and its
/// canonical form round-trips exactly, so leading zeros, signs, and
/// whitespace are all rejected.
pub fn validate_port(raw: &str) -> Result<u16, ValidationError> {
    let port: u16 = raw
        .parse()
        .map_err(|_| ValidationError::Port(raw.to_string()))?;
    if port == 0 || port.to_string() != raw {
        return Err(ValidationError::Port(raw.to_string()));
    }
    Ok(port)
}

pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty()
        || host.chars().any(char::is_whitespace)
        || host.contains('/')
        || host.contains(':')
    {
        return Err(ValidationError::Host);
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token missing or malformed")]
    Malformed,
    #[error("token verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Caller-chosen session key (broker alias).
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Mints and verifies the HS256 session tokens returned by login.
#[derive(Clone)]
pub struct TokenManager {
    enc: EncodingKey,
    dec: DecodingKey,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Build from a configured secret, or fall back to an ephemeral random
    /// secret. The fallback invalidates all tokens on restart, which the
    /// store-miss path in the middleware already handles.
    pub fn from_config(secret: Option<&str>, ttl: Duration) -> Self {
        let secret = match secret {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => {
                use rand::RngCore;
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                hex::encode(bytes)
            }
        };
        Self::new(secret.as_bytes(), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, session_key: &str) -> (String, i64) {
        let now = Utc::now();
        let exp = (now + self.ttl).timestamp();
        let claims = SessionClaims {
            sub: session_key.to_string(),
            exp,
            iat: now.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        let token =
            jsonwebtoken::encode(&header, &claims, &self.enc).expect("sign session token");
        (token, exp)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        if token.trim().is_empty() {
            return Err(TokenError::Malformed);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.dec, &validation)?;
        Ok(data.claims)
    }
}

/// Verification middleware for the versioned API.
///
/// The login path, the api-info path, and anything outside the `/api/v1`
/// prefix pass through untouched. Everything else needs a verifiable,
/// unexpired token whose session key still resolves in the store; a verified
/// token with no live client is treated as an expired session (covers a
/// store lost to restart). The resolved client is attached to the request's
/// extensions for the handler.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if !path.starts_with(API_PREFIX) || path == LOGIN_PATH || path == API_INFO_PATH {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingToken)?;

    let claims = state.tokens.verify(token).map_err(|err| {
        debug!(error = %err, "session token rejected");
        ApiError::InvalidToken
    })?;

    let client = state
        .sessions
        .get(&claims.sub)
        .ok_or(ApiError::SessionExpired)?;

    request.extensions_mut().insert(client);
    Ok(next.run(request).await)
}
