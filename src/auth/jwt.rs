use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::{ConfigError, JwtConfig, MIN_JWT_SECRET_LEN},
    error::AppError,
    state::AppState,
    users::repo_types::User,
};

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // email
    pub id: i64,      // user id
    pub name: String, // display name
    pub jti: String,  // unique token id
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Ten years.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> anyhow::Result<String>;
}

/// HS256 signing and verification keys plus the claims policy.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    /// Fails when the secret is shorter than 256 bits.
    pub fn new(cfg: &JwtConfig) -> Result<Self, ConfigError> {
        let secret = cfg.secret.as_bytes();
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret(secret.len()));
        }
        // Positive, and small enough that `now + ttl` stays representable.
        let ttl_secs = Some(cfg.ttl_minutes)
            .filter(|m| *m > 0 && *m <= MAX_TTL_MINUTES)
            .and_then(|m| m.checked_mul(60))
            .and_then(|s| u64::try_from(s).ok())
            .ok_or_else(|| ConfigError::Invalid {
                name: "JWT_TTL_MINUTES",
                value: cfg.ttl_minutes.to_string(),
            })?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

impl TokenIssuer for JwtKeys {
    fn issue(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.email.clone(),
            id: user.id,
            name: user.name.clone().unwrap_or_default(),
            jti: Uuid::new_v4().to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = user.id, "jwt signed");
        Ok(token)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

/// Authenticated caller, identified by the numeric `id` claim.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthenticated("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AppError::Unauthenticated("Invalid Authorization header"))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims.id)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::Unauthenticated("Invalid or expired token"))
            }
        }
    }
}
