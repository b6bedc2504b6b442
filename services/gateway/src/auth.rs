use crate::config::{AuthKey, ConfigError};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use types::ids::AccountNumber;

/// Claims carried by tokens issued by the user service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account the bearer owns
    pub acct: String,
    #[serde(default)]
    pub user: Option<String>,
    pub exp: u64,
}

/// Verifies bearer tokens against the configured key
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_key(auth_key: &AuthKey) -> Result<Self, ConfigError> {
        match auth_key {
            AuthKey::Secret(secret) => Ok(Self::hs256(secret.as_bytes())),
            AuthKey::PublicKeyPath(path) => {
                let invalid = |reason: String| ConfigError::Invalid {
                    var: "PUB_KEY_PATH",
                    value: path.display().to_string(),
                    reason,
                };
                let pem = std::fs::read(path).map_err(|e| invalid(e.to_string()))?;
                let key = DecodingKey::from_rsa_pem(&pem).map_err(|e| invalid(e.to_string()))?;
                Ok(Self {
                    key,
                    validation: Validation::new(Algorithm::RS256),
                })
            }
        }
    }

    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))
    }
}

/// Caller identity taken from a verified bearer token
pub struct AuthenticatedUser {
    pub account: AccountNumber,
    /// Raw token, forwarded to downstream services
    pub token: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing authentication credentials".into()))?;
        let header = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid header string".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".into()))?;

        let claims = state.verifier.verify(token)?;
        Ok(AuthenticatedUser {
            account: AccountNumber::new(claims.acct),
            token: token.to_string(),
        })
    }
}
