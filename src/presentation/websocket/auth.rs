//! Connection Authentication
//!
//! Validates the credential presented at handshake time and resolves it to
//! an identity. The token travels as a query parameter of the upgrade
//! request, so a connection is refused before any event handler exists.

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config::JwtSettings;
use crate::domain::{User, UserRepository};
use crate::shared::error::AppError;

/// Why a connection was refused.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no token provided")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("unknown identity")]
    UnknownIdentity,

    #[error("identity lookup failed")]
    Lookup(#[from] AppError),
}

/// JWT claims for token validation
#[derive(Debug, serde::Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Resolve a handshake credential to an identity, or refuse the connection.
pub async fn authenticate<U: UserRepository>(
    token: Option<&str>,
    settings: &JwtSettings,
    user_repo: &U,
) -> Result<User, AuthError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    let user_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AuthError::InvalidToken)?;

    user_repo
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::UnknownIdentity)
}
