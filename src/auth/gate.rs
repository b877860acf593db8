//! The authentication gate: turns an `Authorization` header into an
//! authenticated user, or refuses.
//!
//! A token is accepted only if its signature verifies *and* it is still in the
//! owner's token set. The second check is what makes logout meaningful for
//! otherwise self-verifying tokens.

use std::fmt;

use crate::auth::token::{TokenError, TokenService};
use crate::models::User;
use crate::store::{Store, StoreError};

/// The identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// The raw bearer token that authenticated this request.
    pub token: String,
}

/// Internal reason for a rejected request. Only ever logged; clients see a
/// single generic 401.
#[derive(Debug)]
pub enum AuthFailure {
    MissingToken,
    InvalidToken(TokenError),
    RevokedOrUnknownToken,
    Store(StoreError),
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthFailure::MissingToken => write!(f, "missing bearer token"),
            AuthFailure::InvalidToken(e) => write!(f, "invalid token: {}", e),
            AuthFailure::RevokedOrUnknownToken => write!(f, "token revoked or user unknown"),
            AuthFailure::Store(e) => write!(f, "store failure during authentication: {}", e),
        }
    }
}

/// Pulls the token out of a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn authenticate(
    store: &dyn Store,
    tokens: &TokenService,
    authorization: Option<&str>,
) -> Result<AuthContext, AuthFailure> {
    let token = bearer_token(authorization).ok_or(AuthFailure::MissingToken)?;
    let claims = tokens.verify(token).map_err(AuthFailure::InvalidToken)?;

    let user = store
        .find_user_with_token(claims.sub, token)
        .await
        .map_err(AuthFailure::Store)?
        .ok_or(AuthFailure::RevokedOrUnknownToken)?;

    Ok(AuthContext {
        user,
        token: token.to_string(),
    })
}
