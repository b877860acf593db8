use crate::error::AppError;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Unique token id, so two tokens issued in the same second still differ.
    pub jti: Uuid,
    /// Expiration timestamp, present only when a token lifetime is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Why a token failed verification. Revocation is not checked here.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Issues and verifies signed session tokens.
///
/// Tokens are stateless to this service; the caller is responsible for storing
/// an issued token in the user's token set, and the authentication gate for
/// checking that it is still there.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Option<chrono::Duration>,
}

impl TokenService {
    /// `ttl_hours = None` issues tokens that never expire.
    pub fn new(secret: &str, ttl_hours: Option<i64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: ttl_hours.map(chrono::Duration::hours),
        }
    }

    /// Generates a token bound to `user_id`.
    ///
    /// # Returns
    /// The encoded token, or `AppError::InternalServerError` if encoding fails.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks the signature and structure of `token` and decodes its claims.
    ///
    /// Expiry is enforced only when the service was built with a lifetime.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if self.ttl.is_none() {
            validation.validate_exp = false;
            validation.required_spec_claims.clear();
        }

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_verification() {
        let service = TokenService::new("test_secret_for_gen_verify", None);
        let user_id = Uuid::new_v4();
        let token = service.issue(user_id).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_tokens_are_distinct() {
        let service = TokenService::new("secret", None);
        let user_id = Uuid::new_v4();
        assert_ne!(service.issue(user_id).unwrap(), service.issue(user_id).unwrap());
    }

    #[test]
    fn test_token_expiration() {
        let service = TokenService::new("test_secret_for_expiration", Some(1));

        let issued = chrono::Utc::now() - chrono::Duration::hours(3);
        let claims_expired = Claims {
            sub: Uuid::new_v4(),
            iat: issued.timestamp(),
            jti: Uuid::new_v4(),
            exp: Some((issued + chrono::Duration::hours(1)).timestamp()),
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        assert_eq!(service.verify(&expired_token), Err(TokenError::Expired));

        let fresh = service.issue(Uuid::new_v4()).unwrap();
        assert!(service.verify(&fresh).unwrap().exp.is_some());
    }

    #[test]
    fn test_invalid_token_signature() {
        let issuer = TokenService::new("one_secret", None);
        let verifier = TokenService::new("a_completely_different_secret", None);

        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_malformed_token() {
        let service = TokenService::new("secret", None);
        assert!(matches!(
            service.verify("73294bhdxyg263g"),
            Err(TokenError::Malformed(_))
        ));
    }
}
