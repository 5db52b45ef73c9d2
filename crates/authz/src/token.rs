//! Signed, time-limited access tokens (HS256 JWT) carrying a subject claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed payload, missing subject, or expired.
    #[error("invalid token")]
    InvalidToken,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign a token for `subject` expiring `ttl` from now.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Sign a token for `subject` with the configured lifetime.
    pub fn issue_access_token(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(subject, self.default_ttl)
    }

    /// Verify signature and expiry, returning the subject.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            TokenError::InvalidToken
        })?;

        if decoded.claims.sub.is_empty() {
            return Err(TokenError::InvalidToken);
        }

        Ok(decoded.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::minutes(30))
    }

    #[test]
    fn issued_token_validates_to_subject() {
        let tokens = service("test-secret");
        let token = tokens.issue_access_token("a@x.com").unwrap();

        assert_eq!(tokens.validate(&token).unwrap(), "a@x.com");
    }

    #[test]
    fn expiry_is_thirty_minutes_out() {
        let tokens = service("test-secret");
        let token = tokens.issue_access_token("a@x.com").unwrap();

        let decoded = decode::<Claims>(&token, &tokens.decoding_key, &tokens.validation).unwrap();
        let remaining = decoded.claims.exp - Utc::now().timestamp();
        assert!((29 * 60..=30 * 60).contains(&remaining));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("test-secret");
        let token = tokens.issue("a@x.com", Duration::seconds(-5)).unwrap();

        assert!(matches!(
            tokens.validate(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service("secret-one").issue_access_token("a@x.com").unwrap();

        assert!(matches!(
            service("secret-two").validate(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = service("test-secret");
        let honest = tokens.issue_access_token("a@x.com").unwrap();
        let other = tokens.issue_access_token("admin@x.com").unwrap();

        let honest_parts: Vec<&str> = honest.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", honest_parts[0], other_parts[1], honest_parts[2]);

        assert!(tokens.validate(&forged).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service("test-secret");
        assert!(tokens.validate("not.a.token").is_err());
        assert!(tokens.validate("").is_err());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let tokens = service("test-secret");
        let token = tokens.issue("", Duration::minutes(5)).unwrap();
        assert!(tokens.validate(&token).is_err());
    }
}
