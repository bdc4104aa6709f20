//! Requester identification via JWT
//!
//! The token subject becomes the cache scope for every query the requester
//! issues, so one requester's results are never served to another.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default token lifetime in hours
pub const DEFAULT_TOKEN_HOURS: i64 = 24;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (requester identifier)
    pub sub: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

/// Authenticated requester, attached to request extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(pub String);

impl Requester {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Issues and validates HS256 requester tokens
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for a requester, valid for `expires_in_hours` (default 24)
    pub fn issue(&self, requester_id: &str, expires_in_hours: Option<i64>) -> Result<String> {
        if requester_id.trim().is_empty() {
            return Err(anyhow!("Requester id must not be empty"));
        }

        let hours = expires_in_hours.unwrap_or(DEFAULT_TOKEN_HOURS);
        let now = Utc::now();
        let exp = Duration::try_hours(hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| anyhow!("Token lifetime of {} hours is out of range", hours))?;

        let claims = Claims {
            sub: requester_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to generate token: {}", e))
    }

    /// Validate a token and return the requester it names
    pub fn verify(&self, token: &str) -> Result<Requester> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow!("Invalid token: {}", e))?;

        Ok(Requester(token_data.claims.sub))
    }

    /// Extract token from an Authorization header value (Bearer scheme)
    pub fn bearer_token(auth_header: &str) -> Result<&str> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| anyhow!("Invalid authorization header format"))?
            .trim();

        if token.is_empty() {
            return Err(anyhow!("Empty token"));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let auth = JwtAuth::new("test_secret_key_12345");

        let token = auth.issue("analyst-7", Some(1)).unwrap();
        assert!(!token.is_empty());

        let requester = auth.verify(&token).unwrap();
        assert_eq!(requester.id(), "analyst-7");
    }

    #[test]
    fn test_issue_rejects_out_of_range_lifetime() {
        let auth = JwtAuth::new("secret");
        assert!(auth.issue("analyst-7", Some(9_999_999_999_999_999)).is_err());
        assert!(auth.issue("analyst-7", Some(i64::MIN)).is_err());
    }

    #[test]
    fn test_issue_rejects_empty_requester() {
        let auth = JwtAuth::new("test_secret_key_12345");
        assert!(auth.issue("  ", None).is_err());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = JwtAuth::new("secret-a");
        let verifier = JwtAuth::new("secret-b");

        let token = issuer.issue("analyst-7", None).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let auth = JwtAuth::new("test_secret_key_12345");
        assert!(auth.verify("invalid.token.here").is_err());
    }

    #[test]
    fn test_bearer_token() {
        let token = JwtAuth::bearer_token("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9").unwrap();
        assert_eq!(token, "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");

        assert!(JwtAuth::bearer_token("Basic dXNlcjpwYXNz").is_err());
        assert!(JwtAuth::bearer_token("Bearer ").is_err());
    }
}
