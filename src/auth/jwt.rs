//! JWT issuance and validation.
//!
//! Tokens are HS256 with a short claim set. The `role` claim is a copy
//! taken at issuance for logging and dev mode; authorization always
//! re-reads the stored profile. `token_version` must match the profile's
//! current value, so bumping the profile invalidates every outstanding
//! token at once.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::TrellisError;

const DEV_SECRET: &str = "dev-only-insecure-secret";

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Profile ObjectId as a hex string
    pub sub: String,
    /// Login identifier (email)
    pub identifier: String,
    /// Role spelling at issuance time; advisory only
    pub role: String,
    /// Must match the profile's current token_version
    pub token_version: i32,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Input for token generation
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub profile_id: String,
    pub identifier: String,
    pub role: String,
    pub token_version: i32,
}

/// Result of token verification
#[derive(Debug)]
pub struct TokenValidationResult {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub error: Option<String>,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, TrellisError> {
        if secret.len() < 16 {
            return Err(TrellisError::Internal(
                "JWT secret must be at least 16 characters".into(),
            ));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        })
    }

    /// Dev-mode validator with a fixed insecure secret.
    pub fn new_dev() -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(DEV_SECRET.as_bytes()),
            decoding_key: DecodingKey::from_secret(DEV_SECRET.as_bytes()),
            expiry_seconds: 86400,
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    pub fn generate_token(&self, input: TokenInput) -> Result<String, TrellisError> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: input.profile_id,
            identifier: input.identifier,
            role: input.role,
            token_version: input.token_version,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TrellisError::Auth(format!("Failed to generate token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> TokenValidationResult {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenValidationResult {
                valid: true,
                claims: Some(data.claims),
                error: None,
            },
            Err(e) => TokenValidationResult {
                valid: false,
                claims: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Extract a bearer token from an Authorization header value.
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> TokenInput {
        TokenInput {
            profile_id: "64f000000000000000000001".to_string(),
            identifier: "founder@example.com".to_string(),
            role: "entrepreneur".to_string(),
            token_version: 1,
        }
    }

    #[test]
    fn generate_and_verify_round_trip() {
        let jwt = JwtValidator::new_dev();
        let token = jwt.generate_token(input()).unwrap();

        let result = jwt.verify_token(&token);
        assert!(result.valid);
        let claims = result.claims.unwrap();
        assert_eq!(claims.identifier, "founder@example.com");
        assert_eq!(claims.token_version, 1);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let jwt = JwtValidator::new_dev();
        let mut token = jwt.generate_token(input()).unwrap();
        token.push('x');

        let result = jwt.verify_token(&token);
        assert!(!result.valid);
        assert!(result.claims.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let jwt_a = JwtValidator::new("secret-aaaaaaaaaaaaaaaa".to_string(), 3600).unwrap();
        let jwt_b = JwtValidator::new("secret-bbbbbbbbbbbbbbbb".to_string(), 3600).unwrap();

        let token = jwt_a.generate_token(input()).unwrap();
        assert!(!jwt_b.verify_token(&token).valid);
    }

    #[test]
    fn expired_token_is_invalid() {
        let jwt = JwtValidator::new_dev();
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "64f000000000000000000001".to_string(),
            identifier: "founder@example.com".to_string(),
            role: "entrepreneur".to_string(),
            token_version: 1,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(DEV_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(!jwt.verify_token(&token).valid);
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(JwtValidator::new("short".to_string(), 3600).is_err());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
