/// Session token issuing and verification
///
/// Tokens are HMAC-SHA256 JWTs carrying the account email as subject
/// plus the numeric user id. Expiry is checked with zero leeway.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (the account email)
    pub sub: String,
    /// Numeric user id
    pub user_id: i64,
    /// Account email, duplicated for convenience
    pub email: String,
    /// Issued at (unix timestamp)
    pub iat: i64,
    /// Expiration (unix timestamp)
    pub exp: i64,
}

/// Signs and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a token for the given account
    pub fn issue(&self, user_id: i64, email: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a token's signature and expiry, returning its claims
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::InvalidToken("Invalid token signature".to_string())
                }
                _ => ApiError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Decode claims without checking expiry; the signature is still verified
    fn decode_claims(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.validate_exp = false;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Extract the subject email from a token, expired or not
    pub fn subject_of(&self, token: &str) -> ApiResult<String> {
        Ok(self.decode_claims(token)?.sub)
    }

    /// Extract the expiration instant from a token, expired or not
    pub fn expiry_of(&self, token: &str) -> ApiResult<DateTime<Utc>> {
        let claims = self.decode_claims(token)?;
        Utc.timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| ApiError::InvalidToken("Invalid expiration timestamp".to_string()))
    }

    /// Whether a token's expiry has passed
    pub fn is_expired(&self, token: &str) -> ApiResult<bool> {
        let claims = self.decode_claims(token)?;
        Ok(claims.exp < Utc::now().timestamp())
    }

    /// Check that a token is well formed, unexpired, and issued for the
    /// given email. Any decoding failure counts as invalid.
    pub fn validate(&self, token: &str, email: &str) -> bool {
        match self.decode_claims(token) {
            Ok(claims) => claims.sub == email && claims.exp >= Utc::now().timestamp(),
            Err(_) => false,
        }
    }
}
