/// Google ID token verification
///
/// Validates RS256 ID tokens against Google's published JWKS, checking
/// signature, audience, issuer, and expiry. Signing keys are cached in
/// memory and refetched after a TTL.
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Issuers accepted on Google ID tokens
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// How long fetched signing keys stay cached
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Identity asserted by a verified federated token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Stable subject identifier from the provider
    pub subject_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies federated identity tokens
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> ApiResult<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Verifies Google ID tokens against Google's signing keys
pub struct GoogleVerifier {
    client_id: String,
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CacheEntry>>,
}

impl GoogleVerifier {
    pub fn new(client_id: &str, jwks_url: &str) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client_id: client_id.to_string(),
            jwks_url: jwks_url.to_string(),
            client,
            cache: RwLock::new(None),
        })
    }

    /// Fetch the key set, serving from cache while fresh
    async fn get_jwks(&self) -> ApiResult<JwkSet> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if entry.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });

        Ok(jwks)
    }

    async fn fetch_jwks(&self) -> ApiResult<JwkSet> {
        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            ApiError::InvalidFederatedToken(format!("Failed to fetch signing keys: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ApiError::InvalidFederatedToken(format!(
                "Signing key endpoint returned {}",
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            ApiError::InvalidFederatedToken(format!("Invalid signing key response: {}", e))
        })
    }

    async fn decoding_key_for(&self, kid: &str) -> ApiResult<DecodingKey> {
        let jwks = self.get_jwks().await?;
        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| {
                ApiError::InvalidFederatedToken(format!("Unknown signing key: {}", kid))
            })?;

        jwk_to_decoding_key(jwk)
    }
}

fn jwk_to_decoding_key(jwk: &Jwk) -> ApiResult<DecodingKey> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| ApiError::InvalidFederatedToken(format!("Invalid signing key: {}", e))),
        _ => Err(ApiError::InvalidFederatedToken(
            "Unsupported signing key type".to_string(),
        )),
    }
}

/// Google signs ID tokens with RS256 only; the header's alg claim is
/// not trusted to pick anything else
fn id_token_validation(client_id: &str) -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[client_id]);
    validation.set_issuer(&GOOGLE_ISSUERS);
    validation
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> ApiResult<VerifiedIdentity> {
        let header = decode_header(id_token)
            .map_err(|e| ApiError::InvalidFederatedToken(format!("Malformed token: {}", e)))?;
        let kid = header.kid.ok_or_else(|| {
            ApiError::InvalidFederatedToken("Token header missing key id".to_string())
        })?;

        let key = self.decoding_key_for(&kid).await?;
        let validation = id_token_validation(&self.client_id);

        let token_data = decode::<GoogleClaims>(id_token, &key, &validation)
            .map_err(|e| ApiError::InvalidFederatedToken(e.to_string()))?;

        let claims = token_data.claims;
        let email = claims.email.ok_or_else(|| {
            ApiError::InvalidFederatedToken("Token carries no email claim".to_string())
        })?;

        Ok(VerifiedIdentity {
            subject_id: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
        })
    }
}
