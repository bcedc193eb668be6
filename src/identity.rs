// src/identity.rs
//! Verification of Google Sign-In ID tokens.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no signing key with id {0}")]
    UnknownKey(String),
    #[error("failed to fetch signing keys: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("token has no subject")]
    MissingSubject,
}

/// Who a verified credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedIdentity {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

pub struct GoogleVerifier {
    client_id: String,
    certs_url: String,
    http: reqwest::Client,
    keys: Cache<String, DecodingKey>,
}

impl GoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            certs_url: GOOGLE_CERTS_URL.to_string(),
            http: reqwest::Client::new(),
            keys: Cache::builder()
                .max_capacity(64)
                .time_to_live(KEY_CACHE_TTL)
                .build(),
        }
    }

    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        tracing::info!("Fetching Google signing keys from {}", self.certs_url);
        let set: JwkSet = self
            .http
            .get(&self.certs_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        for jwk in set.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => self.keys.insert(jwk.kid, key).await,
                Err(e) => tracing::warn!("Skipping unusable signing key {}: {}", jwk.kid, e),
            }
        }
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }
        // Google rotates keys; an unseen kid means our copy is stale.
        self.refresh_keys().await?;
        self.keys
            .get(kid)
            .await
            .ok_or_else(|| IdentityError::UnknownKey(kid.to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header = decode_header(credential)?;
        let kid = header.kid.ok_or(IdentityError::MissingKeyId)?;
        let key = self.key_for(&kid).await?;
        let data = decode::<VerifiedIdentity>(credential, &key, &self.validation())?;
        if data.claims.sub.trim().is_empty() {
            return Err(IdentityError::MissingSubject);
        }
        Ok(data.claims)
    }
}
