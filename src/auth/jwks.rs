//! Identity provider public keys
//!
//! Keys are fetched from the user pool's JWKS endpoint and cached by key
//! id for an hour. An unknown key id triggers one refetch, which also drops
//! keys the endpoint no longer publishes.

use anyhow::{Context, Result};
use jsonwebtoken::DecodingKey;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// JWKS responses larger than this are rejected
const MAX_JWKS_BYTES: u64 = 512 * 1024;

const MAX_CACHED_KEYS: u64 = 100;
const KEY_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

pub struct KeyStore {
    client: Client,
    jwks_url: Url,
    keys: Cache<String, Arc<DecodingKey>>,
}

impl KeyStore {
    pub fn new(jwks_url: Url) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            jwks_url,
            keys: Cache::builder()
                .max_capacity(MAX_CACHED_KEYS)
                .time_to_live(KEY_TTL)
                .build(),
        })
    }

    /// Key for `kid`, refetching the key set once when it is unknown
    pub async fn get_key(&self, kid: &str) -> Result<Option<Arc<DecodingKey>>> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(Some(key));
        }

        debug!(kid, "Signing key not cached");
        self.refresh().await?;
        Ok(self.keys.get(kid))
    }

    async fn refresh(&self) -> Result<()> {
        info!(url = %self.jwks_url, "Fetching JWKS");
        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .context("JWKS request failed")?
            .error_for_status()
            .context("JWKS endpoint returned an error")?;

        if let Some(len) = response.content_length() {
            if len > MAX_JWKS_BYTES {
                anyhow::bail!("JWKS response too large: {} bytes", len);
            }
        }

        let set: JwkSet = response.json().await.context("Failed to parse JWKS")?;
        let loaded = self.replace_keys(set);
        info!(keys = loaded, "JWKS loaded");
        Ok(())
    }

    /// Cache every RSA key of a key set and forget keys missing from it,
    /// returning how many were usable
    pub fn replace_keys(&self, set: JwkSet) -> usize {
        let mut published = HashSet::new();
        for jwk in set.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
                if let Ok(key) = DecodingKey::from_rsa_components(n, e) {
                    self.keys.insert(jwk.kid.clone(), Arc::new(key));
                    published.insert(jwk.kid);
                }
            }
        }

        for (kid, _) in self.keys.iter() {
            if !published.contains(kid.as_str()) {
                debug!(kid = %kid, "Signing key no longer published");
                self.keys.invalidate(kid.as_str());
            }
        }
        published.len()
    }
}
