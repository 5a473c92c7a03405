//! Cognito access token validation
//!
//! Tokens are RS256 JWTs signed by the user pool. The `scope` claim carries
//! space separated `<app_name>/<scope>` entries.

use super::jwks::KeyStore;
use super::ServiceUser;
use crate::config::AuthConfig;
use crate::error::{unauthorized, AppError};
use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;

const INVALID_TOKEN: &str = "Invalid Cognito Authentication Token";

/// Claims of a Cognito access token used by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitoClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

pub struct CognitoAuth {
    app_name: String,
    header_name: String,
    header_prefix: String,
    issuer: String,
    check_expiration: bool,
    write_scopes: Vec<String>,
    keys: KeyStore,
}

impl CognitoAuth {
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        let jwks_url = url::Url::parse(&config.jwks_url)?;
        Ok(Self::with_keys(config, KeyStore::new(jwks_url)?))
    }

    pub fn with_keys(config: &AuthConfig, keys: KeyStore) -> Self {
        Self {
            app_name: config.app_name.clone(),
            header_name: config.jwt_header_name.clone(),
            header_prefix: config.jwt_header_prefix.clone(),
            issuer: config.token_issuer(),
            check_expiration: config.check_token_expiration,
            write_scopes: config.write_scopes.clone(),
            keys,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Scopes required on write requests, empty when writes are unrestricted
    pub fn write_scopes(&self) -> &[String] {
        &self.write_scopes
    }

    /// Token carried by the configured header, `None` when the header is absent
    pub fn get_token(&self, headers: &HeaderMap) -> Result<Option<String>, AppError> {
        let value = match headers.get(self.header_name.as_str()) {
            Some(value) => value
                .to_str()
                .map_err(|_| unauthorized("Invalid Cognito JWT header", "Header is not valid text"))?,
            None => return Ok(None),
        };
        if value.trim().is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = value.split_whitespace().collect();

        if self.header_prefix.is_empty() {
            if parts.len() > 1 {
                return Err(unauthorized("Invalid Cognito JWT Header", "Token contains spaces"));
            }
            return Ok(Some(value.to_string()));
        }

        if !parts[0].eq_ignore_ascii_case(&self.header_prefix) {
            return Err(unauthorized(
                "Invalid Cognito JWT header",
                "Unsupported authorization type. Header prefix does not match.",
            ));
        }
        match parts.len() {
            1 => Err(unauthorized("Invalid Cognito JWT header", "Token missing")),
            2 => Ok(Some(parts[1].to_string())),
            _ => Err(unauthorized("Invalid Cognito JWT header", "Token contains spaces")),
        }
    }

    /// Verify signature, issuer and (unless disabled) expiry of a token
    pub async fn decode_token(&self, token: &str) -> Result<CognitoClaims, AppError> {
        let header =
            decode_header(token).map_err(|_| unauthorized(INVALID_TOKEN, "Malformed Authentication Token"))?;
        let kid = header
            .kid
            .ok_or_else(|| unauthorized(INVALID_TOKEN, "Token header has no key id"))?;

        let key = self
            .keys
            .get_key(&kid)
            .await
            .map_err(|e| {
                error!(error = %e, "Unable to load user pool keys");
                unauthorized(INVALID_TOKEN, "Unable to load public keys")
            })?
            .ok_or_else(|| unauthorized(INVALID_TOKEN, "Public key not found in jwks.json"))?;

        let data = decode::<CognitoClaims>(token, &key, &self.validation()).map_err(|e| {
            let description = match e.kind() {
                ErrorKind::ExpiredSignature => "Token is expired".to_string(),
                ErrorKind::InvalidIssuer => "Token was not issued for this pool".to_string(),
                ErrorKind::InvalidSignature => "Signature verification failed".to_string(),
                ErrorKind::InvalidAlgorithm => "Unsupported token algorithm".to_string(),
                _ => e.to_string(),
            };
            unauthorized(INVALID_TOKEN, description)
        })?;

        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;
        if !self.check_expiration {
            validation.validate_exp = false;
            validation.required_spec_claims.remove("exp");
        }
        validation
    }

    /// Service identity with the scopes that belong to this application
    pub fn get_user(&self, claims: &CognitoClaims) -> ServiceUser {
        let prefix = format!("{}/", self.app_name);
        let scopes = claims
            .scope
            .as_deref()
            .unwrap_or_default()
            .split(' ')
            .filter(|scope| scope.contains(self.app_name.as_str()))
            .map(|scope| scope.replace(prefix.as_str(), ""))
            .collect();

        ServiceUser {
            client_id: claims.client_id.clone(),
            scopes,
        }
    }

    /// Resolve the caller of a request
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<ServiceUser, AppError> {
        let token = self.get_token(headers)?.ok_or_else(|| {
            unauthorized(
                "Authorization Required",
                format!(
                    "Request does not contain a access token in the \"{}\" header.",
                    self.header_name
                ),
            )
        })?;

        let claims = self.decode_token(&token).await?;
        Ok(self.get_user(&claims))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::jwks::JwkSet;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/jwt_private.pem");
    const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");
    pub(crate) const ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_test";

    pub(crate) fn auth_config(prefix: &str, write_scopes: &[&str]) -> AuthConfig {
        AuthConfig {
            app_name: "galactic_core".to_string(),
            region: "us-east-1".to_string(),
            userpool_id: "us-east-1_test".to_string(),
            issuer: None,
            jwt_header_name: "Authorization".to_string(),
            jwt_header_prefix: prefix.to_string(),
            check_token_expiration: true,
            jwks_url: "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            write_scopes: write_scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) async fn cognito(config: &AuthConfig) -> CognitoAuth {
        let keys = KeyStore::new(url::Url::parse(&config.jwks_url).unwrap()).unwrap();
        let set: JwkSet = serde_json::from_str(JWKS).unwrap();
        keys.replace_keys(set);
        CognitoAuth::with_keys(config, keys)
    }

    pub(crate) fn sign(claims: serde_json::Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
    }

    pub(crate) fn token_with_scopes(scope: &str) -> String {
        sign(
            serde_json::json!({
                "sub": "svc-123",
                "client_id": "svc-123",
                "token_use": "access",
                "scope": scope,
                "iss": ISSUER,
                "exp": chrono::Utc::now().timestamp() + 600,
            }),
            "test-key-1",
        )
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn description(err: AppError) -> (String, String) {
        match err {
            AppError::Unauthorized { error, description } => (error, description),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_token_with_prefix() {
        let auth = cognito(&auth_config("Bearer", &[])).await;

        assert_eq!(auth.get_token(&HeaderMap::new()).unwrap(), None);
        assert_eq!(
            auth.get_token(&headers("bearer abc.def")).unwrap().as_deref(),
            Some("abc.def")
        );

        let (error, desc) = description(auth.get_token(&headers("Basic abc")).unwrap_err());
        assert_eq!(error, "Invalid Cognito JWT header");
        assert_eq!(desc, "Unsupported authorization type. Header prefix does not match.");

        let (_, desc) = description(auth.get_token(&headers("Bearer")).unwrap_err());
        assert_eq!(desc, "Token missing");

        let (_, desc) = description(auth.get_token(&headers("Bearer a b")).unwrap_err());
        assert_eq!(desc, "Token contains spaces");
    }

    #[tokio::test]
    async fn test_get_token_without_prefix() {
        let auth = cognito(&auth_config("", &[])).await;

        assert_eq!(auth.get_token(&headers("abc.def")).unwrap().as_deref(), Some("abc.def"));
        let (error, desc) = description(auth.get_token(&headers("Bearer abc")).unwrap_err());
        assert_eq!(error, "Invalid Cognito JWT Header");
        assert_eq!(desc, "Token contains spaces");
    }

    #[tokio::test]
    async fn test_decode_valid_token() {
        let auth = cognito(&auth_config("Bearer", &[])).await;
        let token = token_with_scopes("galactic_core/read");

        let claims = assert_ok!(auth.decode_token(&token).await);
        assert_eq!(claims.client_id.as_deref(), Some("svc-123"));
        assert_eq!(claims.token_use.as_deref(), Some("access"));
    }

    #[tokio::test]
    async fn test_decode_rejects_wrong_issuer_and_expired() {
        let auth = cognito(&auth_config("Bearer", &[])).await;

        let foreign = sign(
            serde_json::json!({"iss": "https://issuer.example.com", "exp": chrono::Utc::now().timestamp() + 600}),
            "test-key-1",
        );
        let (error, _) = description(assert_err!(auth.decode_token(&foreign).await));
        assert_eq!(error, INVALID_TOKEN);

        let expired = sign(
            serde_json::json!({"iss": ISSUER, "exp": chrono::Utc::now().timestamp() - 3600}),
            "test-key-1",
        );
        let (_, desc) = description(assert_err!(auth.decode_token(&expired).await));
        assert_eq!(desc, "Token is expired");
    }

    #[tokio::test]
    async fn test_expiration_check_can_be_disabled() {
        let mut config = auth_config("Bearer", &[]);
        config.check_token_expiration = false;
        let auth = cognito(&config).await;

        let expired = sign(
            serde_json::json!({"iss": ISSUER, "exp": chrono::Utc::now().timestamp() - 3600}),
            "test-key-1",
        );
        assert_ok!(auth.decode_token(&expired).await);

        let no_exp = sign(serde_json::json!({"iss": ISSUER}), "test-key-1");
        assert_ok!(auth.decode_token(&no_exp).await);
    }

    #[tokio::test]
    async fn test_decode_rejects_malformed_token() {
        let auth = cognito(&auth_config("Bearer", &[])).await;
        let (_, desc) = description(assert_err!(auth.decode_token("not-a-jwt").await));
        assert_eq!(desc, "Malformed Authentication Token");
    }

    #[tokio::test]
    async fn test_get_user_filters_app_scopes() {
        let auth = cognito(&auth_config("Bearer", &[])).await;
        let claims = CognitoClaims {
            sub: None,
            client_id: Some("12345".to_string()),
            scope: Some("galactic_core/foo galactic_core/bar otherapp/baz".to_string()),
            token_use: None,
            exp: None,
            iss: None,
        };

        let user = auth.get_user(&claims);
        assert_eq!(user.client_id.as_deref(), Some("12345"));
        assert_eq!(user.scopes, vec!["foo", "bar"]);
        assert_eq!(user.to_string(), "ServiceUser(12345)");
    }

    #[tokio::test]
    async fn test_authenticate_without_header() {
        let auth = cognito(&auth_config("Bearer", &[])).await;
        let (error, desc) = description(auth.authenticate(&HeaderMap::new()).await.unwrap_err());

        assert_eq!(error, "Authorization Required");
        assert_eq!(
            desc,
            "Request does not contain a access token in the \"Authorization\" header."
        );
    }
}
