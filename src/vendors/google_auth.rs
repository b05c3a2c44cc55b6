//! Google Cloud access tokens from a chain of credential strategies.
//!
//! Strategies are tried in order until one produces a token:
//!
//! 1. Inline service-account JSON
//! 2. Service-account key file
//! 3. A ready OAuth access token
//! 4. The GCE metadata server (ambient default credentials)
//!
//! Service accounts sign an RS256 JWT assertion and exchange it at the key's
//! `token_uri`. A successful token is cached until shortly before it expires.

use crate::config::GoogleCloudSettings;
use crate::error::{PodcastError, Result};
use crate::vendors::check_status;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account key file we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PodcastError::Auth(format!("invalid service-account JSON: {}", e)))
    }
}

/// One way of obtaining a token.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    ServiceAccount {
        origin: &'static str,
        key: ServiceAccountKey,
    },
    AccessToken(String),
    MetadataServer(String),
}

impl CredentialSource {
    fn label(&self) -> &'static str {
        match self {
            CredentialSource::ServiceAccount { origin, .. } => *origin,
            CredentialSource::AccessToken(_) => "access token",
            CredentialSource::MetadataServer(_) => "metadata server",
        }
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Credential chain plus token cache. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GoogleAuth {
    http: reqwest::Client,
    sources: Vec<CredentialSource>,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl GoogleAuth {
    /// Build the chain from settings. Unreadable or malformed keys are logged
    /// and left out; a chain with no usable source fails on first use.
    pub fn from_settings(settings: &GoogleCloudSettings, http: reqwest::Client) -> Self {
        let mut sources = Vec::new();

        if let Some(json) = settings.service_account_json.as_deref() {
            match ServiceAccountKey::from_json(json) {
                Ok(key) => sources.push(CredentialSource::ServiceAccount {
                    origin: "inline service account",
                    key,
                }),
                Err(e) => warn!(error = %e, "Ignoring inline service-account credentials"),
            }
        }

        if let Some(path) = settings.credentials_path.as_deref() {
            match std::fs::read_to_string(path)
                .map_err(|e| PodcastError::Auth(e.to_string()))
                .and_then(|data| ServiceAccountKey::from_json(&data))
            {
                Ok(key) => sources.push(CredentialSource::ServiceAccount {
                    origin: "service account file",
                    key,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring service-account file"),
            }
        }

        if let Some(token) = settings.access_token.as_deref().map(str::trim) {
            if !token.is_empty() {
                sources.push(CredentialSource::AccessToken(token.to_string()));
            }
        }

        if settings.use_metadata_server {
            sources.push(CredentialSource::MetadataServer(settings.metadata_url.clone()));
        }

        Self::with_sources(sources, http)
    }

    pub fn with_sources(sources: Vec<CredentialSource>, http: reqwest::Client) -> Self {
        debug!(
            strategies = ?sources.iter().map(CredentialSource::label).collect::<Vec<_>>(),
            "Google credential chain"
        );
        Self {
            http,
            sources,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Return a valid access token, trying each strategy in turn.
    #[instrument(level = "info", skip_all)]
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.token.clone());
            }
        }

        let mut failures = Vec::new();
        for source in &self.sources {
            match self.fetch(source).await {
                Ok(token) => {
                    info!(strategy = source.label(), "Obtained Google Cloud access token");
                    let value = token.token.clone();
                    *cached = Some(token);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(strategy = source.label(), error = %e, "Credential strategy failed; trying next");
                    failures.push(format!("{}: {}", source.label(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(PodcastError::Auth("no Google Cloud credentials configured".to_string()));
        }
        Err(PodcastError::Auth(failures.join("; ")))
    }

    async fn fetch(&self, source: &CredentialSource) -> Result<CachedToken> {
        match source {
            CredentialSource::ServiceAccount { key, .. } => self.exchange_jwt(key).await,
            CredentialSource::AccessToken(token) => Ok(CachedToken {
                token: token.clone(),
                expires_at: None,
            }),
            CredentialSource::MetadataServer(url) => {
                let response = self
                    .http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                let body: TokenResponse = check_status("metadata", response).await?.json().await?;
                Ok(to_cached(body))
            }
        }
    }

    async fn exchange_jwt(&self, key: &ServiceAccountKey) -> Result<CachedToken> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let assertion = sign_assertion(key, token_uri, Utc::now().timestamp())?;
        let response = self
            .http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body: TokenResponse = check_status("oauth2", response).await?.json().await?;
        Ok(to_cached(body))
    }
}

fn to_cached(body: TokenResponse) -> CachedToken {
    let expires_at = body
        .expires_in
        .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN));
    CachedToken {
        token: body.access_token,
        expires_at,
    }
}

/// Sign the JWT bearer assertion for a service account.
fn sign_assertion(key: &ServiceAccountKey, token_uri: &str, now: i64) -> Result<String> {
    let claims = JwtClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: token_uri,
        iat: now,
        exp: now + 3600,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| PodcastError::Auth(format!("invalid service-account private key: {}", e)))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| PodcastError::Auth(format!("failed to sign JWT: {}", e)))
}
