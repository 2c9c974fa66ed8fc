//! Service-account OAuth
//!
//! Access tokens come from the JWT bearer grant: a claim set signed with the
//! service account's RSA key is exchanged at the token endpoint for a
//! short-lived bearer token.

use chrono::Utc;
use estatemap_core::{ConfigError, FetchError};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::DEFAULT_TOKEN_URI;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// SERVICE ACCOUNT KEY
// ============================================================================

/// Service-account credentials. The private key is never printed.
#[derive(Debug)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: SecretString,
    pub token_uri: String,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Deserialize)]
struct KeyFile {
    client_email: Option<String>,
    private_key: Option<String>,
    token_uri: Option<String>,
    project_id: Option<String>,
    private_key_id: Option<String>,
    client_id: Option<String>,
}

impl ServiceAccountKey {
    /// Escaped `\n` sequences in the key (common when passed through env) are unescaped.
    pub fn new(client_email: impl Into<String>, private_key: &str, token_uri: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: SecretString::from(private_key.replace("\\n", "\n").trim().to_string()),
            token_uri: token_uri.into(),
            project_id: None,
            private_key_id: None,
            client_id: None,
        }
    }

    pub fn with_project_id(mut self, project_id: Option<String>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn with_private_key_id(mut self, private_key_id: Option<String>) -> Self {
        self.private_key_id = private_key_id;
        self
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    /// Parse a downloaded service-account key JSON.
    pub fn from_json(source_name: &str, text: &str) -> Result<Self, ConfigError> {
        let file: KeyFile = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

        let (Some(client_email), Some(private_key)) = (file.client_email, file.private_key) else {
            return Err(ConfigError::MissingRequired {
                field: format!("{}: client_email and private_key", source_name),
            });
        };

        Ok(Self::new(
            client_email,
            &private_key,
            file.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        )
        .with_project_id(file.project_id)
        .with_private_key_id(file.private_key_id)
        .with_client_id(file.client_id))
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, ConfigError> {
        EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes()).map_err(|e| {
            ConfigError::invalid("private_key", "<redacted>", format!("not an RSA PEM key: {}", e))
        })
    }
}

// ============================================================================
// TOKEN SOURCE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GrantClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    value: SecretString,
    refresh_at: Instant,
}

/// Issues and caches bearer tokens for one service account.
pub struct TokenSource {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    pub fn new(http: reqwest::Client, key: &ServiceAccountKey) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            key_id: key.private_key_id.clone(),
            encoding_key: key.encoding_key()?,
            cached: Mutex::new(None),
        })
    }

    /// A valid bearer token, reusing the cached one until shortly before expiry.
    ///
    /// Concurrent callers wait on the same refresh.
    pub async fn access_token(&self) -> Result<SecretString, FetchError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(SecretString::from(token.value.expose_secret().to_string()));
        }

        let fresh = self.request_token().await?;
        let value = SecretString::from(fresh.value.expose_secret().to_string());
        *cached = Some(fresh);
        Ok(value)
    }

    pub(crate) fn assertion(&self, issued_at: i64) -> Result<String, FetchError> {
        let claims = GrantClaims {
            iss: self.client_email.clone(),
            scope: SHEETS_READONLY_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| FetchError::unavailable(format!("failed to sign token assertion: {}", e)))
    }

    async fn request_token(&self) -> Result<CachedToken, FetchError> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::unavailable(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::unavailable(format!(
                "token endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FetchError::unavailable(format!("invalid token response: {}", e)))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        debug!(
            client_email = %self.client_email,
            expires_in_secs = lifetime.as_secs(),
            "obtained access token"
        );

        Ok(CachedToken {
            value: SecretString::from(token.access_token),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        })
    }
}
