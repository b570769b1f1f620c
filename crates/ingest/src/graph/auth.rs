//! App-only token providers
//!
//! The pipeline never sees how a token was obtained; it asks a
//! [`TokenProvider`] once per run and uses the result read-only.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use ureq::Agent;
use url::form_urlencoded;

use super::http::HttpTransport;
use crate::error::{IngestError, Result};

/// Capability to produce a bearer token
pub trait TokenProvider: Send + Sync {
    fn get_token(&self) -> Result<String>;
}

/// Fixed token, e.g. from `GCS_ACCESS_TOKEN` or a test fixture
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn get_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token response shared by Entra ID and the GCE metadata server
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Token held in memory until shortly before it expires
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Tokens are refreshed this long before their stated expiry
    const EXPIRY_BUFFER: Duration = Duration::minutes(5);

    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in.unwrap_or(0)),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Self::EXPIRY_BUFFER
    }
}

/// Return the cached token or fetch and cache a new one
fn cached_or_fetch(
    cache: &Mutex<Option<CachedToken>>,
    fetch: impl FnOnce() -> Result<TokenResponse>,
) -> Result<String> {
    let now = Utc::now();
    let mut guard = cache
        .lock()
        .map_err(|_| IngestError::Auth("token cache poisoned".to_string()))?;

    if let Some(token) = guard.as_ref()
        && token.is_fresh(now)
    {
        return Ok(token.access_token.clone());
    }

    let token = CachedToken::from_response(fetch()?, now);
    let access_token = token.access_token.clone();
    *guard = Some(token);
    Ok(access_token)
}

/// OAuth2 client-credentials grant against Microsoft Entra ID
pub struct ClientCredentialsAuth {
    transport: Arc<dyn HttpTransport>,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsAuth {
    /// App-only scope covering every Graph permission granted to the app
    const GRAPH_SCOPE: &'static str = "https://graph.microsoft.com/.default";

    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            transport,
            tenant_id,
            client_id,
            client_secret,
            cache: Mutex::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            urlencoding::encode(&self.tenant_id)
        )
    }

    fn request_token(&self) -> Result<TokenResponse> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("scope", Self::GRAPH_SCOPE)
            .append_pair("grant_type", "client_credentials")
            .finish();

        let response = self
            .transport
            .post(
                &self.token_url(),
                None,
                "application/x-www-form-urlencoded",
                form.as_bytes(),
            )
            .map_err(|e| IngestError::Auth(format!("token request failed: {}", e)))?;

        if !response.is_success() {
            return Err(IngestError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                response.status,
                response.text()
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| IngestError::Auth(format!("failed to parse token response: {}", e)))
    }
}

impl TokenProvider for ClientCredentialsAuth {
    fn get_token(&self) -> Result<String> {
        cached_or_fetch(&self.cache, || {
            log::debug!("Requesting Graph token for tenant {}", self.tenant_id);
            self.request_token()
        })
    }
}

/// Default service-account token from the GCE metadata server
pub struct MetadataServerToken {
    agent: Agent,
    cache: Mutex<Option<CachedToken>>,
}

impl MetadataServerToken {
    const TOKEN_URL: &'static str = concat!(
        "http://metadata.google.internal/computeMetadata/v1",
        "/instance/service-accounts/default/token"
    );

    /// The metadata server is local; anything slower means it is absent
    const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Self::TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            cache: Mutex::new(None),
        }
    }

    fn request_token(&self) -> Result<TokenResponse> {
        let mut response = self
            .agent
            .get(Self::TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .call()
            .map_err(|e| IngestError::Auth(format!("metadata server unavailable: {}", e)))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| IngestError::Auth(format!("failed to parse metadata token: {}", e)))
    }
}

impl Default for MetadataServerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenProvider for MetadataServerToken {
    fn get_token(&self) -> Result<String> {
        cached_or_fetch(&self.cache, || self.request_token())
    }
}
