//! Blocking HTTP transport
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. The trait exists so
//! the pager can be driven by scripted responses in tests.

use std::time::Duration;

use ureq::Agent;

use crate::error::Result;

/// Largest response body we are willing to buffer (attachment pages carry
/// base64 payloads inline)
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Status, throttling hint and raw body of one HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, for error reporting
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Minimal HTTP surface the ingest pipeline needs.
///
/// Implementations must return non-2xx statuses as `Ok` responses; only
/// network-level failures are errors.
pub trait HttpTransport: Send + Sync {
    /// GET `url` with a bearer token
    fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse>;

    /// POST `body` to `url` with a content type and, if given, a bearer token
    fn post(
        &self,
        url: &str,
        bearer: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse>;
}

/// ureq-backed transport
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Per-request timeout for the whole exchange
    const TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Self::TIMEOUT))
            .build()
            .into();
        Self { agent }
    }

    fn into_response(mut response: ureq::http::Response<ureq::Body>) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, bearer: &str) -> Result<HttpResponse> {
        let response = self
            .agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", bearer))
            .header("Accept", "application/json")
            .call()?;
        Self::into_response(response)
    }

    fn post(
        &self,
        url: &str,
        bearer: Option<&str>,
        content_type: &str,
        body: &[u8],
    ) -> Result<HttpResponse> {
        let mut request = self.agent.post(url).header("Content-Type", content_type);
        if let Some(token) = bearer {
            request = request.header("Authorization", &format!("Bearer {}", token));
        }
        Self::into_response(request.send(body)?)
    }
}
