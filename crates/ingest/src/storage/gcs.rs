//! Google Cloud Storage backend
//!
//! Talks to the Cloud Storage JSON API directly over the shared blocking
//! transport: one metadata GET for the access check and one simple media
//! upload per object.

use std::sync::Arc;

use log::debug;

use super::ObjectStore;
use crate::error::{IngestError, Result};
use crate::graph::{HttpTransport, TokenProvider};

pub struct GcsObjectStore {
    bucket: String,
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenProvider>,
}

impl GcsObjectStore {
    /// Cloud Storage JSON API endpoint
    const BASE_URL: &'static str = "https://storage.googleapis.com";

    pub fn new(
        bucket: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            bucket: bucket.into().trim_start_matches("gs://").to_string(),
            base_url: Self::BASE_URL.to_string(),
            transport,
            tokens,
        }
    }

    /// Point at an emulator or test server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/storage/v1/b/{}",
            self.base_url,
            urlencoding::encode(&self.bucket)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(key)
        )
    }
}

impl ObjectStore for GcsObjectStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let token = self
            .tokens
            .get_token()
            .map_err(|e| IngestError::storage(key, e))?;
        let response = self
            .transport
            .post(&self.upload_url(key), Some(&token), content_type, data)
            .map_err(|e| IngestError::storage(key, e))?;

        if !response.is_success() {
            return Err(IngestError::storage(
                key,
                format!("HTTP {}: {}", response.status, response.text()),
            ));
        }

        debug!("Uploaded {} to gs://{}", key, self.bucket);
        Ok(())
    }

    fn check_access(&self) -> Result<()> {
        let token = self.tokens.get_token()?;
        let response = self.transport.get(&self.bucket_url(), &token)?;

        match response.status {
            200..=299 => Ok(()),
            403 | 404 => Err(IngestError::config(format!(
                "storage bucket '{}' not found or inaccessible",
                self.bucket
            ))),
            status => Err(IngestError::config(format!(
                "cannot verify storage bucket '{}': HTTP {}: {}",
                self.bucket,
                status,
                response.text()
            ))),
        }
    }

    fn location(&self) -> String {
        format!("gs://{}", self.bucket)
    }
}
