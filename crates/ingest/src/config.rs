//! Configuration for ingest runs
//!
//! Settings are loaded from (later sources override earlier ones):
//! 1. JSON file (~/.config/pdfsweep/ingest.json), if present
//! 2. Runtime environment variables
//!
//! The resulting [`IngestConfig`] is handed to the coordinator explicitly;
//! nothing in the pipeline reads the environment on its own.

use chrono_tz::Tz;
use config::{Setting, Settings};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{IngestError, Result};
use crate::graph::{GRAPH_BASE, RetryPolicy};
use crate::window::parse_zone;

/// Settings filename in the pdfsweep config directory
pub const CONFIG_FILE: &str = "ingest.json";

/// Local cache used when `DOWNLOAD_DIR` is not set at all
const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
const DEFAULT_TIME_ZONE: &str = "Europe/Copenhagen";
const DEFAULT_CUTOFF_HOUR: u32 = 6;

/// Longest backoff a policy may ask for
const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

const TENANT_ID: Setting = Setting::new("TENANT_ID", "tenant_id");
const CLIENT_ID: Setting = Setting::new("CLIENT_ID", "client_id");
const CLIENT_SECRET: Setting = Setting::new("CLIENT_SECRET", "client_secret");
const MAILBOX: Setting = Setting::new("MAILBOX", "mailbox");
const DOWNLOAD_DIR: Setting = Setting::new("DOWNLOAD_DIR", "download_dir");
const BUCKET: Setting = Setting::new("GCS_BUCKET_NAME", "bucket");
const GCS_ACCESS_TOKEN: Setting = Setting::new("GCS_ACCESS_TOKEN", "gcs_access_token");
const TIME_ZONE: Setting = Setting::new("INGEST_TIME_ZONE", "time_zone");
const CUTOFF_HOUR: Setting = Setting::new("INGEST_CUTOFF_HOUR", "cutoff_hour");
const MAX_ATTEMPTS: Setting = Setting::new("GRAPH_MAX_ATTEMPTS", "max_attempts");

/// App registration used for app-only Graph access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Everything one ingest run needs to know
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub credentials: GraphCredentials,
    /// Mailbox (UPN or id) to scan
    pub mailbox: String,
    /// Local cache directory; `None` disables caching
    pub download_dir: Option<PathBuf>,
    /// Cloud Storage bucket name, or `file:///path` for a local directory
    pub bucket: String,
    /// Explicit Cloud Storage token; otherwise the metadata server is used
    pub gcs_access_token: Option<String>,
    /// IANA zone the daily cutoff is expressed in
    pub time_zone: String,
    pub cutoff_hour: u32,
    pub retry: RetryPolicy,
    /// Graph API root, overridable for tests
    pub graph_base: String,
}

impl IngestConfig {
    /// Config with defaults for everything but the required settings
    pub fn new(
        credentials: GraphCredentials,
        mailbox: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            mailbox: mailbox.into(),
            download_dir: None,
            bucket: bucket.into(),
            gcs_access_token: None,
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            retry: RetryPolicy::default(),
            graph_base: GRAPH_BASE.to_string(),
        }
    }

    /// Load from the settings file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let settings = Settings::load(CONFIG_FILE, |key: &str| std::env::var(key).ok())
            .map_err(config_error)?;
        Self::from_settings(&settings)
    }

    /// Build from layered settings; the environment wins over the file
    pub fn from_settings<E>(settings: &Settings<E>) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let required = |setting| settings.require(setting).map_err(config_error);

        let credentials = GraphCredentials {
            tenant_id: required(TENANT_ID)?,
            client_id: required(CLIENT_ID)?,
            client_secret: required(CLIENT_SECRET)?,
        };

        // Set but blank disables the cache
        let download_dir = match settings.get(DOWNLOAD_DIR) {
            None => Some(PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir.trim())),
        };

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = settings.parse(MAX_ATTEMPTS).map_err(config_error)? {
            retry.max_attempts = attempts;
        }

        let config = Self {
            credentials,
            mailbox: required(MAILBOX)?,
            download_dir,
            bucket: required(BUCKET)?,
            gcs_access_token: settings.non_empty(GCS_ACCESS_TOKEN),
            time_zone: settings
                .non_empty(TIME_ZONE)
                .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            cutoff_hour: settings
                .parse(CUTOFF_HOUR)
                .map_err(config_error)?
                .unwrap_or(DEFAULT_CUTOFF_HOUR),
            retry,
            graph_base: GRAPH_BASE.to_string(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every setting that can be checked without the network
    pub fn validate(&self) -> Result<()> {
        self.zone()?;
        if self.cutoff_hour > 23 {
            return Err(IngestError::config(format!(
                "cutoff hour {} is not in 0..=23",
                self.cutoff_hour
            )));
        }
        if self.mailbox.trim().is_empty() {
            return Err(IngestError::config("mailbox is empty"));
        }
        if self.bucket.trim().is_empty() {
            return Err(IngestError::config("storage bucket name is empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(IngestError::config("max attempts must be at least 1"));
        }
        if self.retry.max_delay > MAX_RETRY_DELAY {
            return Err(IngestError::config("maximum retry delay exceeds one hour"));
        }
        if self.retry.default_delay > self.retry.max_delay {
            return Err(IngestError::config(
                "default retry delay exceeds the maximum retry delay",
            ));
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<Tz> {
        parse_zone(&self.time_zone)
    }
}

fn config_error(e: anyhow::Error) -> IngestError {
    IngestError::config(format!("{:#}", e))
}
