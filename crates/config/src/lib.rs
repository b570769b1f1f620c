//! Layered settings for pdfsweep
//!
//! A setting is read from the environment first and falls back to the JSON
//! settings file in the pdfsweep config directory (~/.config/pdfsweep/).
//! Each [`Setting`] names both places, since the environment uses
//! `UPPER_CASE` names and the file uses `snake_case` keys.
//!
//! ```text
//! GCS_BUCKET_NAME=certs        { "bucket": "certs",
//! INGEST_CUTOFF_HOUR=6           "cutoff_hour": 6 }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

/// Directory name under the platform config dir
const APP_DIR: &str = "pdfsweep";

/// Create the pdfsweep config directory if it is missing.
///
/// Call this once at application startup.
pub fn init() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// The pdfsweep config directory (~/.config/pdfsweep/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Path of a file within the pdfsweep config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Where one setting lives in each source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    /// Environment variable name
    pub env: &'static str,
    /// Key in the settings file
    pub file: &'static str,
}

impl Setting {
    pub const fn new(env: &'static str, file: &'static str) -> Self {
        Self { env, file }
    }
}

/// Settings file contents layered under an environment lookup
pub struct Settings<E> {
    file: Map<String, Value>,
    env: E,
}

impl<E> Settings<E>
where
    E: Fn(&str) -> Option<String>,
{
    pub fn new(file: Map<String, Value>, env: E) -> Self {
        Self { file, env }
    }

    /// Layer `filename` from the pdfsweep config directory under `env`
    pub fn load(filename: &str, env: E) -> Result<Self> {
        match config_path(filename) {
            Some(path) => Self::from_file(&path, env),
            None => Ok(Self::new(Map::new(), env)),
        }
    }

    /// Layer the JSON object at `path` under `env`; a missing file is empty
    pub fn from_file(path: &Path, env: E) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(Map::new(), env));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        match value {
            Value::Object(file) => Ok(Self::new(file, env)),
            _ => bail!("Settings file {} is not a JSON object", path.display()),
        }
    }

    /// Raw value, environment first. Empty strings are returned as-is.
    pub fn get(&self, setting: Setting) -> Option<String> {
        (self.env)(setting.env).or_else(|| match self.file.get(setting.file)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    /// Trimmed, non-blank value
    pub fn non_empty(&self, setting: Setting) -> Option<String> {
        self.get(setting)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Like [`non_empty`](Self::non_empty), but missing is an error
    pub fn require(&self, setting: Setting) -> Result<String> {
        self.non_empty(setting)
            .with_context(|| format!("{} is not set", setting.env))
    }

    /// Parse the value if present
    pub fn parse<T>(&self, setting: Setting) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.non_empty(setting) else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(e) => bail!("{} has an invalid value '{}': {}", setting.env, raw, e),
        }
    }
}
