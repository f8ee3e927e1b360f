//! Client configuration
//!
//! All settings the session client and orchestrator need are carried in one
//! explicit value; nothing is read from the process environment after
//! construction.

use crate::error::{Result, UploadError};
use std::time::Duration;

/// Default part size: 5 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Largest accepted part size: 5 GiB
pub const MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024 * 1024;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081/v2";

pub const ENV_AUTH_TOKEN: &str = "AUTHENTICATION_TOKEN";
pub const ENV_TEAM_ID: &str = "TEAM_ID";
pub const ENV_FOLDER_ID: &str = "FOLDER_ID";
pub const ENV_BASE_URL: &str = "API_BASE_URL";
pub const ENV_CHUNK_SIZE: &str = "CHUNK_SIZE_BYTES";

/// Configuration for the multipart upload client
#[derive(Clone)]
pub struct UploadConfig {
    /// Bearer token sent with every API call except raw part uploads
    pub auth_token: String,

    /// Destination team
    pub team_id: String,

    /// Destination folder within the team
    pub folder_id: String,

    /// API root, e.g. `https://api.example.com/v2`
    pub base_url: String,

    /// Split granularity in bytes; every part but the last has this size
    pub chunk_size: usize,

    /// Timeout applied to each individual HTTP request
    pub request_timeout: Duration,

    /// Extra attempts for a part whose transmission failed at the network level
    pub max_part_retries: u32,

    /// Base delay between part retries, multiplied by the attempt number
    pub retry_delay: Duration,
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("auth_token", &"<redacted>")
            .field("team_id", &self.team_id)
            .field("folder_id", &self.folder_id)
            .field("base_url", &self.base_url)
            .field("chunk_size", &self.chunk_size)
            .field("request_timeout", &self.request_timeout)
            .field("max_part_retries", &self.max_part_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            team_id: String::new(),
            folder_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(300),
            max_part_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl UploadConfig {
    /// Create a configuration with the required credentials and default settings
    pub fn new(
        auth_token: impl Into<String>,
        team_id: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            auth_token: auth_token.into(),
            team_id: team_id.into(),
            folder_id: folder_id.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_env_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = [ENV_AUTH_TOKEN, ENV_TEAM_ID, ENV_FOLDER_ID]
            .into_iter()
            .filter(|&key| get(key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(UploadError::config_error(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let mut config = Self::new(
            get(ENV_AUTH_TOKEN).unwrap_or_default(),
            get(ENV_TEAM_ID).unwrap_or_default(),
            get(ENV_FOLDER_ID).unwrap_or_default(),
        );

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = base_url;
        }

        if let Some(chunk_size) = get(ENV_CHUNK_SIZE) {
            config.chunk_size = chunk_size.trim().parse().map_err(|_| {
                UploadError::config_error(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_CHUNK_SIZE, chunk_size
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_part_retries(mut self, retries: u32) -> Self {
        self.max_part_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// API root without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            (ENV_AUTH_TOKEN, &self.auth_token),
            (ENV_TEAM_ID, &self.team_id),
            (ENV_FOLDER_ID, &self.folder_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(UploadError::config_error(format!(
                    "Missing required configuration: {}",
                    name
                )));
            }
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(UploadError::config_error(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.chunk_size == 0 {
            return Err(UploadError::config_error(
                "Chunk size must be greater than 0",
            ));
        }

        if self.chunk_size as u64 > MAX_CHUNK_SIZE {
            return Err(UploadError::config_error(format!(
                "Chunk size must be at most {} bytes, got {}",
                MAX_CHUNK_SIZE, self.chunk_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(UploadError::config_error(
                "Request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}
