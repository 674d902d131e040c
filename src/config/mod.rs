use std::time::Duration;

use serde::Deserialize;
use tokio::sync::OnceCell;
use url::Url;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{CONFIG_PATH_ENV, config_candidates, find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api/";
const DEFAULT_VIDEO_BASE_URL: &str = "https://proedge-lms.s3.ap-south-1.amazonaws.com/";
const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    api: Api,
    #[serde(default)]
    storage: Storage,
    #[serde(default)]
    tracker: Tracker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    #[serde(default = "default_api_base_url")]
    base_url: String,
    #[serde(default = "default_request_timeout")]
    request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    #[serde(default = "default_video_base_url")]
    video_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tracker {
    #[serde(default = "default_checkpoint_interval")]
    checkpoint_interval_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_video_base_url() -> String {
    DEFAULT_VIDEO_BASE_URL.to_string()
}

fn default_checkpoint_interval() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL_SECS
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            video_base_url: default_video_base_url(),
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            checkpoint_interval_secs: default_checkpoint_interval(),
        }
    }
}

/// Parses `value` as a base url, forcing a trailing slash so relative joins
/// append instead of replacing the last path segment.
fn base_url(value: &str) -> ConfigResult<Url> {
    let mut value = value.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }

    Url::parse(&value).map_err(|error| ConfigError::InvalidUrl { value, error })
}

impl Config {
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    #[tracing::instrument]
    pub fn load(use_local: bool) -> ConfigResult<Self> {
        let bytes = read_config(use_local)?;
        let config: Self = toml::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> ConfigResult<&'static Config> {
        CONFIG
            .get_or_try_init(|| async {
                Self::load(use_local).inspect_err(|e| {
                    if !matches!(e, ConfigError::ConfigNotFound) {
                        crate::error::log_error(e);
                    }
                })
            })
            .await
    }

    fn validate(&self) -> ConfigResult<()> {
        self.api.base_url()?;
        self.storage.video_base_url()?;
        if self.tracker.checkpoint_interval_secs == 0 {
            return Err(ConfigError::InvalidCheckpointInterval);
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        Ok(())
    }

    #[inline]
    pub fn api(&self) -> &Api {
        &self.api
    }

    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[inline]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}

impl Api {
    pub fn base_url(&self) -> ConfigResult<Url> {
        base_url(&self.base_url)
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Storage {
    pub fn video_base_url(&self) -> ConfigResult<Url> {
        base_url(&self.video_base_url)
    }
}

impl Tracker {
    #[inline]
    pub fn checkpoint_interval_secs(&self) -> u64 {
        self.checkpoint_interval_secs
    }

    #[inline]
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}
