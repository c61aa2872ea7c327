// CLI configuration
// reason: config crate layers an optional TOML file under AMBROGIO_* env vars
use ambrogio_core::{AppError, QueueConfig};
use ambrogio_infra_tr50::{Credentials, Tr50Config, DEFAULT_ENDPOINT};
use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "AMBROGIO";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_CLIENT_NAME: &str = "Ambrogio CLI";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ACK_TIMEOUT_SECS: u64 = 30;

/// Queue tuning as it appears in the configuration file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub pacing_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub default_wait_timeout_secs: u64,
    /// Unset waits for every queued command on shutdown
    pub drain_timeout_secs: Option<u64>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        let defaults = QueueConfig::default();
        Self {
            pacing_ms: defaults.pacing.as_millis() as u64,
            max_retries: defaults.max_retries,
            backoff_base_ms: defaults.backoff_base.as_millis() as u64,
            default_wait_timeout_secs: defaults.default_wait_timeout.as_secs(),
            drain_timeout_secs: defaults.drain_timeout.map(|t| t.as_secs()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub imei: Option<String>,
    pub client_key: Option<String>,
    pub app_token: Option<String>,
    pub client_name: String,
    pub request_timeout_secs: u64,
    pub ack_timeout_secs: u64,
    pub queue: QueueSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            imei: None,
            client_key: None,
            app_token: None,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            ack_timeout_secs: DEFAULT_ACK_TIMEOUT_SECS,
            queue: QueueSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path` (or the default location) and the environment
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder
                        .add_source(File::from(default_path).format(FileFormat::Toml).required(false));
                }
            }
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|config| config.try_deserialize::<AppConfig>())
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Check everything needed to talk to a mower is present and sane
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        self.identity()?;
        self.credentials()?;
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".into()));
        }
        if self.queue.default_wait_timeout_secs == 0 {
            return Err(AppError::Config(
                "queue.default_wait_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn identity(&self) -> Result<&str, AppError> {
        let imei = required(&self.imei, "imei")?;
        if !imei.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Config(format!("imei must be numeric, got '{}'", imei)));
        }
        Ok(imei)
    }

    pub fn credentials(&self) -> Result<Credentials, AppError> {
        let client_key = required(&self.client_key, "client_key")?;
        let app_token = required(&self.app_token, "app_token")?;
        Ok(Credentials::from_client_key(client_key, app_token))
    }

    pub fn tr50_config(&self) -> Tr50Config {
        Tr50Config::default()
            .with_endpoint(self.endpoint.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn queue_config(&self) -> QueueConfig {
        let config = QueueConfig::default()
            .with_pacing(Duration::from_millis(self.queue.pacing_ms))
            .with_max_retries(self.queue.max_retries)
            .with_backoff_base(Duration::from_millis(self.queue.backoff_base_ms))
            .with_default_wait_timeout(Duration::from_secs(self.queue.default_wait_timeout_secs));
        match self.queue.drain_timeout_secs {
            Some(secs) => config.with_drain_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }
}

/// `<config dir>/ambrogio/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "ambrogio", "ambrogio").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("missing required setting '{}'", key)))
}
