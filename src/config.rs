use crate::error::{ClassifierError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const LOCAL_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const REMOTE_SERVER_URL: &str = "https://gb-ocr-stage.vertekx.com";

const SERVER_ENV: &str = "DOC_CLASSIFIER_SERVER";
const BASE_URL_ENV: &str = "DOC_CLASSIFIER_BASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerKind {
    Local,
    #[default]
    Remote,
}

impl ServerKind {
    pub fn base_url(self) -> &'static str {
        match self {
            ServerKind::Local => LOCAL_SERVER_URL,
            ServerKind::Remote => REMOTE_SERVER_URL,
        }
    }
}

impl FromStr for ServerKind {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ServerKind::Local),
            "remote" => Ok(ServerKind::Remote),
            other => Err(ClassifierError::Config(format!(
                "unknown server '{}' (expected local or remote)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerKind,
    /// Wins over `server` when set.
    pub base_url: Option<String>,
    pub retry: RetrySettings,
    /// Pause between two customers.
    pub customer_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerKind::default(),
            base_url: None,
            retry: RetrySettings::default(),
            customer_delay: Duration::from_millis(500),
        }
    }
}

impl Settings {
    /// Settings from `.env` files and the process environment.
    pub fn from_env() -> Result<Self> {
        load_env();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(server) = lookup(SERVER_ENV).filter(|s| !s.trim().is_empty()) {
            settings.server = server.parse()?;
        }
        settings.base_url = lookup(BASE_URL_ENV).filter(|s| !s.trim().is_empty());
        Ok(settings)
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.server.base_url())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }
}

/// Per-user directory holding an optional `.env`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("document-classifier"))
}

/// Load `.env` from the working directory, then from the per-user config directory.
/// Variables already set are never overwritten.
fn load_env() {
    let _ = dotenvy::dotenv();
    if let Some(dir) = config_dir() {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
    }
}
