use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::rate_limit::RetryPolicy;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_JIRA_SERVER_URL: &str = "https://your-domain.atlassian.net";

/// GitHub and Jira both cap page size at 100.
const MAX_PAGE_SIZE: u32 = 100;

/// Settings shared by both providers. Passed explicitly into every
/// constructor; nothing is read from ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github_api_url: String,
    pub jira_server_url: String,
    /// Restrict ticket queries to one Jira project key.
    pub jira_project: Option<String>,
    pub page_size: u32,
    /// Safety bound on pages followed per collection.
    pub max_pages: u32,
    pub request_timeout_secs: u64,
    /// Repositories fetched concurrently within one aggregation.
    pub max_concurrency: usize,
    pub incident_label: String,
    /// Open tickets not updated for this many days count as stale.
    pub stale_after_days: i64,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            jira_server_url: DEFAULT_JIRA_SERVER_URL.to_string(),
            jira_project: None,
            page_size: MAX_PAGE_SIZE,
            max_pages: 50,
            request_timeout_secs: 30,
            max_concurrency: 4,
            incident_label: "incident".to_string(),
            stale_after_days: 14,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Default config file location (`~/.fourkeys/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fourkeys").join("config.json"))
    }

    /// Load from the default path if it exists, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Apply overrides from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("GITHUB_API_URL") {
            self.github_api_url = v;
        }
        if let Some(v) = var("JIRA_SERVER_URL") {
            self.jira_server_url = v;
        }
        if let Some(v) = var("JIRA_PROJECT") {
            self.jira_project = Some(v).filter(|p| !p.trim().is_empty());
        }
        if let Some(v) = var("FOURKEYS_PAGE_SIZE") {
            self.page_size = parse_env("FOURKEYS_PAGE_SIZE", &v)?;
        }
        if let Some(v) = var("FOURKEYS_MAX_PAGES") {
            self.max_pages = parse_env("FOURKEYS_MAX_PAGES", &v)?;
        }
        if let Some(v) = var("FOURKEYS_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("FOURKEYS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("FOURKEYS_CONCURRENCY") {
            self.max_concurrency = parse_env("FOURKEYS_CONCURRENCY", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.github_api_url)
            .map_err(|e| Error::Config(format!("github_api_url: {e}")))?;
        url::Url::parse(&self.jira_server_url)
            .map_err(|e| Error::Config(format!("jira_server_url: {e}")))?;
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".into()));
        }
        if self.incident_label.trim().is_empty() {
            return Err(Error::Config("incident_label must not be empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: invalid value '{value}'")))
}
