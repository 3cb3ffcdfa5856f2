//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `notifications.email.api_key`.
pub const ENV_EMAIL_API_KEY: &str = "JOBWATCH_EMAIL_API_KEY";
/// Environment variable overriding `notifications.chat.webhook_url`.
pub const ENV_CHAT_WEBHOOK_URL: &str = "JOBWATCH_CHAT_WEBHOOK_URL";
/// Environment variable overriding `notifications.webhook.url`.
pub const ENV_WEBHOOK_URL: &str = "JOBWATCH_WEBHOOK_URL";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listing page and extraction settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Change detection settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Scrape sanity checks
    #[serde(default)]
    pub guard: GuardConfig,

    /// Polling cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// State persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification sinks
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Write configuration as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Replace secrets with values from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_EMAIL_API_KEY) {
            self.notifications.email.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_CHAT_WEBHOOK_URL) {
            self.notifications.chat.webhook_url = Some(url);
        }
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.notifications.webhook.url = Some(url);
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Missing sink credentials are not errors here; those sinks are
    /// disabled with a warning when the sinks are built.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.scraper.url)
            .map_err(|e| AppError::config(format!("scraper.url is invalid: {e}")))?;
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::config("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::config("scraper.timeout_secs must be > 0"));
        }
        if self.scraper.selectors.row_selector.trim().is_empty() {
            return Err(AppError::config("scraper.selectors.row_selector is empty"));
        }
        if self.scraper.selectors.title_selector.trim().is_empty() {
            return Err(AppError::config(
                "scraper.selectors.title_selector is empty",
            ));
        }
        if self.schedule.interval_minutes == 0 {
            return Err(AppError::config("schedule.interval_minutes must be > 0"));
        }
        if let Some(percent) = self.guard.max_drop_percent {
            if percent > 100 {
                return Err(AppError::config(
                    "guard.max_drop_percent must be between 0 and 100",
                ));
            }
        }
        if self.storage.state_file.trim().is_empty() {
            return Err(AppError::config("storage.state_file is empty"));
        }
        if self.notifications.timeout_secs == 0 {
            return Err(AppError::config("notifications.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Listing page fetch and extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Careers listing page URL
    #[serde(default = "defaults::url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Value used when department or location cannot be extracted
    #[serde(default = "defaults::placeholder")]
    pub placeholder: String,

    /// CSS selectors for the listing
    #[serde(default)]
    pub selectors: JobSelectors,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            placeholder: defaults::placeholder(),
            selectors: JobSelectors::default(),
        }
    }
}

/// CSS selectors used to extract postings from the listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSelectors {
    /// One match per posting
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Title element, relative to the row
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Link element; the title element is used when absent
    #[serde(default)]
    pub link_selector: Option<String>,

    /// Department element
    #[serde(default = "defaults::department_selector")]
    pub department_selector: Option<String>,

    /// Location element
    #[serde(default = "defaults::location_selector")]
    pub location_selector: Option<String>,

    /// Attribute holding the link target
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl Default for JobSelectors {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            title_selector: defaults::title_selector(),
            link_selector: None,
            department_selector: defaults::department_selector(),
            location_selector: defaults::location_selector(),
            link_attr: defaults::link_attr(),
        }
    }
}

/// Detection strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Digest over the sorted canonical record set
    #[default]
    ContentHash,
    /// Set membership on record links
    IdentitySet,
}

/// Change detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub strategy: DetectionStrategy,

    /// Case-insensitive keywords matched against title and department.
    /// Empty means every record matches.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Whether the first cycle (no previous state) sends notifications
    #[serde(default = "defaults::enabled")]
    pub notify_on_first_run: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::default(),
            keywords: Vec::new(),
            notify_on_first_run: true,
        }
    }
}

/// Scrape sanity checks run before detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Abort the cycle when the record count drops by more than this
    /// percentage. Disabled when unset; empty scrapes are always rejected.
    #[serde(default)]
    pub max_drop_percent: Option<u8>,

    /// Previous counts below this skip the drop check
    #[serde(default = "defaults::min_baseline")]
    pub min_baseline: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_drop_percent: None,
            min_baseline: defaults::min_baseline(),
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,

    /// Run a cycle immediately instead of waiting one interval
    #[serde(default = "defaults::enabled")]
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval_minutes(),
            run_on_start: true,
        }
    }
}

/// State persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: defaults::state_file(),
        }
    }
}

/// Notification sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Per-sink delivery timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub console: ConsoleSinkConfig,

    #[serde(default)]
    pub file: FileSinkConfig,

    #[serde(default)]
    pub email: EmailSinkConfig,

    #[serde(default)]
    pub chat: ChatSinkConfig,

    #[serde(default)]
    pub webhook: WebhookSinkConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::notify_timeout(),
            console: ConsoleSinkConfig::default(),
            file: FileSinkConfig::default(),
            email: EmailSinkConfig::default(),
            chat: ChatSinkConfig::default(),
            webhook: WebhookSinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSinkConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Line format for the file sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSinkConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::notify_file")]
    pub path: String,

    #[serde(default)]
    pub format: FileFormat,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: defaults::notify_file(),
            format: FileFormat::default(),
        }
    }
}

/// HTTP email API settings (Resend-compatible JSON endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSinkConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::email_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Vec<String>,

    #[serde(default = "defaults::subject_prefix")]
    pub subject_prefix: String,
}

impl Default for EmailSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: defaults::email_api_url(),
            api_key: None,
            from: None,
            to: Vec::new(),
            subject_prefix: defaults::subject_prefix(),
        }
    }
}

/// Discord-compatible chat webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSinkConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "defaults::chat_username")]
    pub username: String,
}

impl Default for ChatSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            username: defaults::chat_username(),
        }
    }
}

/// Generic JSON webhook.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookSinkConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub url: Option<String>,

    /// Extra request headers (e.g. authorization)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

mod defaults {
    // Scraper defaults
    pub fn url() -> String {
        "https://example.com/careers".into()
    }
    pub fn user_agent() -> String {
        concat!("Mozilla/5.0 (compatible; jobwatch/", env!("CARGO_PKG_VERSION"), ")").into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn placeholder() -> String {
        "Not specified".into()
    }

    // Selector defaults
    pub fn row_selector() -> String {
        ".job-listing".into()
    }
    pub fn title_selector() -> String {
        ".job-title a".into()
    }
    pub fn department_selector() -> Option<String> {
        Some(".job-department".into())
    }
    pub fn location_selector() -> Option<String> {
        Some(".job-location".into())
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // Detector / guard / schedule defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn min_baseline() -> usize {
        5
    }
    pub fn interval_minutes() -> u64 {
        30
    }

    // Storage defaults
    pub fn state_file() -> String {
        "data/state.json".into()
    }

    // Notification defaults
    pub fn notify_timeout() -> u64 {
        30
    }
    pub fn notify_file() -> String {
        "data/notifications.log".into()
    }
    pub fn email_api_url() -> String {
        "https://api.resend.com/emails".into()
    }
    pub fn subject_prefix() -> String {
        "[jobwatch]".into()
    }
    pub fn chat_username() -> String {
        "jobwatch".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.scraper.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_invalid_url() {
        let mut config = Config::default();
        config.scraper.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.schedule.interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_drop_percent_over_100() {
        let mut config = Config::default();
        config.guard.max_drop_percent = Some(150);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml_str = r#"
            [scraper]
            url = "https://jobs.example.org/open-roles"

            [detector]
            strategy = "identity_set"
            keywords = ["Backend", "Rust"]

            [notifications.file]
            enabled = true
            format = "jsonl"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.scraper.url, "https://jobs.example.org/open-roles");
        assert_eq!(config.scraper.selectors.link_attr, "href");
        assert_eq!(config.detector.strategy, DetectionStrategy::IdentitySet);
        assert_eq!(config.detector.keywords, vec!["Backend", "Rust"]);
        assert!(config.detector.notify_on_first_run);
        assert!(config.notifications.console.enabled);
        assert!(config.notifications.file.enabled);
        assert_eq!(config.notifications.file.format, FileFormat::Jsonl);
        assert!(!config.notifications.email.enabled);
    }

    #[test]
    fn saved_config_loads_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data/config.toml");

        let mut config = Config::default();
        config.detector.keywords = vec!["rust".into()];
        config.notifications.webhook.headers.insert("X-Token".into(), "abc".into());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.detector.keywords, vec!["rust"]);
        assert_eq!(loaded.notifications.webhook.headers["X-Token"], "abc");
        assert!(loaded.notifications.email.api_key.is_none());
    }

    #[test]
    fn env_overrides_replace_secrets() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_EMAIL_API_KEY => Some("re_secret".to_string()),
            ENV_CHAT_WEBHOOK_URL => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(
            config.notifications.email.api_key.as_deref(),
            Some("re_secret")
        );
        assert!(config.notifications.chat.webhook_url.is_none());
        assert!(config.notifications.webhook.url.is_none());
    }
}
