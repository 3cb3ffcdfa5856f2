//! Notification sinks.
//!
//! Every channel implements [`Sink`]. Sinks are built once at startup from
//! [`NotificationsConfig`]; a channel that is switched off, or enabled but
//! missing credentials, is represented by a [`DisabledSink`] so that it is
//! visible to `validate` but skipped by the fanout.
//!
//! - `console`: framed block on stdout
//! - `file`: appended text or JSON lines
//! - `email`: HTTP email API
//! - `chat`: Discord-compatible webhook with embeds
//! - `webhook`: generic JSON POST

mod chat;
mod console;
mod email;
mod file;
mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{JobRecord, NotificationsConfig};

pub use chat::ChatSink;
pub use console::ConsoleSink;
pub use email::EmailSink;
pub use file::FileSink;
pub use webhook::WebhookSink;

/// Shared information passed to every sink alongside the records.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyContext {
    /// Active keyword filter (empty when all postings match)
    pub keywords: Vec<String>,
    /// When the notification was produced
    pub timestamp: DateTime<Utc>,
}

impl NotifyContext {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            timestamp: Utc::now(),
        }
    }

    /// One-line summary used in subjects and headers.
    pub fn headline(&self, count: usize) -> String {
        let noun = if count == 1 { "posting" } else { "postings" };
        if self.keywords.is_empty() {
            format!("{count} new job {noun}")
        } else {
            format!(
                "{count} new job {noun} matching {}",
                self.keywords.join(", ")
            )
        }
    }
}

/// A notification delivery channel.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Channel name used in logs and reports.
    fn name(&self) -> &str;

    /// Disabled sinks are never invoked by the fanout.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Where deliveries go, for diagnostics.
    fn target(&self) -> String;

    /// Deliver `records`. Returns a short description of what was delivered.
    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String>;
}

/// Placeholder for a channel that is switched off or misconfigured.
#[derive(Debug, Clone)]
pub struct DisabledSink {
    name: String,
    reason: String,
}

impl DisabledSink {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Sink for DisabledSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn target(&self) -> String {
        format!("disabled ({})", self.reason)
    }

    async fn send(&self, _records: &[JobRecord], _ctx: &NotifyContext) -> Result<String> {
        Err(AppError::sink(&self.name, &self.reason))
    }
}

/// Build all configured sinks.
///
/// Enabled sinks with missing credentials are logged and disabled here, so
/// they do not fail on every cycle.
pub fn build_sinks(config: &NotificationsConfig, client: &reqwest::Client) -> Vec<Arc<dyn Sink>> {
    fn checked<S: Sink + 'static>(
        name: &str,
        enabled: bool,
        build: impl FnOnce() -> Result<S>,
    ) -> Arc<dyn Sink> {
        if !enabled {
            return Arc::new(DisabledSink::new(name, "disabled in config"));
        }
        match build() {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                log::warn!("Disabling {} sink: {}", name, e);
                Arc::new(DisabledSink::new(name, e.to_string()))
            }
        }
    }

    vec![
        checked("console", config.console.enabled, || Ok(ConsoleSink::new())),
        checked("file", config.file.enabled, || {
            FileSink::from_config(&config.file)
        }),
        checked("email", config.email.enabled, || {
            EmailSink::from_config(&config.email, client.clone())
        }),
        checked("chat", config.chat.enabled, || {
            ChatSink::from_config(&config.chat, client.clone())
        }),
        checked("webhook", config.webhook.enabled, || {
            WebhookSink::from_config(&config.webhook, client.clone())
        }),
    ]
}

/// Require a non-blank credential for an enabled sink.
fn required(sink: &str, field: &str, value: Option<&String>) -> Result<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::config(format!("notifications.{sink}.{field} is required")))
}

/// Turn a non-2xx response into a sink error carrying the response body.
async fn ensure_success(sink: &str, response: reqwest::Response) -> Result<reqwest::StatusCode> {
    let status = response.status();
    if status.is_success() {
        return Ok(status);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(AppError::sink(sink, format!("HTTP {status}: {body}")))
}

/// Hide the path of a webhook URL, which usually embeds a secret token.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => format!(
            "{}://{}/…",
            url.scheme(),
            url.host_str().unwrap_or("unknown-host")
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}
