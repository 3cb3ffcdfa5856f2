//! Email sink via an HTTP email API.
//!
//! Posts `{ from, to, subject, html }` with a bearer key, the shape accepted
//! by Resend and compatible relays.

use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{EmailSinkConfig, JobRecord};

use super::{NotifyContext, Sink, ensure_success, required};

#[derive(Debug, Clone)]
pub struct EmailSink {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    to: Vec<String>,
    subject_prefix: String,
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    html: String,
}

impl EmailSink {
    pub fn from_config(config: &EmailSinkConfig, client: reqwest::Client) -> Result<Self> {
        let api_key = required("email", "api_key", config.api_key.as_ref())?;
        let from = required("email", "from", config.from.as_ref())?;
        let to: Vec<String> = config
            .to
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if to.is_empty() {
            return Err(AppError::config("notifications.email.to is required"));
        }
        url::Url::parse(&config.api_url)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            from,
            to,
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    fn subject(&self, records: &[JobRecord], ctx: &NotifyContext) -> String {
        let headline = ctx.headline(records.len());
        if self.subject_prefix.is_empty() {
            headline
        } else {
            format!("{} {}", self.subject_prefix, headline)
        }
    }

    fn render_html(records: &[JobRecord], ctx: &NotifyContext) -> String {
        let mut html = String::new();
        html.push_str(&format!(
            "<h2>{}</h2>\n<table cellpadding=\"6\" style=\"border-collapse:collapse\">\n",
            encode_text(&ctx.headline(records.len()))
        ));
        html.push_str("<tr><th align=\"left\">Title</th><th align=\"left\">Department</th><th align=\"left\">Location</th></tr>\n");
        for record in records {
            html.push_str(&format!(
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>\n",
                encode_double_quoted_attribute(&record.link),
                encode_text(&record.title),
                encode_text(&record.department),
                encode_text(&record.location),
            ));
        }
        html.push_str("</table>\n");
        html.push_str(&format!(
            "<p style=\"color:#888\">Checked at {}</p>\n",
            ctx.timestamp.format("%Y-%m-%d %H:%M UTC")
        ));
        html
    }
}

#[async_trait]
impl Sink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    fn target(&self) -> String {
        self.to.join(", ")
    }

    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        let payload = EmailPayload {
            from: &self.from,
            to: &self.to,
            subject: self.subject(records, ctx),
            html: Self::render_html(records, ctx),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = ensure_success(self.name(), response).await?;

        Ok(format!(
            "sent to {} recipients (HTTP {})",
            self.to.len(),
            status.as_u16()
        ))
    }
}
