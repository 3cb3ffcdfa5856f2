//! Generic JSON webhook sink.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{JobRecord, WebhookSinkConfig};

use super::{NotifyContext, Sink, ensure_success, redact_url, required};

#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    count: usize,
    keywords: &'a [String],
    timestamp: String,
    jobs: &'a [JobRecord],
}

impl WebhookSink {
    pub fn from_config(config: &WebhookSinkConfig, client: reqwest::Client) -> Result<Self> {
        let url = required("webhook", "url", config.url.as_ref())?;
        url::Url::parse(&url)?;
        Ok(Self {
            client,
            url,
            headers: config.headers.clone(),
        })
    }

    fn payload<'a>(records: &'a [JobRecord], ctx: &'a NotifyContext) -> WebhookPayload<'a> {
        WebhookPayload {
            event: "new_jobs",
            count: records.len(),
            keywords: &ctx.keywords,
            timestamp: ctx.timestamp.to_rfc3339(),
            jobs: records,
        }
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn target(&self) -> String {
        redact_url(&self.url)
    }

    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&Self::payload(records, ctx));
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = ensure_success(self.name(), response).await?;
        Ok(format!("HTTP {}", status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let records = vec![JobRecord::new(
            "Backend Engineer",
            "https://example.com/1",
            "Engineering",
            "Remote",
        )];
        let ctx = NotifyContext::new(vec!["backend".into()]);
        let json = serde_json::to_value(WebhookSink::payload(&records, &ctx)).unwrap();

        assert_eq!(json["event"], "new_jobs");
        assert_eq!(json["count"], 1);
        assert_eq!(json["keywords"][0], "backend");
        assert_eq!(json["jobs"][0]["title"], "Backend Engineer");
        assert!(json["jobs"][0]["scraped_at"].is_string());
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = WebhookSinkConfig {
            enabled: true,
            ..WebhookSinkConfig::default()
        };
        assert!(WebhookSink::from_config(&config, reqwest::Client::new()).is_err());
    }
}
