//! Chat sink for Discord-compatible webhooks.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{ChatSinkConfig, JobRecord};

use super::{NotifyContext, Sink, ensure_success, redact_url, required};

/// Discord rejects messages with more than 10 embeds.
const MAX_EMBEDS_PER_MESSAGE: usize = 10;
const MAX_EMBED_TITLE: usize = 256;
const EMBED_COLOR: u32 = 0x2b_6c_b0;

#[derive(Debug, Clone)]
pub struct ChatSink {
    client: reqwest::Client,
    webhook_url: String,
    username: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    url: String,
    description: String,
    color: u32,
    timestamp: String,
}

impl ChatSink {
    pub fn from_config(config: &ChatSinkConfig, client: reqwest::Client) -> Result<Self> {
        let webhook_url = required("chat", "webhook_url", config.webhook_url.as_ref())?;
        url::Url::parse(&webhook_url)?;
        Ok(Self {
            client,
            webhook_url,
            username: config.username.clone(),
        })
    }

    /// Split records into messages; only the first carries the headline.
    fn build_messages(&self, records: &[JobRecord], ctx: &NotifyContext) -> Vec<ChatMessage> {
        records
            .chunks(MAX_EMBEDS_PER_MESSAGE)
            .enumerate()
            .map(|(i, chunk)| ChatMessage {
                username: self.username.clone(),
                content: (i == 0).then(|| format!("**{}**", ctx.headline(records.len()))),
                embeds: chunk.iter().map(Self::embed).collect(),
            })
            .collect()
    }

    fn embed(record: &JobRecord) -> Embed {
        Embed {
            title: record.title.chars().take(MAX_EMBED_TITLE).collect(),
            url: record.link.clone(),
            description: record.format("**Department:** {department}\n**Location:** {location}"),
            color: EMBED_COLOR,
            timestamp: record.scraped_at.to_rfc3339(),
        }
    }
}

#[async_trait]
impl Sink for ChatSink {
    fn name(&self) -> &str {
        "chat"
    }

    fn target(&self) -> String {
        redact_url(&self.webhook_url)
    }

    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        let messages = self.build_messages(records, ctx);
        for message in &messages {
            let response = self
                .client
                .post(&self.webhook_url)
                .json(message)
                .send()
                .await?;
            ensure_success(self.name(), response).await?;
        }
        Ok(format!("posted {} messages", messages.len()))
    }
}
