//! File sink: appends notifications to a local log file.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{FileFormat, FileSinkConfig, JobRecord};

use super::{NotifyContext, Sink};

#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    format: FileFormat,
}

/// One line of the `jsonl` format.
#[derive(Serialize)]
struct JsonLine<'a> {
    notified_at: String,
    keywords: &'a [String],
    #[serde(flatten)]
    record: &'a JobRecord,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn from_config(config: &FileSinkConfig) -> Result<Self> {
        if config.path.trim().is_empty() {
            return Err(AppError::config("notifications.file.path is required"));
        }
        Ok(Self::new(&config.path, config.format))
    }

    fn render(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        let mut out = String::new();
        match self.format {
            FileFormat::Text => {
                out.push_str(&format!(
                    "[{}] {}\n",
                    ctx.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    ctx.headline(records.len())
                ));
                for record in records {
                    out.push_str(&record.format("  - {title} | {department} | {location} | {link}"));
                    out.push('\n');
                }
            }
            FileFormat::Jsonl => {
                for record in records {
                    let line = JsonLine {
                        notified_at: ctx.timestamp.to_rfc3339(),
                        keywords: &ctx.keywords,
                        record,
                    };
                    out.push_str(&serde_json::to_string(&line)?);
                    out.push('\n');
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        let content = self.render(records, ctx)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(format!(
            "appended {} postings to {}",
            records.len(),
            self.path.display()
        ))
    }
}
