// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures shared by the scraper,
//! the change detector, the notification sinks and state persistence.

mod config;
mod job;
mod state;

// Re-export all public types
pub use config::{
    ChatSinkConfig, Config, ConsoleSinkConfig, DetectionStrategy, DetectorConfig,
    EmailSinkConfig, FileFormat, FileSinkConfig, GuardConfig, JobSelectors,
    NotificationsConfig, ScheduleConfig, ScraperConfig, StorageConfig, WebhookSinkConfig,
    ENV_CHAT_WEBHOOK_URL, ENV_EMAIL_API_KEY, ENV_WEBHOOK_URL,
};
pub use job::JobRecord;
pub use state::{SeenState, StateDocument};
