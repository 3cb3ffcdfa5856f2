//! Console sink: prints new postings to stdout.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::JobRecord;
use crate::utils::display;

use super::{NotifyContext, Sink};

#[derive(Debug, Clone, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    fn render(records: &[JobRecord], ctx: &NotifyContext) -> String {
        let mut lines = vec![display::header(&ctx.headline(records.len()))];
        for (i, record) in records.iter().enumerate() {
            lines.push(format!("{:>3}. {}", i + 1, record.title));
            lines.push(display::sub_item(
                &record.format("{department} · {location}"),
            ));
            lines.push(display::sub_item(&record.link));
        }
        lines.push(display::separator());
        lines.join("\n")
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn target(&self) -> String {
        "stdout".to_string()
    }

    async fn send(&self, records: &[JobRecord], ctx: &NotifyContext) -> Result<String> {
        println!("{}", Self::render(records, ctx));
        Ok(format!("printed {} postings", records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_record() {
        let records = vec![
            JobRecord::new("Backend Engineer", "https://example.com/1", "Engineering", "Berlin"),
            JobRecord::new("Designer", "https://example.com/2", "Design", "Remote"),
        ];
        let ctx = NotifyContext::new(vec![]);

        let out = ConsoleSink::render(&records, &ctx);
        assert!(out.contains("2 new job postings"));
        assert!(out.contains("  1. Backend Engineer"));
        assert!(out.contains("    Design · Remote"));
        assert!(out.contains("    https://example.com/2"));
    }
}
