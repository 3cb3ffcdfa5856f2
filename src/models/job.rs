//! Job posting data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting observed on the careers page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRecord {
    /// Posting title
    pub title: String,

    /// Absolute URL of the posting, unique across scrapes
    pub link: String,

    /// Department or team name
    pub department: String,

    /// Office location
    pub location: String,

    /// When the posting was observed (not part of identity)
    pub scraped_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a record observed now.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        department: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            department: department.into(),
            location: location.into(),
            scraped_at: Utc::now(),
        }
    }

    /// Records without a link have no identity and must not reach the detector.
    pub fn is_valid(&self) -> bool {
        !self.link.trim().is_empty()
    }

    /// Text searched by the keyword filter.
    pub fn keyword_haystack(&self) -> String {
        format!("{} {}", self.title, self.department).to_lowercase()
    }

    /// Format record for display using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{link}`, `{department}`, `{location}`, `{scraped_at}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{link}", &self.link)
            .replace("{department}", &self.department)
            .replace("{location}", &self.location)
            .replace("{scraped_at}", &self.scraped_at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> JobRecord {
        JobRecord::new(
            "Backend Engineer",
            "https://example.com/jobs/1",
            "Engineering",
            "Remote",
        )
    }

    #[test]
    fn test_format() {
        let job = sample_job();
        let result = job.format("[{department}] {title} ({location})");
        assert_eq!(result, "[Engineering] Backend Engineer (Remote)");
    }

    #[test]
    fn test_is_valid_requires_link() {
        let mut job = sample_job();
        assert!(job.is_valid());
        job.link = "   ".to_string();
        assert!(!job.is_valid());
    }

    #[test]
    fn test_keyword_haystack_is_lowercase() {
        assert_eq!(sample_job().keyword_haystack(), "backend engineer engineering");
    }
}
