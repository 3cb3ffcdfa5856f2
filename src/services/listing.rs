// src/services/listing.rs

//! Careers page scraper.
//!
//! Fetches the listing page and extracts postings using configured CSS
//! selectors. Rows without a usable link are dropped here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{JobRecord, JobSelectors, ScraperConfig};
use crate::utils::{collapse_whitespace, posting_link};

/// Source of job postings for one cycle.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch the current postings. Any failure is a [`AppError::Scrape`].
    async fn scrape(&self) -> Result<Vec<JobRecord>>;
}

/// Pre-parsed selectors.
struct CompiledSelectors {
    row: Selector,
    title: Selector,
    link: Option<Selector>,
    department: Option<Selector>,
    location: Option<Selector>,
    link_attr: String,
}

impl CompiledSelectors {
    fn compile(selectors: &JobSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| {
            s.as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(parse_selector)
                .transpose()
        };
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            link: optional(&selectors.link_selector)?,
            department: optional(&selectors.department_selector)?,
            location: optional(&selectors.location_selector)?,
            link_attr: selectors.link_attr.clone(),
        })
    }
}

/// Scraper for a single HTML listing page.
pub struct HtmlJobScraper {
    client: Client,
    url: Url,
    placeholder: String,
    selectors: CompiledSelectors,
}

impl HtmlJobScraper {
    /// Create a scraper; fails on an invalid URL or selector.
    pub fn new(config: &ScraperConfig, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            url: Url::parse(&config.url)?,
            placeholder: config.placeholder.clone(),
            selectors: CompiledSelectors::compile(&config.selectors)?,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Extract postings from an already fetched document.
    pub fn parse_listing(&self, html: &str, scraped_at: DateTime<Utc>) -> Vec<JobRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in document.select(&self.selectors.row) {
            match self.parse_row(&row, scraped_at) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} rows without title or link", skipped);
        }
        records
    }

    fn parse_row(&self, row: &ElementRef, scraped_at: DateTime<Utc>) -> Option<JobRecord> {
        let sel = &self.selectors;
        let title_elem = row.select(&sel.title).next()?;
        let title = collapse_whitespace(&title_elem.text().collect::<String>());
        if title.is_empty() {
            return None;
        }

        let link_elem = sel
            .link
            .as_ref()
            .and_then(|s| row.select(s).next())
            .unwrap_or(title_elem);
        let link = posting_link(&self.url, link_elem.value().attr(&sel.link_attr)?)?;

        Some(JobRecord {
            title,
            link,
            department: self.text_or_placeholder(row, sel.department.as_ref()),
            location: self.text_or_placeholder(row, sel.location.as_ref()),
            scraped_at,
        })
    }

    fn text_or_placeholder(&self, row: &ElementRef, selector: Option<&Selector>) -> String {
        selector
            .and_then(|s| row.select(s).next())
            .map(|e| collapse_whitespace(&e.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.placeholder.clone())
    }

    async fn fetch(&self) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl JobSource for HtmlJobScraper {
    async fn scrape(&self) -> Result<Vec<JobRecord>> {
        let html = self
            .fetch()
            .await
            .map_err(|e| AppError::scrape(self.url(), e))?;
        let records = self.parse_listing(&html, Utc::now());
        log::debug!("Extracted {} postings from {}", records.len(), self.url);
        Ok(records)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r##"
        <html><body>
          <div class="job-listing">
            <h3 class="job-title"><a href="/jobs/backend">  Backend
               Engineer </a></h3>
            <span class="job-department">Engineering</span>
            <span class="job-location">Berlin</span>
          </div>
          <div class="job-listing">
            <h3 class="job-title"><a href="https://other.example.com/jobs/design">Designer</a></h3>
            <span class="job-location"> </span>
          </div>
          <div class="job-listing">
            <h3 class="job-title"><a>No link here</a></h3>
          </div>
          <div class="job-listing">
            <h3 class="job-title"><a href="#">Anchor only</a></h3>
          </div>
        </body></html>
    "##;

    fn scraper() -> HtmlJobScraper {
        let config = ScraperConfig {
            url: "https://example.com/careers/".into(),
            ..ScraperConfig::default()
        };
        HtmlJobScraper::new(&config, Client::new()).unwrap()
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("div.class").is_ok());
        assert!(parse_selector("ul > li a[href]").is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }

    #[test]
    fn test_parse_listing_extracts_records() {
        let records = scraper().parse_listing(LISTING, Utc::now());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Backend Engineer");
        assert_eq!(records[0].link, "https://example.com/jobs/backend");
        assert_eq!(records[0].department, "Engineering");
        assert_eq!(records[0].location, "Berlin");

        assert_eq!(records[1].link, "https://other.example.com/jobs/design");
        assert_eq!(records[1].department, "Not specified");
        assert_eq!(records[1].location, "Not specified");
    }

    #[test]
    fn test_separate_link_selector() {
        let config = ScraperConfig {
            url: "https://example.com/careers".into(),
            selectors: JobSelectors {
                row_selector: "li.role".into(),
                title_selector: "span.name".into(),
                link_selector: Some("a.apply".into()),
                department_selector: None,
                location_selector: None,
                link_attr: "href".into(),
            },
            ..ScraperConfig::default()
        };
        let scraper = HtmlJobScraper::new(&config, Client::new()).unwrap();
        let html = r#"<ul><li class="role"><span class="name">SRE</span><a class="apply" href="apply/42">Apply</a></li></ul>"#;

        let records = scraper.parse_listing(html, Utc::now());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "SRE");
        assert_eq!(records[0].link, "https://example.com/apply/42");
    }

    #[test]
    fn test_new_rejects_bad_selector() {
        let mut config = ScraperConfig::default();
        config.selectors.row_selector = "[[".into();
        assert!(HtmlJobScraper::new(&config, Client::new()).is_err());
    }
}
