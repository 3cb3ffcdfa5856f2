//! Service layer.
//!
//! - Job listing scraping (`HtmlJobScraper` behind the `JobSource` trait)

mod listing;

pub use listing::{HtmlJobScraper, JobSource};
