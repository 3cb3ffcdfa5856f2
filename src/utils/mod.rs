//! Shared helpers for link and text cleanup.

pub mod display;
pub mod http;

use url::Url;

/// Absolute posting link for an `href` found on the listing page.
///
/// Blank and fragment-only hrefs point back at the listing itself and
/// yield `None`.
pub fn posting_link(listing: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    listing.join(href).ok().map(String::from)
}

/// Text content with whitespace runs collapsed, as shown in the browser.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_link_resolves_relative_paths() {
        let listing = Url::parse("https://jobs.example.com/careers/").unwrap();

        assert_eq!(
            posting_link(&listing, "backend-engineer").as_deref(),
            Some("https://jobs.example.com/careers/backend-engineer")
        );
        assert_eq!(
            posting_link(&listing, " /apply?id=7 ").as_deref(),
            Some("https://jobs.example.com/apply?id=7")
        );
        assert_eq!(
            posting_link(&listing, "https://boards.example.org/acme/42").as_deref(),
            Some("https://boards.example.org/acme/42")
        );
    }

    #[test]
    fn test_posting_link_rejects_self_references() {
        let listing = Url::parse("https://jobs.example.com/careers").unwrap();

        assert_eq!(posting_link(&listing, ""), None);
        assert_eq!(posting_link(&listing, "#open-roles"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Senior \n\t Engineer  "), "Senior Engineer");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
