// src/utils/display.rs

//! Terminal formatting helpers with server-style framing.
//!
//! Used by the console sink and the CLI summaries. Each helper returns the
//! formatted block so callers decide where it is written.

use chrono::Local;

const WIDTH: usize = 60;

/// Timestamp prefix shared by all blocks.
fn stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Separator line.
pub fn separator() -> String {
    "─".repeat(WIDTH)
}

/// Framed header.
pub fn header(title: &str) -> String {
    let border = "═".repeat(WIDTH);
    format!("{border}\n  [{}] {title}\n{border}", stamp())
}

/// Indented sub-item.
pub fn sub_item(message: &str) -> String {
    format!("    {message}")
}

/// Summary section of `key: value` pairs.
pub fn summary(title: &str, items: &[(&str, String)]) -> String {
    let mut out = format!("[{}] [SUMMARY] {}", stamp(), title);
    for (key, value) in items {
        out.push('\n');
        out.push_str(&sub_item(&format!("{key}: {value}")));
    }
    out
}
