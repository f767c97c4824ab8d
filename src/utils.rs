//! Text and file system helpers shared by the scrapers and the driver.
//!
//! - Whitespace normalization for loosely formatted table cells
//! - Markup stripping for rich-text API fields
//! - Link resolution against a source's origin
//! - Log-friendly truncation of response bodies
//! - Output directory validation

use itertools::Itertools;
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// Exchange pages pad their date cells with newlines, tabs and `&nbsp;`,
/// all of which count as whitespace here.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  12  December "), "12 December");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Strip inline HTML from a rich-text field and return its plain text.
///
/// Entities are decoded by the HTML parser; the result is whitespace-normalized.
pub fn strip_markup(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    normalize_whitespace(&parsed.root_element().text().join(" "))
}

/// Resolve an `href` found on a source page into an absolute URL.
///
/// Relative links are joined onto the source's origin, so `../foo/bar.pdf`
/// becomes `{origin}/foo/bar.pdf`. Absolute links come back unchanged. An
/// empty href yields an empty string.
pub fn resolve_link(origin: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match Url::parse(origin).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters with an ellipsis and a byte
/// count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  12  December "), "12 December");
        assert_eq!(normalize_whitespace("Oct\n\t19,   2026"), "Oct 19, 2026");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_strip_markup() {
        let html = "<p>Trading holiday on <b>account</b> of&nbsp;Diwali</p><br/><p>Members  note.</p>";
        assert_eq!(strip_markup(html), "Trading holiday on account of Diwali Members note.");
        assert_eq!(strip_markup("plain text"), "plain text");
    }

    #[test]
    fn test_resolve_link_relative() {
        assert_eq!(
            resolve_link("https://www.bseindia.com", "../foo/bar.pdf"),
            "https://www.bseindia.com/foo/bar.pdf"
        );
        assert_eq!(
            resolve_link("https://www.bseindia.com", "/docs/x.pdf"),
            "https://www.bseindia.com/docs/x.pdf"
        );
    }

    #[test]
    fn test_resolve_link_absolute_and_empty() {
        assert_eq!(
            resolve_link("https://www.sebi.gov.in", "https://example.org/a.pdf"),
            "https://example.org/a.pdf"
        );
        assert_eq!(resolve_link("https://www.sebi.gov.in", "  "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("परिपत्र", 2);
        assert!(result.starts_with("पर"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("today");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
