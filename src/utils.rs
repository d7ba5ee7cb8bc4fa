//! Utility functions for URL canonicalization, text previews and file system checks.
//!
//! - CDN media URL handling (query stripping, size-variant rewriting)
//! - Plain-text previews and truncation of post bodies
//! - Log-friendly string truncation
//! - Output directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Whether `url` is served by one of the given CDN host patterns.
pub fn is_cdn_url(url: &str, cdn_hosts: &[String]) -> bool {
    !url.is_empty() && cdn_hosts.iter().any(|host| url.contains(host.as_str()))
}

/// Strip the query string from CDN media URLs.
///
/// Telegram's CDN encodes thumbnail sizing in the query; without it the
/// original resolution is served. Non-CDN URLs are returned unchanged.
///
/// # Examples
///
/// ```ignore
/// let hosts = vec!["cdn.telegram.org".to_string()];
/// assert_eq!(canonical_media_url("https://cdn.telegram.org/f.jpg?s=1", &hosts), "https://cdn.telegram.org/f.jpg");
/// ```
pub fn canonical_media_url(url: &str, cdn_hosts: &[String]) -> String {
    if is_cdn_url(url, cdn_hosts) {
        url.split('?').next().unwrap_or(url).to_string()
    } else {
        url.to_string()
    }
}

/// Request the large size variant of a CDN image.
pub fn large_media_url(url: &str, cdn_hosts: &[String]) -> String {
    if is_cdn_url(url, cdn_hosts) {
        format!("{}?size=large", canonical_media_url(url, cdn_hosts))
    } else {
        url.to_string()
    }
}

/// Remove all markup from an HTML fragment and decode entities.
pub fn strip_tags(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, "");
    html_escape::decode_html_entities(&without_tags).into_owned()
}

/// Truncate to at most `max` characters, appending `ellipsis` when cut.
pub fn truncate_chars(s: &str, max: usize, ellipsis: &str) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &s[..idx], ellipsis),
        None => s.to_string(),
    }
}

/// Plain-text headline for posts that carry no title of their own.
///
/// Takes the first 100 characters of the stripped body and appends `...`
/// when the body is longer.
pub fn title_from_text(html: &str) -> String {
    truncate_chars(strip_tags(html).trim(), 100, "...")
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to roughly `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure the directory that will hold `file_path` exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
#[instrument(level = "info", skip_all, fields(path = %file_path.display()))]
pub async fn ensure_parent_dir(file_path: &Path) -> Result<(), Box<dyn Error>> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            info!(dir = %parent.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
