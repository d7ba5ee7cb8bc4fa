//! Data models for channel posts.
//!
//! - [`RawPost`]: a post exactly as one source produced it
//! - [`NormalizedPost`]: a post with a comparable publication instant and
//!   sanitized text, ready for ranking and rendering

use crate::dates::DateNormalizer;
use crate::sanitize::MarkupSanitizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as extracted by a single source fetch.
///
/// Nothing here is validated. The `date` is whatever string the source
/// carried and `text` may still hold arbitrary markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPost {
    /// Headline or plain-text preview of the post.
    pub title: String,
    /// Body of the post, possibly HTML.
    pub text: String,
    /// Publication date in whatever format the source used.
    pub date: String,
    /// Permalink to the post, possibly empty.
    pub link: String,
    /// Image URL attached to the post, possibly empty.
    pub media: String,
}

/// A post ready for ranking and presentation.
///
/// `published` is always a real instant: see [`DateNormalizer::normalize`]
/// for how missing and malformed dates are mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub title: String,
    /// Body restricted to the sanitizer's allow-listed markup.
    pub text: String,
    /// The date string as the source reported it.
    pub date: String,
    /// Normalized publication instant.
    pub published: DateTime<Utc>,
    pub link: String,
    pub media: String,
}

impl NormalizedPost {
    /// Normalize a raw post.
    ///
    /// Sanitizing is idempotent, so text that a fetcher already cleaned comes
    /// through unchanged.
    pub fn from_raw(raw: RawPost, dates: &DateNormalizer, sanitizer: &MarkupSanitizer) -> Self {
        let published = dates.normalize(Some(&raw.date));
        Self {
            title: raw.title,
            text: sanitizer.sanitize(&raw.text),
            date: raw.date,
            published,
            link: raw.link,
            media: raw.media,
        }
    }
}
