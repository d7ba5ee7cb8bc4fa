//! Scraper for the channel's public web preview (`t.me/s/<channel>`).
//!
//! The preview page is fetched through third-party CORS proxies. Some
//! proxies return the page verbatim, others wrap it in a JSON object; see
//! [`unwrap_envelope`].
//!
//! # Page Structure
//!
//! ```text
//! .tgme_widget_message[data-post="channel/123"]
//! ├── .tgme_widget_message_photo_wrap[style="background-image:url('…')"]
//! ├── .tgme_widget_message_text           (post body, HTML)
//! └── a.tgme_widget_message_date[href]    (permalink)
//!     └── time[datetime]
//! ```

use crate::config::FeedConfig;
use crate::models::RawPost;
use crate::sanitize::MarkupSanitizer;
use crate::utils::{canonical_media_url, title_from_text};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{debug, instrument};

static MESSAGE: Lazy<Selector> = Lazy::new(|| selector(".tgme_widget_message"));
static MESSAGE_TEXT: Lazy<Selector> = Lazy::new(|| selector(".tgme_widget_message_text"));
static MESSAGE_DATE: Lazy<Selector> = Lazy::new(|| selector(".tgme_widget_message_date"));
static MESSAGE_TIME: Lazy<Selector> = Lazy::new(|| selector(".tgme_widget_message_date time"));
static MEDIA_WRAP: Lazy<Selector> =
    Lazy::new(|| selector(".tgme_widget_message_photo_wrap, .tgme_widget_message_video_wrap"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));

static STYLE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(['"]?([^'")]+)['"]?\)"#).expect("valid style url regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Extract the page from a JSON-wrapping proxy response.
///
/// # Errors
///
/// Returns an error if the body is not JSON or `field` is not a string.
pub fn unwrap_envelope(body: &str, field: &str) -> Result<String, Box<dyn Error>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("envelope has no string field `{field}`").into())
}

/// Parse a preview page into at most `config.max_items` posts.
///
/// Messages with neither text nor media are skipped, so the result may be
/// empty even though the page had messages.
///
/// # Errors
///
/// Returns an error if the page holds no message elements.
#[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
pub fn parse_preview(
    html: &str,
    config: &FeedConfig,
    sanitizer: &MarkupSanitizer,
    now: DateTime<Utc>,
) -> Result<Vec<RawPost>, Box<dyn Error>> {
    let document = Html::parse_document(html);
    let messages: Vec<ElementRef<'_>> = document.select(&MESSAGE).collect();
    if messages.is_empty() {
        return Err("page has no message elements".into());
    }
    debug!(messages = messages.len(), "Parsed preview page");

    let posts = messages
        .into_iter()
        .take(config.max_items)
        .filter_map(|message| message_to_post(message, config, sanitizer, now))
        .collect();
    Ok(posts)
}

fn message_to_post(
    message: ElementRef<'_>,
    config: &FeedConfig,
    sanitizer: &MarkupSanitizer,
    now: DateTime<Utc>,
) -> Option<RawPost> {
    let text = message
        .select(&MESSAGE_TEXT)
        .next()
        .map(|el| sanitizer.sanitize(&el.inner_html()))
        .unwrap_or_default();

    let date = message
        .select(&MESSAGE_TIME)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .map(str::to_string)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true));

    let link = permalink(message, config);
    let media = media_url(message)
        .map(|url| canonical_media_url(&url, &config.cdn_hosts))
        .unwrap_or_default();

    if text.trim().is_empty() && media.is_empty() {
        debug!(post = ?message.value().attr("data-post"), "Skipping empty message");
        return None;
    }

    Some(RawPost {
        title: title_from_text(&text),
        text,
        date,
        link,
        media,
    })
}

/// Permalink of a message.
///
/// Prefers an absolute date-link href, then the `data-post` identifier, then
/// a relative href resolved against the channel host.
fn permalink(message: ElementRef<'_>, config: &FeedConfig) -> String {
    let host = config.channel_host.trim_end_matches('/');
    let href = message
        .select(&MESSAGE_DATE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    if let Some(href) = href.filter(|href| href.starts_with("http")) {
        return href.to_string();
    }

    if let Some(post_id) = message.value().attr("data-post").map(str::trim).filter(|id| !id.is_empty()) {
        // Telegram writes `channel/123`; bare ids hang off the channel URL.
        return if post_id.contains('/') {
            format!("{}/{}", host, post_id.trim_start_matches('/'))
        } else {
            format!("{}/{}", config.channel_url(), post_id)
        };
    }

    match href {
        Some(href) => url::Url::parse(host)
            .and_then(|base| base.join(href))
            .map(|resolved| resolved.to_string())
            .unwrap_or_else(|_| format!("{host}{href}")),
        None => String::new(),
    }
}

/// Media URL of a message: `img[data-src]`, then `img[src]`, then the
/// wrap's CSS `background-image`.
fn media_url(message: ElementRef<'_>) -> Option<String> {
    let wrap = message.select(&MEDIA_WRAP).next()?;

    let from_img = wrap.select(&IMG).next().and_then(|img| {
        let attrs = img.value();
        attrs
            .attr("data-src")
            .or_else(|| attrs.attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(str::to_string)
    });
    if from_img.is_some() {
        return from_img;
    }

    let style = wrap.value().attr("style")?;
    STYLE_URL_RE
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
