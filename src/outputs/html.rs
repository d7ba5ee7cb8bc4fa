//! HTML rendering of the feed.
//!
//! Produces a self-contained fragment meant to be dropped into a page. Post
//! bodies are inserted as-is because they already went through the
//! sanitizer; every other interpolated value is escaped here.

use crate::config::{FeedConfig, PresentationConfig};
use crate::models::NormalizedPost;
use crate::presenter::RenderSink;
use crate::utils::{large_media_url, strip_tags, truncate_chars};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, Locale, SecondsFormat};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use tracing::warn;

/// Locales accepted in the `presentation.locale` setting.
fn parse_locale(name: &str) -> Locale {
    match name {
        "ru_RU" => Locale::ru_RU,
        "uk_UA" => Locale::uk_UA,
        "en_US" => Locale::en_US,
        "en_GB" => Locale::en_GB,
        "de_DE" => Locale::de_DE,
        "fr_FR" => Locale::fr_FR,
        "POSIX" | "C" => Locale::POSIX,
        other => {
            warn!(locale = other, "Unsupported locale; falling back to POSIX");
            Locale::POSIX
        }
    }
}

#[derive(Debug)]
pub struct HtmlPage {
    presentation: PresentationConfig,
    locale: Locale,
    cdn_hosts: Vec<String>,
    channel_url: String,
    out: String,
}

/// Whether `format` is a strftime string chrono can render.
fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl HtmlPage {
    pub fn new(config: &FeedConfig) -> Self {
        let mut presentation = config.presentation.clone();
        if !is_valid_date_format(&presentation.date_format) {
            let fallback = PresentationConfig::default().date_format;
            warn!(
                date_format = %presentation.date_format,
                %fallback,
                "Invalid date format; using default"
            );
            presentation.date_format = fallback;
        }
        Self {
            locale: parse_locale(&presentation.locale),
            presentation,
            cdn_hosts: config.cdn_hosts.clone(),
            channel_url: config.channel_url(),
            out: String::new(),
        }
    }

    pub fn into_html(self) -> String {
        self.out
    }

    fn body_html(&self, post: &NormalizedPost) -> String {
        if post.text.trim().is_empty() {
            return text(&post.title).into_owned();
        }
        let plain = strip_tags(&post.text);
        if plain.chars().count() > self.presentation.max_body_chars {
            text(&truncate_chars(plain.trim(), self.presentation.max_body_chars, "…")).into_owned()
        } else {
            post.text.clone()
        }
    }

    fn write_post(&mut self, post: &NormalizedPost) {
        let body = self.body_html(post);
        let date = post
            .published
            .with_timezone(&Local)
            .format_localized(&self.presentation.date_format, self.locale)
            .to_string();
        let link = if post.link.is_empty() { &self.channel_url } else { &post.link };

        let mut block = String::from("  <article class=\"post\">\n");
        if !post.media.is_empty() {
            let src = large_media_url(&post.media, &self.cdn_hosts);
            block.push_str(&format!(
                "    <div class=\"post-media\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\" decoding=\"async\"></div>\n",
                attr(&src),
                attr(&self.presentation.image_alt)
            ));
        }
        block.push_str("    <div class=\"post-content\">\n");
        block.push_str(&format!("      <div class=\"post-text\">{body}</div>\n"));
        block.push_str("      <div class=\"post-footer\">\n");
        block.push_str(&format!(
            "        <time class=\"post-date\" datetime=\"{}\">{}</time>\n",
            post.published.to_rfc3339_opts(SecondsFormat::Secs, true),
            text(&date)
        ));
        block.push_str(&format!(
            "        <a class=\"post-link\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>\n",
            attr(link),
            text(&self.presentation.read_more_label)
        ));
        block.push_str("      </div>\n    </div>\n  </article>\n");
        self.out.push_str(&block);
    }

    fn write_fallback(&mut self, channel_url: &str) {
        let p = &self.presentation;
        let block = format!(
            "<section class=\"channel-fallback\">\n  <h3>{}</h3>\n  <p>{}</p>\n  \
             <p><a class=\"channel-link\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></p>\n  \
             <p>{} <code>{}</code></p>\n</section>\n",
            text(&p.fallback_title),
            text(&p.fallback_message),
            attr(channel_url),
            text(&p.fallback_link_label),
            text(&p.fallback_copy_label),
            text(channel_url)
        );
        self.out.push_str(&block);
    }
}

impl RenderSink for HtmlPage {
    fn render_posts(&mut self, posts: &[NormalizedPost]) {
        self.out.push_str("<section class=\"channel-feed\">\n");
        for post in posts {
            self.write_post(post);
        }
        self.out.push_str("</section>\n");
    }

    fn render_fallback(&mut self, channel_url: &str) {
        self.write_fallback(channel_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post() -> NormalizedPost {
        NormalizedPost {
            title: "Title".to_string(),
            text: "<p>Hello <b>there</b></p>".to_string(),
            date: "2024-06-15T12:00:00Z".to_string(),
            published: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            link: "https://t.me/mgkeit/5".to_string(),
            media: String::new(),
        }
    }

    fn render(posts: &[NormalizedPost], config: &FeedConfig) -> String {
        let mut page = HtmlPage::new(config);
        page.render_posts(posts);
        page.into_html()
    }

    #[test]
    fn test_post_block() {
        let html = render(&[post()], &FeedConfig::default());
        assert!(html.starts_with("<section class=\"channel-feed\">"));
        assert!(html.contains("<div class=\"post-text\"><p>Hello <b>there</b></p></div>"));
        assert!(html.contains("datetime=\"2024-06-15T12:00:00Z\""));
        assert!(html.contains("2024"));
        assert!(html.contains("href=\"https://t.me/mgkeit/5\""));
        assert!(!html.contains("post-media"));
    }

    #[test]
    fn test_missing_link_points_at_channel() {
        let mut p = post();
        p.link = String::new();
        let html = render(&[p], &FeedConfig::default());
        assert!(html.contains("href=\"https://t.me/mgkeit\""));
    }

    #[test]
    fn test_cdn_media_requests_large_variant() {
        let mut p = post();
        p.media = "https://cdn4.cdn.telegram.org/file/x.jpg?s=1".to_string();
        let html = render(&[p], &FeedConfig::default());
        assert!(html.contains("<img src=\"https://cdn4.cdn.telegram.org/file/x.jpg?size=large\""));
        assert!(html.contains("loading=\"lazy\""));
    }

    #[test]
    fn test_empty_text_uses_escaped_title() {
        let mut p = post();
        p.text = String::new();
        p.title = "Q&A <today>".to_string();
        let html = render(&[p], &FeedConfig::default());
        assert!(html.contains("<div class=\"post-text\">Q&amp;A &lt;today&gt;</div>"));
    }

    #[test]
    fn test_long_body_is_truncated_as_plain_text() {
        let mut config = FeedConfig::default();
        config.presentation.max_body_chars = 10;
        let mut p = post();
        p.text = "<p>abcdefghij<b>klmnop</b></p>".to_string();
        let html = render(&[p], &config);
        assert!(html.contains("<div class=\"post-text\">abcdefghij…</div>"));
    }

    #[test]
    fn test_english_locale_month_name() {
        let mut config = FeedConfig::default();
        config.presentation.locale = "en_US".to_string();
        config.presentation.date_format = "%B %Y".to_string();
        let html = render(&[post()], &config);
        assert!(html.contains(">June 2024</time>"));
    }

    #[test]
    fn test_invalid_date_format_uses_default() {
        let mut config = FeedConfig::default();
        config.presentation.locale = "en_US".to_string();
        config.presentation.date_format = "%Q %B".to_string();
        let page = HtmlPage::new(&config);
        assert_eq!(page.presentation.date_format, PresentationConfig::default().date_format);

        let html = render(&[post()], &config);
        assert!(html.contains("June 2024"));
        assert!(!html.contains("%Q"));
    }

    #[test]
    fn test_date_format_validation() {
        assert!(is_valid_date_format("%-d %B %Y, %H:%M"));
        assert!(!is_valid_date_format("%Q"));
    }

    #[test]
    fn test_fallback_panel() {
        let mut page = HtmlPage::new(&FeedConfig::default());
        page.render_fallback("https://t.me/mgkeit");
        let html = page.into_html();
        assert!(html.starts_with("<section class=\"channel-fallback\">"));
        assert!(html.contains("href=\"https://t.me/mgkeit\""));
        assert!(html.contains("<code>https://t.me/mgkeit</code>"));
        assert!(!html.contains("<article"));
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        assert!(matches!(parse_locale("xx_XX"), Locale::POSIX));
    }
}
