//! Allow-list sanitizer for post markup.
//!
//! Post bodies arrive as HTML fragments lifted from Telegram's public preview
//! page or from RSS mirrors of it. The sanitizer parses the fragment and
//! re-emits only a small set of tags:
//!
//! | Input | Output |
//! |-------|--------|
//! | `<br>`, `<br/>`, `<br />` | `<br>` |
//! | `p`, `b`, `strong`, `i`, `em` | same tag, attributes dropped |
//! | `<a href=…>` | `<a href=… target="_blank" rel="noopener noreferrer">` |
//! | member widget anchor | removed with its contents |
//! | `@mention` anchor to the channel host | removed with its contents |
//! | `script`, `style`, `template` | removed with their contents |
//! | any other element | unwrapped, children kept |
//!
//! This is a filter for content that ends up in our own page, not a defense
//! against arbitrary hostile HTML: `href` schemes are not inspected.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Class Telegram puts on the author widget inside forwarded messages.
pub const MEMBER_WIDGET_CLASS: &str = "tgme_widget_message_user";

/// Tags emitted as-is (minus attributes).
const PASSTHROUGH_TAGS: &[&str] = &["p", "b", "strong", "i", "em"];

/// Tags whose whole subtree is dropped.
const DROPPED_TAGS: &[&str] = &["script", "style", "template"];

#[derive(Debug, Clone)]
pub struct MarkupSanitizer {
    /// Anchors pointing under this prefix with `@`-text are self-mentions.
    channel_host: String,
    member_widget_class: String,
}

impl Default for MarkupSanitizer {
    fn default() -> Self {
        Self::new("https://t.me/")
    }
}

impl MarkupSanitizer {
    pub fn new(channel_host: impl Into<String>) -> Self {
        Self {
            channel_host: channel_host.into(),
            member_widget_class: MEMBER_WIDGET_CLASS.to_string(),
        }
    }

    /// Sanitize an HTML fragment. Empty input gives an empty string.
    pub fn sanitize(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        self.write_children(fragment.root_element(), &mut out);
        out
    }

    fn write_children(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.write_element(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
        let name = element.value().name();
        match name {
            "br" => out.push_str("<br>"),
            "a" => self.write_anchor(element, out),
            _ if PASSTHROUGH_TAGS.contains(&name) => {
                out.push('<');
                out.push_str(name);
                out.push('>');
                self.write_children(element, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ if DROPPED_TAGS.contains(&name) => {}
            _ => self.write_children(element, out),
        }
    }

    fn write_anchor(&self, anchor: ElementRef<'_>, out: &mut String) {
        if self.is_member_widget(anchor) || self.is_self_mention(anchor) {
            return;
        }
        let Some(href) = anchor.value().attr("href") else {
            self.write_children(anchor, out);
            return;
        };
        out.push_str("<a href=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(href));
        out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
        self.write_children(anchor, out);
        out.push_str("</a>");
    }

    fn is_member_widget(&self, anchor: ElementRef<'_>) -> bool {
        anchor
            .value()
            .classes()
            .any(|class| class == self.member_widget_class)
    }

    fn is_self_mention(&self, anchor: ElementRef<'_>) -> bool {
        let points_home = anchor
            .value()
            .attr("href")
            .is_some_and(|href| href.starts_with(&self.channel_host));
        points_home && anchor.text().collect::<String>().trim_start().starts_with('@')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str) -> String {
        MarkupSanitizer::default().sanitize(html)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("  \n"), "");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(sanitize("Just words"), "Just words");
    }

    #[test]
    fn test_br_variants_are_canonical() {
        assert_eq!(sanitize("a<br/>b<BR />c<br>d"), "a<br>b<br>c<br>d");
    }

    #[test]
    fn test_allowed_tags_keep_structure_but_lose_attributes() {
        assert_eq!(
            sanitize(r#"<p class="x">Hi <b>bold</b> <strong>s</strong> <i>it</i> <em style="c">e</em></p>"#),
            "<p>Hi <b>bold</b> <strong>s</strong> <i>it</i> <em>e</em></p>"
        );
    }

    #[test]
    fn test_member_widget_is_removed() {
        let html = r#"<a class="tgme_widget_message_user" href="https://t.me/someone"><i>pic</i>Someone</a>Text"#;
        assert_eq!(sanitize(html), "Text");
    }

    #[test]
    fn test_self_mention_is_removed() {
        let html = r#"Hello <a href="https://t.me/channel">@channel</a> world"#;
        assert_eq!(sanitize(html), "Hello  world");
    }

    #[test]
    fn test_channel_link_without_mention_is_kept() {
        let html = r#"<a href="https://t.me/channel/42">post</a>"#;
        assert_eq!(
            sanitize(html),
            r#"<a href="https://t.me/channel/42" target="_blank" rel="noopener noreferrer">post</a>"#
        );
    }

    #[test]
    fn test_anchor_rewrite_drops_other_attributes() {
        let html = r#"<a href="https://example.com/?a=1&amp;b=2" onclick="evil()" target="_self">site</a>"#;
        assert_eq!(
            sanitize(html),
            r#"<a href="https://example.com/?a=1&amp;b=2" target="_blank" rel="noopener noreferrer">site</a>"#
        );
    }

    #[test]
    fn test_anchor_without_href_is_unwrapped() {
        assert_eq!(sanitize(r#"<a name="top">anchor</a>"#), "anchor");
    }

    #[test]
    fn test_unknown_elements_are_unwrapped() {
        assert_eq!(
            sanitize(r#"<div><span class="tg-spoiler">secret</span> <code>x &lt; y</code></div>"#),
            "secret x &lt; y"
        );
    }

    #[test]
    fn test_script_and_style_are_dropped() {
        assert_eq!(sanitize("a<script>alert(1)</script><style>p{}</style>b"), "ab");
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(sanitize("a<!-- note -->b"), "ab");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Plain & simple",
            "<p>Hello <b>world</b><br/>line &amp; more</p>",
            r#"<p><a href="https://example.com/a?b=1&c=2">link</a> and <em>em</em></p>"#,
            "<strong>bold</strong><br><i>it</i>",
            r#"Quote: "x" <a href="https://t.me/chan">@chan</a>"#,
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}
