//! RSS mirror parser.
//!
//! Third-party mirrors republish a channel as RSS. Shapes differ between
//! mirrors, so each field has a fallback:
//!
//! - body: `description`, else `content:encoded`, else the title
//! - date: `pubDate`, else `dc:date`
//! - media: `enclosure@url`, else the first `<img src>` inside the body
//!
//! Items are collected wherever they appear, which covers both RSS 2.0
//! (`rss > channel > item`) and RSS 1.0/RDF (`rdf:RDF > item`). Markup left
//! unescaped inside a field is kept as markup for the sanitizer.

use crate::config::FeedConfig;
use crate::models::RawPost;
use crate::sanitize::MarkupSanitizer;
use crate::utils::canonical_media_url;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use regex::Regex;
use std::error::Error;
use tracing::{debug, instrument};

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex"));

/// Item children we read, by local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    ContentEncoded,
    Link,
    PubDate,
    DcDate,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"description" => Some(Field::Description),
            b"encoded" => Some(Field::ContentEncoded),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            b"date" => Some(Field::DcDate),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Item {
    title: String,
    description: String,
    content_encoded: String,
    link: String,
    pub_date: String,
    dc_date: String,
    enclosure: Option<String>,
}

impl Item {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::ContentEncoded => &mut self.content_encoded,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::DcDate => &mut self.dc_date,
        }
    }
}

/// Field currently being read, with the depth of child elements inside it.
#[derive(Debug)]
struct OpenField {
    field: Field,
    nested: usize,
}

/// Parse an RSS document into at most `config.max_items` posts.
///
/// # Errors
///
/// Returns an error if the document is not well-formed XML or holds no
/// `item` elements.
#[instrument(level = "debug", skip_all, fields(bytes = xml.len()))]
pub fn parse_feed(
    xml: &str,
    config: &FeedConfig,
    sanitizer: &MarkupSanitizer,
) -> Result<Vec<RawPost>, Box<dyn Error>> {
    let items = read_items(xml)?;
    if items.is_empty() {
        return Err("feed has no items".into());
    }
    debug!(items = items.len(), "Parsed RSS document");

    Ok(items
        .into_iter()
        .take(config.max_items)
        .map(|item| item_to_post(item, config, sanitizer))
        .collect())
}

fn read_items(xml: &str) -> Result<Vec<Item>, Box<dyn Error>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<Item> = None;
    let mut open: Option<OpenField> = None;
    let mut skip = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if let Some(item) = current.as_mut() {
                    if let Some(field) = open.as_mut() {
                        field.nested += 1;
                        push_tag(item.field_mut(field.field), &e, false)?;
                    } else if skip > 0 {
                        skip += 1;
                    } else {
                        if e.local_name().as_ref() == b"enclosure" && item.enclosure.is_none() {
                            item.enclosure = enclosure_url(&e)?;
                        }
                        // First occurrence of a field wins; unknown children are skipped whole.
                        match Field::from_local_name(e.local_name().as_ref()) {
                            Some(field) if item.field_mut(field).is_empty() => {
                                open = Some(OpenField { field, nested: 0 });
                            }
                            _ => skip = 1,
                        }
                    }
                } else if e.local_name().as_ref() == b"item" {
                    current = Some(Item::default());
                }
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    if let Some(field) = open.as_ref() {
                        push_tag(item.field_mut(field.field), &e, true)?;
                    } else if skip == 0 && e.local_name().as_ref() == b"enclosure" && item.enclosure.is_none() {
                        item.enclosure = enclosure_url(&e)?;
                    }
                }
            }
            Event::End(e) => {
                if let Some(item) = current.as_mut() {
                    match open.as_mut() {
                        Some(field) if field.nested > 0 => {
                            field.nested -= 1;
                            let target = item.field_mut(field.field);
                            target.push_str("</");
                            target.push_str(std::str::from_utf8(e.name().as_ref())?);
                            target.push('>');
                        }
                        Some(_) => open = None,
                        None if skip > 0 => skip -= 1,
                        None => items.extend(current.take()),
                    }
                }
            }
            Event::Text(e) => {
                if let (Some(item), Some(field)) = (current.as_mut(), open.as_ref()) {
                    push_text(item.field_mut(field.field), &e.decode()?, field.nested);
                }
            }
            Event::CData(e) => {
                if let (Some(item), Some(field)) = (current.as_mut(), open.as_ref()) {
                    item.field_mut(field.field).push_str(&e.decode()?);
                }
            }
            Event::GeneralRef(e) => {
                if let (Some(item), Some(field)) = (current.as_mut(), open.as_ref()) {
                    push_text(item.field_mut(field.field), &resolve_reference(&e)?, field.nested);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Append decoded text. Inside child elements it is escaped again so the
/// field stays valid markup.
fn push_text(target: &mut String, text: &str, nested: usize) {
    if nested == 0 {
        target.push_str(text);
    } else {
        target.push_str(&html_escape::encode_text(text));
    }
}

fn push_tag(target: &mut String, e: &BytesStart<'_>, empty: bool) -> Result<(), Box<dyn Error>> {
    target.push('<');
    target.push_str(std::str::from_utf8(e)?);
    target.push_str(if empty { "/>" } else { ">" });
    Ok(())
}

fn resolve_reference(e: &BytesRef<'_>) -> Result<String, Box<dyn Error>> {
    if let Some(ch) = e.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = e.decode()?;
    Ok(match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{name};"),
    })
}

fn enclosure_url(e: &BytesStart<'_>) -> Result<Option<String>, Box<dyn Error>> {
    Ok(match e.try_get_attribute("url")? {
        Some(attr) => non_empty(Some(attr.unescape_value()?.into_owned())),
        None => None,
    })
}

fn item_to_post(item: Item, config: &FeedConfig, sanitizer: &MarkupSanitizer) -> RawPost {
    let title = non_empty(Some(item.title)).unwrap_or_default();
    let description = non_empty(Some(item.description))
        .or_else(|| non_empty(Some(item.content_encoded)))
        .unwrap_or_default();
    let date = non_empty(Some(item.pub_date))
        .or_else(|| non_empty(Some(item.dc_date)))
        .unwrap_or_default();

    let media = item
        .enclosure
        .or_else(|| first_image(&description))
        .map(|url| canonical_media_url(&url, &config.cdn_hosts))
        .unwrap_or_default();

    let body = if description.is_empty() { &title } else { &description };
    RawPost {
        text: sanitizer.sanitize(body),
        title,
        date,
        link: non_empty(Some(item.link)).unwrap_or_default(),
        media,
    }
}

fn first_image(html: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
