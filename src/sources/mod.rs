//! Single-source fetchers for channel posts.
//!
//! Each configured endpoint is probed by [`SourceFetcher::fetch`]: one GET,
//! bounded by the descriptor's own timeout, parsed according to the
//! descriptor kind.
//!
//! # Supported Source Kinds
//!
//! | Kind | Module | Method | Notes |
//! |------|--------|--------|-------|
//! | `rss` | [`rss`] | XML deserialization | RSS 2.0 mirrors of the channel |
//! | `html-proxy` | [`proxy`] | HTML scraping | Proxies in front of `t.me/s/<channel>`, optionally JSON-wrapped |
//!
//! # Failure Model
//!
//! A fetch is a best-effort probe. Timeouts, transport errors, non-success
//! statuses, implausibly short bodies and parse failures are all logged and
//! demoted to `None`; nothing propagates past [`SourceFetcher::fetch`].

pub mod proxy;
pub mod rss;

use crate::config::{FeedConfig, SourceDescriptor, SourceKind};
use crate::dates::DateNormalizer;
use crate::models::RawPost;
use crate::sanitize::MarkupSanitizer;
use crate::utils::truncate_for_log;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::error::Error;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// `Accept` header sent to HTML proxies.
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing a single HTTP GET.
///
/// The production implementation is [`ReqwestTransport`]; tests plug in
/// canned responses.
pub trait Transport {
    /// Fetch `url`, optionally sending an `Accept` header.
    async fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpReply, Box<dyn Error>>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
        }
    }
}

impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpReply, Box<dyn Error>> {
        let mut request = self.client.get(url).header(USER_AGENT, &self.user_agent);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

/// Why a fetch produced nothing. Only ever logged.
#[derive(Debug)]
enum Rejection {
    Timeout,
    Transport(Box<dyn Error>),
    Status(u16),
    TooShort(usize),
    Unparseable(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Timeout => write!(f, "timed out"),
            Rejection::Transport(e) => write!(f, "transport error: {e}"),
            Rejection::Status(status) => write!(f, "HTTP status {status}"),
            Rejection::TooShort(len) => write!(f, "body too short ({len} chars)"),
            Rejection::Unparseable(reason) => write!(f, "unparseable: {reason}"),
        }
    }
}

/// Probes one source descriptor at a time.
#[derive(Debug)]
pub struct SourceFetcher<T> {
    transport: T,
    config: FeedConfig,
    sanitizer: MarkupSanitizer,
    dates: DateNormalizer,
}

impl<T: Transport> SourceFetcher<T> {
    pub fn new(transport: T, config: FeedConfig, dates: DateNormalizer) -> Self {
        let sanitizer = MarkupSanitizer::new(format!("{}/", config.channel_host.trim_end_matches('/')));
        Self {
            transport,
            config,
            sanitizer,
            dates,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sanitizer(&self) -> &MarkupSanitizer {
        &self.sanitizer
    }

    pub fn dates(&self) -> &DateNormalizer {
        &self.dates
    }

    /// Fetch and parse one source.
    ///
    /// `None` means the source is unusable. `Some(vec![])` means the response
    /// parsed but every record was empty; callers treat both as a miss.
    #[instrument(level = "info", skip_all, fields(url = %descriptor.url, kind = ?descriptor.kind))]
    pub async fn fetch(&self, descriptor: &SourceDescriptor) -> Option<Vec<RawPost>> {
        let t0 = Instant::now();
        match self.try_fetch(descriptor).await {
            Ok(posts) => {
                info!(
                    count = posts.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Source fetched"
                );
                Some(posts)
            }
            Err(rejection) => {
                warn!(
                    reason = %rejection,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Source unusable"
                );
                None
            }
        }
    }

    async fn try_fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<RawPost>, Rejection> {
        let accept = match descriptor.kind {
            SourceKind::Rss => None,
            SourceKind::HtmlProxy => Some(HTML_ACCEPT),
        };

        let reply = tokio::time::timeout(descriptor.timeout, self.transport.get(&descriptor.url, accept))
            .await
            .map_err(|_| Rejection::Timeout)?
            .map_err(Rejection::Transport)?;

        if !reply.is_success() {
            return Err(Rejection::Status(reply.status));
        }
        self.check_length(&reply.body)?;
        debug!(body = %truncate_for_log(&reply.body, 200), "Response received");

        match descriptor.kind {
            SourceKind::Rss => rss::parse_feed(&reply.body, &self.config, &self.sanitizer)
                .map_err(|e| Rejection::Unparseable(e.to_string())),
            SourceKind::HtmlProxy => {
                let html = match self.config.envelope_field(&descriptor.url) {
                    Some(field) => proxy::unwrap_envelope(&reply.body, field)
                        .map_err(|e| Rejection::Unparseable(e.to_string()))?,
                    None => reply.body,
                };
                self.check_length(&html)?;
                proxy::parse_preview(&html, &self.config, &self.sanitizer, self.dates.now())
                    .map_err(|e| Rejection::Unparseable(e.to_string()))
            }
        }
    }

    fn check_length(&self, body: &str) -> Result<(), Rejection> {
        let chars = body.chars().count();
        if chars < self.config.min_body_len {
            Err(Rejection::TooShort(chars))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned [`Transport`] for fetcher and aggregator tests.

    use super::{HttpReply, Transport};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::error::Error;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub enum Canned {
        Reply(u16, String),
        Delayed(Duration, u16, String),
        Fail(String),
    }

    #[derive(Debug, Default)]
    pub struct FakeTransport {
        routes: HashMap<String, Canned>,
        pub requests: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, url: &str, canned: Canned) -> Self {
            self.routes.insert(url.to_string(), canned);
            self
        }

        pub fn ok(self, url: &str, body: impl Into<String>) -> Self {
            self.route(url, Canned::Reply(200, body.into()))
        }
    }

    impl Transport for FakeTransport {
        async fn get(&self, url: &str, accept: Option<&str>) -> Result<HttpReply, Box<dyn Error>> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), accept.map(str::to_string)));
            match self.routes.get(url).cloned() {
                Some(Canned::Reply(status, body)) => Ok(HttpReply { status, body }),
                Some(Canned::Delayed(delay, status, body)) => {
                    tokio::time::sleep(delay).await;
                    Ok(HttpReply { status, body })
                }
                Some(Canned::Fail(message)) => Err(message.into()),
                None => Ok(HttpReply {
                    status: 404,
                    body: String::new(),
                }),
            }
        }
    }

    pub fn rss_feed(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(title, date)| {
                format!(
                    "<item><title>{title}</title><link>https://t.me/chan/{title}</link>\
                     <description>&lt;p&gt;Body of {title}&lt;/p&gt;</description>\
                     <pubDate>{date}</pubDate></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Channel feed</title><link>https://t.me/chan</link><description>Posts</description>{items}</channel></rss>"#
        )
    }

    pub fn preview_page(messages: &[(&str, &str, &str)]) -> String {
        let body: String = messages
            .iter()
            .map(|(post, text, datetime)| {
                format!(
                    r#"<div class="tgme_widget_message" data-post="{post}">
                         <div class="tgme_widget_message_text">{text}</div>
                         <a class="tgme_widget_message_date" href="https://t.me/{post}"><time datetime="{datetime}">now</time></a>
                       </div>"#
                )
            })
            .collect();
        format!("<!DOCTYPE html><html><head><title>Channel preview</title></head><body>{body}</body></html>")
    }
}
