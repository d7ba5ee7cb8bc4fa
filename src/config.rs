//! Feed configuration.
//!
//! The channel name is the only required setting; everything else has a
//! default matching the public Telegram mirrors and proxies this tool knows
//! about. A YAML file can override any field:
//!
//! ```yaml
//! channel: mgkeit
//! sources:
//!   - url: "https://tg.i-c-a.su/rss/{channel}"
//!     kind: rss
//!     timeout_ms: 4000
//!   - url: "https://api.codetabs.com/v1/proxy?quest={preview_url_encoded}"
//!     kind: html-proxy
//!     timeout_ms: 5000
//! ```
//!
//! URL templates may use `{channel}` and `{preview_url_encoded}` (the
//! percent-encoded `https://t.me/s/<channel>` preview page).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Acquisition strategy a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// An RSS 2.0 mirror of the channel.
    Rss,
    /// A CORS/HTML proxy in front of the channel's public preview page.
    HtmlProxy,
}

/// A configured endpoint before the channel name is interpolated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTemplate {
    pub url: String,
    pub kind: SourceKind,
    pub timeout_ms: u64,
}

/// A proxy that wraps the fetched page in a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEnvelope {
    /// Matched against the host of the descriptor URL.
    pub host: String,
    /// Field of the JSON object that holds the page.
    pub field: String,
}

/// One fetch attempt: a concrete URL with its own timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    pub kind: SourceKind,
    pub timeout: Duration,
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>, kind: SourceKind, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            kind,
            timeout,
        }
    }
}

/// Labels and limits used when rendering posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// chrono locale name for post dates, e.g. `ru_RU` or `en_US`.
    pub locale: String,
    /// strftime-style layout for post dates.
    pub date_format: String,
    /// Bodies longer than this (in plain-text characters) are truncated.
    pub max_body_chars: usize,
    pub read_more_label: String,
    pub image_alt: String,
    pub fallback_title: String,
    pub fallback_message: String,
    pub fallback_link_label: String,
    pub fallback_copy_label: String,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            locale: "ru_RU".to_string(),
            date_format: "%-d %B %Y, %H:%M".to_string(),
            max_body_chars: 1500,
            read_more_label: "Читать в Telegram →".to_string(),
            image_alt: "Изображение поста".to_string(),
            fallback_title: "Не удалось загрузить посты автоматически".to_string(),
            fallback_message: "Все посты доступны напрямую в Telegram-канале.".to_string(),
            fallback_link_label: "Открыть канал в Telegram →".to_string(),
            fallback_copy_label: "Или скопируйте ссылку:".to_string(),
        }
    }
}

/// Everything the aggregator and renderers need to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Public channel username, without `@`.
    pub channel: String,
    /// Base URL of the messenger's web host, used for permalinks.
    pub channel_host: String,
    pub sources: Vec<SourceTemplate>,
    pub json_envelopes: Vec<JsonEnvelope>,
    /// Host patterns of the media CDN whose URLs carry sizing queries.
    pub cdn_hosts: Vec<String>,
    /// Responses shorter than this many characters are treated as error stubs.
    pub min_body_len: usize,
    /// Upper bound on posts taken from a single response.
    pub max_items: usize,
    pub user_agent: String,
    pub presentation: PresentationConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let rss = |url: &str| SourceTemplate {
            url: url.to_string(),
            kind: SourceKind::Rss,
            timeout_ms: 4000,
        };
        let proxy = |url: &str| SourceTemplate {
            url: url.to_string(),
            kind: SourceKind::HtmlProxy,
            timeout_ms: 5000,
        };
        Self {
            channel: "mgkeit".to_string(),
            channel_host: "https://t.me".to_string(),
            sources: vec![
                rss("https://t.me/s/{channel}/rss"),
                rss("https://tg.i-c-a.su/rss/{channel}"),
                rss("https://rss.app/rss-feed/telegram-channel/{channel}"),
                proxy("https://api.allorigins.win/get?url={preview_url_encoded}"),
                proxy("https://api.codetabs.com/v1/proxy?quest={preview_url_encoded}"),
            ],
            json_envelopes: vec![JsonEnvelope {
                host: "allorigins".to_string(),
                field: "contents".to_string(),
            }],
            cdn_hosts: vec!["cdn.telegram.org".to_string(), "telesco.pe".to_string()],
            min_body_len: 100,
            max_items: 20,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            presentation: PresentationConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Build a configuration from an optional YAML file and an optional
    /// channel override (CLI/env wins over the file).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>, channel: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let mut config = match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => Self::default(),
        };
        if let Some(channel) = channel {
            config.channel = channel.trim_start_matches('@').to_string();
        }
        info!(channel = %config.channel, sources = config.sources.len(), "Configuration ready");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// `https://t.me/<channel>`
    pub fn channel_url(&self) -> String {
        format!("{}/{}", self.channel_host.trim_end_matches('/'), self.channel)
    }

    /// `https://t.me/s/<channel>`, the public web preview of the channel.
    pub fn preview_url(&self) -> String {
        format!("{}/s/{}", self.channel_host.trim_end_matches('/'), self.channel)
    }

    /// Interpolate a URL template.
    pub fn resolve_url(&self, template: &str) -> String {
        template
            .replace("{channel}", &self.channel)
            .replace("{preview_url_encoded}", &urlencoding::encode(&self.preview_url()))
    }

    /// Descriptors of one strategy, in configured (priority) order.
    pub fn descriptors(&self, kind: SourceKind) -> Vec<SourceDescriptor> {
        self.sources
            .iter()
            .filter(|source| source.kind == kind)
            .map(|source| {
                SourceDescriptor::new(
                    self.resolve_url(&source.url),
                    kind,
                    Duration::from_millis(source.timeout_ms),
                )
            })
            .collect()
    }

    /// JSON field to unwrap for responses from `url`, if its host is a known envelope proxy.
    pub fn envelope_field(&self, url: &str) -> Option<&str> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_string();
        self.json_envelopes
            .iter()
            .find(|envelope| host.contains(envelope.host.as_str()))
            .map(|envelope| envelope.field.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptors_per_strategy() {
        let config = FeedConfig::default();
        let rss = config.descriptors(SourceKind::Rss);
        let proxy = config.descriptors(SourceKind::HtmlProxy);

        assert_eq!(rss.len(), 3);
        assert_eq!(proxy.len(), 2);
        assert_eq!(rss[0].url, "https://t.me/s/mgkeit/rss");
        assert_eq!(rss[1].url, "https://tg.i-c-a.su/rss/mgkeit");
        assert_eq!(rss[0].timeout, Duration::from_millis(4000));
        assert_eq!(proxy[0].timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_preview_url_is_percent_encoded() {
        let config = FeedConfig::default();
        let proxy = config.descriptors(SourceKind::HtmlProxy);
        assert_eq!(
            proxy[0].url,
            "https://api.allorigins.win/get?url=https%3A%2F%2Ft.me%2Fs%2Fmgkeit"
        );
    }

    #[test]
    fn test_channel_urls() {
        let config = FeedConfig {
            channel: "news".to_string(),
            channel_host: "https://t.me/".to_string(),
            ..FeedConfig::default()
        };
        assert_eq!(config.channel_url(), "https://t.me/news");
        assert_eq!(config.preview_url(), "https://t.me/s/news");
    }

    #[test]
    fn test_envelope_field_matches_host_only() {
        let config = FeedConfig::default();
        assert_eq!(
            config.envelope_field("https://api.allorigins.win/get?url=x"),
            Some("contents")
        );
        assert_eq!(
            config.envelope_field("https://api.codetabs.com/v1/proxy?quest=allorigins"),
            None
        );
        assert_eq!(config.envelope_field("not a url"), None);
    }

    #[test]
    fn test_yaml_overrides_keep_defaults() {
        let yaml = r#"
channel: example
min_body_len: 10
sources:
  - url: "https://mirror.test/{channel}.xml"
    kind: rss
    timeout_ms: 1500
presentation:
  locale: en_US
"#;
        let config = FeedConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.channel, "example");
        assert_eq!(config.min_body_len, 10);
        assert_eq!(config.max_items, 20);
        assert_eq!(config.presentation.locale, "en_US");
        assert_eq!(config.presentation.max_body_chars, 1500);

        let rss = config.descriptors(SourceKind::Rss);
        assert_eq!(rss.len(), 1);
        assert_eq!(rss[0].url, "https://mirror.test/example.xml");
        assert_eq!(rss[0].timeout, Duration::from_millis(1500));
        assert!(config.descriptors(SourceKind::HtmlProxy).is_empty());
    }

    #[tokio::test]
    async fn test_load_channel_override_strips_at() {
        let config = FeedConfig::load(None, Some("@other")).await.unwrap();
        assert_eq!(config.channel, "other");
        assert_eq!(config.channel_url(), "https://t.me/other");
    }
}
