//! JSON rendering of the feed.
//!
//! ```json
//! {"status": "ok", "posts": [{"title": "…", "published": "2024-06-01T10:00:00Z", …}]}
//! {"status": "fallback", "channel_url": "https://t.me/<channel>"}
//! ```

use crate::models::NormalizedPost;
use crate::presenter::RenderSink;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Document<'a> {
    Ok { posts: &'a [NormalizedPost] },
    Fallback { channel_url: &'a str },
}

#[derive(Debug, Default)]
pub struct JsonFeed {
    out: String,
}

impl JsonFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_json(self) -> String {
        self.out
    }

    fn write(&mut self, document: &Document<'_>) {
        match serde_json::to_string_pretty(document) {
            Ok(json) => {
                self.out = json;
                self.out.push('\n');
            }
            Err(e) => error!(error = %e, "Failed to serialize feed document"),
        }
    }
}

impl RenderSink for JsonFeed {
    fn render_posts(&mut self, posts: &[NormalizedPost]) {
        self.write(&Document::Ok { posts });
    }

    fn render_fallback(&mut self, channel_url: &str) {
        self.write(&Document::Fallback { channel_url });
    }
}
