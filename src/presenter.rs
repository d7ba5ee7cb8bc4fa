//! Presentation state machine.
//!
//! ```text
//! Idle ──present()──▶ Loading ──posts──▶ Success
//!                        └──nothing/panic──▶ Failure
//! ```
//!
//! One acquisition per presenter. The presenter owns a [`RenderSink`] and
//! calls exactly one of its entry points: the ranked post list on success,
//! the static fallback panel otherwise.

use crate::aggregator::PostSource;
use crate::models::NormalizedPost;
use crate::ranker::rank;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument, warn};

/// Where rendered output goes.
pub trait RenderSink {
    /// Render posts, already ranked newest first.
    fn render_posts(&mut self, posts: &[NormalizedPost]);

    /// Render the static panel pointing readers at the channel. Must not fail.
    fn render_fallback(&mut self, channel_url: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterState {
    Idle,
    Loading,
    Success { posts: usize },
    Failure,
}

#[derive(Debug)]
pub struct Presenter<S> {
    sink: S,
    channel_url: String,
    state: PresenterState,
}

impl<S: RenderSink> Presenter<S> {
    pub fn new(sink: S, channel_url: impl Into<String>) -> Self {
        Self {
            sink,
            channel_url: channel_url.into(),
            state: PresenterState::Idle,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Load posts from `source` and render them, or the fallback.
    ///
    /// Only the first call does anything; later calls log and return the
    /// settled state.
    #[instrument(level = "info", skip_all, fields(channel_url = %self.channel_url))]
    pub async fn present<P: PostSource>(&mut self, source: &P) -> PresenterState {
        if self.state != PresenterState::Idle {
            warn!(state = ?self.state, "Presenter already ran; ignoring");
            return self.state;
        }
        self.state = PresenterState::Loading;

        let loaded = match AssertUnwindSafe(source.load_posts()).catch_unwind().await {
            Ok(loaded) => loaded,
            Err(_) => {
                error!("Post acquisition panicked; rendering fallback");
                None
            }
        };

        self.state = match loaded {
            Some(posts) if !posts.is_empty() => {
                let ranked = rank(&posts);
                self.sink.render_posts(&ranked);
                info!(count = ranked.len(), "Rendered posts");
                PresenterState::Success { posts: ranked.len() }
            }
            _ => {
                self.sink.render_fallback(&self.channel_url);
                info!("Rendered fallback panel");
                PresenterState::Failure
            }
        };
        self.state
    }
}
