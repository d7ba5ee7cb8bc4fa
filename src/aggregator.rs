//! Fan-out acquisition across strategies and sources.
//!
//! Every configured source is probed concurrently. Selection happens only
//! after all probes have settled and follows fixed priorities, never arrival
//! order:
//!
//! 1. Within a strategy, the first descriptor (in configured order) that
//!    produced a non-empty list wins.
//! 2. Across strategies, RSS wins over the HTML proxies.
//!
//! Lists from different sources are never merged.

use crate::config::{FeedConfig, SourceDescriptor, SourceKind};
use crate::dates::DateNormalizer;
use crate::models::{NormalizedPost, RawPost};
use crate::sources::{SourceFetcher, Transport};
use futures::future::join_all;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Something that can produce the channel's posts, or nothing.
pub trait PostSource {
    /// `None` signals total failure; the list is never empty when `Some`.
    async fn load_posts(&self) -> Option<Vec<NormalizedPost>>;
}

#[derive(Debug)]
pub struct FeedAggregator<T> {
    config: FeedConfig,
    fetcher: SourceFetcher<T>,
}

impl<T: Transport> FeedAggregator<T> {
    pub fn new(config: FeedConfig, transport: T) -> Self {
        Self::with_dates(config, transport, DateNormalizer::default())
    }

    pub fn with_dates(config: FeedConfig, transport: T, dates: DateNormalizer) -> Self {
        let fetcher = SourceFetcher::new(transport, config.clone(), dates);
        Self { config, fetcher }
    }

    /// Probe all descriptors concurrently and return the first non-empty
    /// result in descriptor order.
    ///
    /// Slower probes are not cancelled once a winner exists; every probe
    /// runs until it finishes or its own timeout fires.
    #[instrument(level = "info", skip_all, fields(sources = descriptors.len()))]
    pub async fn aggregate_strategy(&self, descriptors: &[SourceDescriptor]) -> Option<Vec<RawPost>> {
        let results = join_all(descriptors.iter().map(|d| self.fetcher.fetch(d))).await;

        let winner = descriptors
            .iter()
            .zip(results)
            .enumerate()
            .find_map(|(index, (descriptor, result))| match result {
                Some(posts) if !posts.is_empty() => Some((index, descriptor, posts)),
                _ => None,
            });

        match winner {
            Some((index, descriptor, posts)) => {
                info!(index, url = %descriptor.url, count = posts.len(), "Strategy produced posts");
                Some(posts)
            }
            None => {
                warn!("No source in strategy produced posts");
                None
            }
        }
    }

    /// Run both strategies concurrently, prefer RSS, and normalize the winner.
    #[instrument(level = "info", skip_all, fields(channel = %self.config.channel))]
    pub async fn load_posts(&self) -> Option<Vec<NormalizedPost>> {
        let t0 = Instant::now();
        let rss_descriptors = self.config.descriptors(SourceKind::Rss);
        let proxy_descriptors = self.config.descriptors(SourceKind::HtmlProxy);

        let (rss, proxy) = tokio::join!(
            self.aggregate_strategy(&rss_descriptors),
            self.aggregate_strategy(&proxy_descriptors)
        );

        let (strategy, raw) = match (rss, proxy) {
            (Some(posts), _) if !posts.is_empty() => ("rss", posts),
            (_, Some(posts)) if !posts.is_empty() => ("html-proxy", posts),
            _ => {
                warn!(elapsed_ms = t0.elapsed().as_millis() as u64, "All strategies failed");
                return None;
            }
        };

        let posts: Vec<NormalizedPost> = raw
            .into_iter()
            .map(|post| NormalizedPost::from_raw(post, self.fetcher.dates(), self.fetcher.sanitizer()))
            .collect();
        info!(
            strategy,
            count = posts.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Loaded posts"
        );
        Some(posts)
    }
}

impl<T: Transport> PostSource for FeedAggregator<T> {
    async fn load_posts(&self) -> Option<Vec<NormalizedPost>> {
        FeedAggregator::load_posts(self).await
    }
}
