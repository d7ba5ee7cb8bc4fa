//! # Channel Feed
//!
//! Fetches the public post feed of a Telegram channel and renders it as an
//! HTML fragment or a JSON document. When no source delivers posts, a static
//! panel linking to the channel is rendered instead.
//!
//! ## Features
//!
//! - Probes several RSS mirrors and HTML proxies of the channel concurrently,
//!   each with its own timeout
//! - Picks the first usable result by fixed priority (RSS before proxies,
//!   configured order within each)
//! - Normalizes dates from RFC 2822, RFC 3339 and bare-date formats
//! - Sanitizes post markup down to a small allow-list
//!
//! ## Usage
//!
//! ```sh
//! channel_feed --channel mgkeit -o ./public/feed.html
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: every configured source is probed once ([`sources`])
//! 2. **Selection**: the first non-empty result by priority wins ([`aggregator`])
//! 3. **Ranking**: posts are sorted newest first ([`ranker`])
//! 4. **Output**: the presenter drives an HTML or JSON sink ([`presenter`], [`outputs`])

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod dates;
mod models;
mod outputs;
mod presenter;
mod ranker;
mod sanitize;
mod sources;
mod utils;

use aggregator::FeedAggregator;
use cli::{Cli, Format};
use config::FeedConfig;
use outputs::{html::HtmlPage, json::JsonFeed};
use presenter::{Presenter, PresenterState};
use sources::ReqwestTransport;
use utils::ensure_parent_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("channel_feed starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = FeedConfig::load(args.config.as_deref(), args.channel.as_deref()).await?;
    let channel_url = config.channel_url();
    let aggregator = FeedAggregator::new(config.clone(), ReqwestTransport::new(&config.user_agent));

    let (state, rendered) = match args.format {
        Format::Html => {
            let mut presenter = Presenter::new(HtmlPage::new(&config), channel_url);
            let state = presenter.present(&aggregator).await;
            (state, presenter.into_sink().into_html())
        }
        Format::Json => {
            let mut presenter = Presenter::new(JsonFeed::new(), channel_url);
            let state = presenter.present(&aggregator).await;
            (state, presenter.into_sink().into_json())
        }
    };

    match &args.output {
        Some(path) => {
            ensure_parent_dir(path).await?;
            tokio::fs::write(path, rendered).await?;
            info!(path = %path.display(), "Wrote feed");
        }
        None => print!("{rendered}"),
    }

    let elapsed = start_time.elapsed();
    let posts = match state {
        PresenterState::Success { posts } => posts,
        _ => 0,
    };
    info!(
        ?elapsed,
        millis = elapsed.as_millis() as u64,
        posts,
        fallback = matches!(state, PresenterState::Failure),
        "Execution complete"
    );

    Ok(())
}
