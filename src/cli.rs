//! Command-line interface definitions for Channel Feed.
//!
//! All arguments can be provided via command-line flags; the channel can also
//! come from the environment.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Rendered output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Html,
    Json,
}

/// Command-line arguments for the Channel Feed application.
///
/// # Examples
///
/// ```sh
/// # Render the default channel as HTML to stdout
/// channel_feed
///
/// # Another channel, as JSON, into a file
/// channel_feed --channel durov --format json -o ./out/feed.json
///
/// # Custom mirrors and proxies
/// channel_feed --config feed.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Public channel username (overrides the config file)
    #[arg(short, long, env = "CHANNEL_FEED_CHANNEL")]
    pub channel: Option<String>,

    /// Optional path to a YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    pub format: Format,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["channel_feed"]);
        assert_eq!(cli.format, Format::Html);
        assert!(cli.config.is_none());
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::parse_from([
            "channel_feed",
            "--channel",
            "mgkeit",
            "--config",
            "./feed.yaml",
            "--format",
            "json",
            "--output",
            "./out/feed.json",
        ]);

        assert_eq!(cli.channel.as_deref(), Some("mgkeit"));
        assert_eq!(cli.config, Some(PathBuf::from("./feed.yaml")));
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.output, Some(PathBuf::from("./out/feed.json")));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["channel_feed", "-c", "news", "-f", "html", "-o", "/tmp/feed.html"]);

        assert_eq!(cli.channel.as_deref(), Some("news"));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/feed.html")));
    }
}
