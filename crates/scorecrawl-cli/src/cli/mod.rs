//! CLI for the scorecrawl feed downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scorecrawl_core::config;

use commands::{run_crawl, run_status};

/// Top-level CLI for the scorecrawl feed downloader.
#[derive(Debug, Parser)]
#[command(name = "scorecrawl")]
#[command(about = "scorecrawl: concurrent subreddit score downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Crawl the feed and download every discovered score link.
    Run {
        /// Subreddit to crawl (overrides the configured one).
        #[arg(long)]
        subreddit: Option<String>,

        /// Stop after scheduling N posts.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Run up to N downloads concurrently (overrides the configured cap).
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Archive each downloaded directory and discard the raw copy.
        #[arg(long)]
        zip: bool,

        /// Re-download links even when their target already exists.
        #[arg(long)]
        overwrite: bool,
    },

    /// Summarize the resume ledger.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                subreddit,
                limit,
                concurrency,
                zip,
                overwrite,
            } => run_crawl(&cfg, subreddit, limit, concurrency, zip, overwrite).await?,
            CliCommand::Status => run_status(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "scorecrawl",
            "run",
            "--subreddit",
            "sheetmusic",
            "--limit",
            "10",
            "--concurrency",
            "4",
            "--zip",
        ]);
        match cli.command {
            CliCommand::Run {
                subreddit,
                limit,
                concurrency,
                zip,
                overwrite,
            } => {
                assert_eq!(subreddit.as_deref(), Some("sheetmusic"));
                assert_eq!(limit, Some(10));
                assert_eq!(concurrency, Some(4));
                assert!(zip);
                assert!(!overwrite);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn status_parses() {
        let cli = Cli::parse_from(["scorecrawl", "status"]);
        assert!(matches!(cli.command, CliCommand::Status));
    }
}
