//! `crawl`: fetch a documentation site (or a GitHub subtree) as markdown.
//!
//! `crawl site <url>` runs a bounded breadth-first crawl and writes the
//! combined pruned markdown to `<docs-dir>/<domain>.md`. `crawl github <url>`
//! mirrors the `*.md` files of a repository subtree via wget.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use agent_relay::config::Config;
use agent_relay::crawler::{self, github, CrawlConfig, Crawler};

#[derive(Debug, Parser)]
#[command(name = "crawl")]
#[command(about = "Download documentation as markdown", version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deep-crawl a site and combine the pages into one markdown file
    Site {
        /// Root URL to crawl
        url: String,

        /// How many link levels to follow
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = 50)]
        max_pages: usize,

        /// Follow links to other hosts
        #[arg(long)]
        include_external: bool,

        /// Output directory (defaults to the configured docs dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Mirror the markdown files of a GitHub blob/tree URL
    Github {
        /// GitHub URL, e.g. https://github.com/user/repo/tree/main/docs
        url: String,

        /// Output directory (defaults to the configured docs dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "agent_relay=debug" } else { "agent_relay=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Site {
            url,
            depth,
            max_pages,
            include_external,
            output_dir,
        } => {
            let docs_dir = output_dir.unwrap_or_else(|| config.docs_dir.clone());
            let crawl_config = CrawlConfig {
                max_depth: depth,
                max_pages,
                include_external,
                user_agent: config.user_agent.clone(),
                timeout_secs: config.http_timeout_secs,
                ..CrawlConfig::default()
            };

            let root = Url::parse(&url)?;
            let site_crawler = Crawler::new(crawl_config)?;
            let pages = site_crawler.crawl(&url).await?;

            let ok = pages.iter().filter(|p| p.result.is_ok()).count();
            let failed = pages.len() - ok;
            println!("Crawled {} pages in total ({} failed)", pages.len(), failed);

            let path =
                crawler::write_combined(&pages, &docs_dir, &crawler::domain_slug(&root))?;
            println!("Wrote combined markdown to {}", path.display());
        }

        Commands::Github { url, output_dir } => {
            let docs_dir = output_dir.unwrap_or_else(|| config.docs_dir.clone());
            let target = github::parse_github_url(&url, &docs_dir)?;
            github::mirror_markdown(&target).await?;
            println!("Markdown files downloaded to: {}", target.output_dir.display());
        }
    }

    Ok(())
}
