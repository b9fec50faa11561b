//! `agent`: command-line dispatcher over the tool layer.
//!
//! Each subcommand maps onto exactly one tool: `browse` and `search` hit the
//! web, `run` executes a subprocess, `read`/`write`/`edit` touch files in the
//! workspace.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use agent_relay::config::Config;
use agent_relay::tools::ToolRegistry;

#[derive(Debug, Parser)]
#[command(name = "agent")]
#[command(about = "Agent with web, CLI, and code editing capabilities", version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Browse a webpage
    Browse {
        /// URL to browse
        url: String,

        /// CSS selector to extract content
        #[arg(long)]
        selector: Option<String>,
    },

    /// Search the web
    Search {
        /// Search query
        query: String,

        /// Number of results to return
        #[arg(long, default_value_t = 5)]
        results: usize,
    },

    /// Run a CLI command
    Run {
        /// Command to run
        cmd: String,

        /// Command timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Run command through the shell
        #[arg(long)]
        shell: bool,
    },

    /// Read a file
    Read {
        /// File to read
        file: String,
    },

    /// Write to a file
    Write {
        /// File to write
        file: String,

        /// Content to write
        content: String,

        /// Don't create a backup of an existing file
        #[arg(long)]
        no_backup: bool,
    },

    /// Apply line edits to a file
    Edit {
        /// File to edit
        file: String,

        /// JSON file with the edit list (reads stdin when omitted)
        #[arg(long)]
        edits: Option<PathBuf>,
    },

    /// List available tools
    Tools {
        /// Print full JSON schemas instead of summaries
        #[arg(long)]
        schemas: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "agent_relay=debug" } else { "agent_relay=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = Config::from_env()?;
    let workspace = config.workspace_path.clone();
    let registry = ToolRegistry::new();

    let (tool, args) = match cli.command {
        Commands::Browse { url, selector } => (
            "browse_page",
            json!({ "url": url, "selector": selector }),
        ),
        Commands::Search { query, results } => (
            "web_search",
            json!({ "query": query, "num_results": results }),
        ),
        Commands::Run { cmd, timeout, shell } => (
            "run_command",
            json!({ "command": cmd, "timeout_secs": timeout, "shell": shell }),
        ),
        Commands::Read { file } => ("read_file", json!({ "path": file })),
        Commands::Write {
            file,
            content,
            no_backup,
        } => (
            "write_file",
            json!({ "path": file, "content": content, "backup": !no_backup }),
        ),
        Commands::Edit { file, edits } => {
            let raw = match edits {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let edits: serde_json::Value = serde_json::from_str(&raw)?;
            ("edit_file", json!({ "path": file, "edits": edits }))
        }
        Commands::Tools { schemas } => {
            if schemas {
                println!("{}", serde_json::to_string_pretty(&registry.get_tool_schemas())?);
            } else {
                for spec in registry.list_tools() {
                    println!("{:<14} {}", spec.name, spec.description);
                }
            }
            return Ok(());
        }
    };

    let output = registry.execute(tool, args, &workspace).await?;
    println!("{}", output);
    Ok(())
}
