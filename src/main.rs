use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lexrag::answer::FileContext;
use lexrag::chat::ChatRequest;
use lexrag::config::{Config, DEFAULT_CONFIG_PATH};
use lexrag::db::Db;
use lexrag::mcp::{McpContext, McpServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lexrag")]
#[command(about = "Local lexical RAG: answers Arabic/English questions from indexed documents")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP tools over stdio (default)
    Serve,
    /// Answer one question and print the response as JSON
    Ask {
        question: String,
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
        /// Attach a file as extra context
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Index documents (configured patterns if --dir is omitted)
    Index {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Re-index unchanged files too
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the MCP transport, so logs go to stderr
    let filter = if cli.verbose { "lexrag=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // 1. Load config
    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    // 2. Init DB
    let db = Db::open(&config.db_path).context("Failed to open database")?;

    // 3. Init shared context
    let ctx = McpContext::new(db, config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting lexrag MCP Server...");
            McpServer::new(ctx).start().await?;
        }
        Command::Ask {
            question,
            thread,
            file,
        } => {
            let mut request = ChatRequest::new(question);
            if let Some(thread) = thread {
                request = request.with_thread(thread);
            }
            if let Some(path) = file {
                let file = FileContext::from_path(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                request = request.with_file(file);
            }

            let response = ctx.chat().ask(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Index { dir, force } => {
            let dirs = match dir {
                Some(dir) => vec![dir],
                None => ctx.config.get_base_directories(),
            };
            let indexer = ctx.indexer();
            for dir in dirs {
                let result = indexer
                    .index_directory(&dir, force)
                    .await
                    .with_context(|| format!("failed to index {}", dir.display()))?;
                println!("{}: {}", dir.display(), serde_json::to_string(&result)?);
            }
        }
    }

    Ok(())
}
