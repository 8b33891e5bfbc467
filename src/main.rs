//! # RAG Relay CLI (`ragr`)
//!
//! The `ragr` binary runs the relay server and provides one-shot worker
//! invocations from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! ragr --config ./config/ragr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragr serve` | Start the relay HTTP server |
//! | `ragr ask "<query>" --key <key>` | Run one worker invocation and print the answer |
//! | `ragr status` | Show worker command health |
//!
//! ## Examples
//!
//! ```bash
//! # Start the HTTP server
//! ragr serve --config ./config/ragr.toml
//!
//! # Ask a question directly from the terminal
//! ragr ask "What is the capital of France?" --key "$FERNET_KEY"
//!
//! # Print the full result payload as JSON
//! ragr ask "deployment steps" --key "$FERNET_KEY" --json
//!
//! # Verify the worker command resolves
//! ragr status
//! ```

mod ask;
mod config;
mod demux;
mod reply;
mod server;
mod status;
mod worker;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RAG Relay CLI — run an external RAG worker per query and demultiplex
/// its output.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragr.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragr",
    about = "RAG Relay — forwards key/query requests to an external RAG worker process",
    version,
    long_about = "RAG Relay launches an external retrieval-augmented-generation worker process \
    per request, captures its output streams, separates diagnostic log lines from the structured \
    result line, and serves the combined answer over a JSON HTTP API or the terminal."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragr.toml`. The worker command line and server
    /// bind address are read from this file.
    #[arg(long, global = true, default_value = "./config/ragr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /chat` and `GET /health` until terminated.
    Serve,

    /// Run one worker invocation and print the result.
    ///
    /// Spawns the configured worker with the key and query as positional
    /// arguments, waits for it to terminate, and prints the answer to
    /// stdout. Worker log lines are printed to stderr.
    Ask {
        /// The natural-language query to send to the worker.
        query: String,

        /// Secret key passed to the worker as its first positional argument.
        #[arg(long)]
        key: String,

        /// Print the full result payload as pretty JSON instead of just the
        /// `answer` field.
        #[arg(long)]
        json: bool,
    },

    /// Show worker configuration health.
    ///
    /// Reports whether the configured worker command resolves to an existing
    /// file, directly or via `PATH`.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query, key, json } => {
            ask::run_ask(&cfg, &key, &query, json).await?;
        }
        Commands::Status => {
            status::run_status(&cfg)?;
        }
    }

    Ok(())
}
