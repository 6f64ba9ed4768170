//! Runs a Flipside authority server.
//!
//! ```text
//! flipside-server [CONFIG] [--bind ADDR]
//! ```
//!
//! Tokens and games come from the config file; without one the server
//! starts empty. `RUST_LOG` sets the log filter (default `info`).
//! `--bind` (or `FLIPSIDE_BIND`) overrides the bind address.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use flipside::{FileConfig, FlipsideError, FlipsideServerBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file with server settings, tokens and games
    config: Option<PathBuf>,
    /// Address to listen on, overriding the config file
    #[arg(long, env = "FLIPSIDE_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), FlipsideError> {
    let config = load_config(args)?;
    tracing::info!(
        bind = %config.server.bind,
        tokens = config.tokens.len(),
        games = config.games.len(),
        "loaded config"
    );

    let server = FlipsideServerBuilder::new()
        .config(config.server.clone())
        .build(config.token_table(), Arc::new(config.registry()))
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}

fn load_config(args: Args) -> Result<FileConfig, FlipsideError> {
    let mut config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    config.override_bind(args.bind);
    Ok(config)
}
