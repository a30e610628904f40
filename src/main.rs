//! Chat Tetris server (default binary).
//!
//! Runs the JSON-over-TCP adapter that chat bots connect to. Configured
//! through `TETRIS_*` environment variables; log level through `RUST_LOG`.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_tetris::adapter::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!(
        "Chat Tetris v{} ({}x{} board, {:?} two-player countdown)",
        env!("CARGO_PKG_VERSION"),
        config.board.height,
        config.board.width,
        config.start_delay
    );

    tokio::select! {
        result = run_server(config, None) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}
