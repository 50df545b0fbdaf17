//! Terminal client for the shared Hiroba canvas.
//!
//! Keeps a reconnecting link to the presence hub, renders everyone on a
//! character grid, and sends chat lines typed at the prompt. The identity
//! token is stored in a file so a restarted client keeps its name and spot.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client
//! cargo run --bin hiroba-client -- --url ws://127.0.0.1:3000/ws --cols 100 --rows 30
//! ```

use std::path::PathBuf;

use clap::Parser;
use hiroba_client::{ClientOptions, run_client};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Presence client: walk around and chat on a shared canvas", long_about = None)]
struct Args {
    /// WebSocket endpoint of the presence hub
    #[arg(short = 'u', long, env = "HIROBA_URL", default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// File holding the identity token (created if missing)
    #[arg(long, env = "HIROBA_TOKEN_FILE", default_value = ".hiroba-token")]
    token_file: PathBuf,

    /// Width of the character grid
    #[arg(long, default_value_t = 80)]
    cols: usize,

    /// Height of the character grid
    #[arg(long, default_value_t = 24)]
    rows: usize,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "HIROBA_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let options = ClientOptions {
        url: args.url,
        token_file: args.token_file,
        cols: args.cols,
        rows: args.rows,
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
