//! Presence hub for the shared Hiroba canvas.
//!
//! Tracks connected visitors, relays their moves and chat bubbles, and
//! remembers returning visitors by their identity token.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --allowed-origin https://cabbage.town
//! ```

use clap::Parser;
use hiroba_server::{
    config::{DEFAULT_IDENTITY_CAPACITY, HubConfig, OriginPolicy},
    ui::Server,
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "WebSocket presence hub: avatars, moves and chat bubbles", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIROBA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIROBA_PORT", default_value = "8080")]
    port: u16,

    /// Origin allowed to open the WebSocket (repeatable; none = allow all)
    #[arg(
        long = "allowed-origin",
        env = "HIROBA_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    allowed_origins: Vec<String>,

    /// Identities remembered before least-recently-used eviction (0 = unbounded)
    #[arg(long, env = "HIROBA_IDENTITY_CAPACITY", default_value_t = DEFAULT_IDENTITY_CAPACITY)]
    identity_capacity: usize,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "HIROBA_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let hub_config = HubConfig {
        identity_capacity: args.identity_capacity,
        ..HubConfig::default()
    };
    if args.allowed_origins.is_empty() {
        tracing::warn!("No --allowed-origin given, accepting WebSocket upgrades from any origin");
    }
    let server = Server::assemble(&hub_config, OriginPolicy::new(args.allowed_origins));

    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
