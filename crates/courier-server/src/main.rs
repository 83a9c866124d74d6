//! Courier server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port (or $PORT) with a self-signed certificate
//! courier-server
//!
//! # Start with a TLS certificate (production)
//! courier-server --bind 0.0.0.0:4433 --cert cert.pem --key key.pem
//! ```

use clap::Parser;
use courier_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Courier chat relay server
#[derive(Parser, Debug)]
#[command(name = "courier-server")]
#[command(about = "Courier chat relay server")]
#[command(version)]
struct Args {
    /// Address to bind to; overrides --port when set
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on (all interfaces)
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let bind_address = args.bind.unwrap_or_else(|| format!("0.0.0.0:{}", args.port));

    tracing::info!("Courier server starting");
    tracing::info!("Binding to {}", bind_address);

    if args.cert.is_none() || args.key.is_none() {
        tracing::warn!("No TLS certificate provided - using self-signed certificate");
        tracing::warn!("This is NOT suitable for production use!");
    }

    let config = ServerRuntimeConfig {
        bind_address,
        cert_path: args.cert,
        key_path: args.key,
        driver: DriverConfig { max_connections: args.max_connections },
    };

    let server = Server::bind(config)?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
