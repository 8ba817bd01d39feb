//! fx-server demo application.
//!
//! ```text
//!     /api/...   JSON pet catalog  (ApiModule<Json>)
//!     /xml/...   XML pet catalog   (ApiModule<Xml>, same data)
//!     /...       web pages         (WebModule: login, logout, flash messages)
//! ```
//!
//! Every module sits behind the server's panic recovery and request
//! deadline. Any registration failure exits non-zero before the listener
//! is bound.

mod demo;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use fx_server::config::{load_config, ServerConfig};
use fx_server::module::{Json, Xml};
use fx_server::observability::{init_logging, metrics::init_metrics, TracingLogger};
use fx_server::session::{ExtendableStore, MemoryStore};
use fx_server::{Server, ServerOption};

#[derive(Parser)]
#[command(name = "fx-server")]
#[command(about = "Module-hosting HTTP server demo", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("fx-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut options = ServerOption::from_config(&config);
    options.push(ServerOption::Logger(TracingLogger::shared("fx-server")));
    let mut server = Server::new(options)?;

    let catalog = demo::pets::Catalog::seeded();
    let mut json_api = demo::pets::module::<Json>(catalog.clone());
    server.register_module("/api", &mut json_api)?;
    let mut xml_api = demo::pets::module::<Xml>(catalog);
    server.register_module("/xml", &mut xml_api)?;

    let directory = demo::accounts::Directory::seeded();
    let mut web = demo::accounts::module(
        ExtendableStore::new(MemoryStore::default()),
        &config,
        directory.clone(),
    );
    web.initialize_user_session(move |id| {
        let directory = directory.clone();
        async move { directory.find(id) }
    })?;
    server.register_module("/", &mut web)?;

    server.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
