use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sea_turtle_server::config::ServerConfig;
use sea_turtle_server::lobby::manager::LobbyManager;
use sea_turtle_server::metrics::{self, Metrics};
use sea_turtle_server::net::client_registry::ClientRegistry;
use sea_turtle_server::net::transport::WebTransportServer;

/// Upper bound on graceful cleanup before the process exits anyway
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// How often finished rooms are swept out of the lobby
const REAP_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Sea Turtle Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}:{}, max_rooms={}, difficulty={:?}, predators={}",
        config.bind_address,
        config.port,
        config.max_rooms,
        config.difficulty,
        config.predators_enabled
    );

    let metrics = Arc::new(Metrics::new());
    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let lobby_manager = Arc::new(RwLock::new(LobbyManager::new(
        ClientRegistry::new(),
        config.game_loop_config(),
        config.max_rooms,
        metrics.clone(),
    )));

    let reaper_lobby = lobby_manager.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(REAP_INTERVAL);
        loop {
            sweep.tick().await;
            let reaped = reaper_lobby.write().await.reap_finished_rooms();
            if reaped > 0 {
                info!("Reaped {} finished room(s)", reaped);
            }
        }
    });

    let server = WebTransportServer::new(config.clone(), lobby_manager.clone(), metrics.clone()).await?;

    info!("Server ready on https://{}", server.bind_addr());
    info!(
        "Chrome flag: --ignore-certificate-errors-spki-list={}",
        server.cert_hash()
    );

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutting down...");
        }
    }

    let cleanup = async {
        lobby_manager.write().await.shutdown_all_rooms().await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, cleanup).await.is_err() {
        warn!("Cleanup did not finish within {:?}, forcing exit", SHUTDOWN_GRACE);
        std::process::exit(1);
    }

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
