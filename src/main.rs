//! Rooster Arena Server
//!
//! Boots a single arena and serves it over WebSocket until Ctrl-C.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rooster_arena::{
    VERSION,
    core::rng::derive_arena_seed,
    game::config::ArenaConfig,
    network::{GameServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server_config = ServerConfig::from_env()?;
    let arena_config = ArenaConfig::from_env()?;

    let seed = match arena_config.seed {
        Some(seed) => seed,
        None => {
            let boot_nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            derive_arena_seed(uuid::Uuid::new_v4().as_bytes(), boot_nanos)
        }
    };

    info!("Rooster Arena Server v{}", VERSION);
    info!(
        "Arena {}x{}, up to {} players, {} Hz, seed {}",
        arena_config.width, arena_config.height, arena_config.max_players, server_config.tick_rate, seed
    );

    let server = Arc::new(GameServer::new(server_config, arena_config, seed));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
