//! # Cairn Server
//!
//! The authoritative server for the Cairn world.
//!
//! ## Usage
//!
//! ```bash
//! cairn_server [--config cairn.toml] [--bind 0.0.0.0:8080]
//! ```
//!
//! Logging honours `RUST_LOG` (default `info`).

use std::sync::Arc;

use cairn_core::{GameConfig, HeightGrid};
use cairn_gameplay::Simulation;
use cairn_networking::{serve, GameServer, NetResult};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Height samples per terrain edge.
const TERRAIN_RESOLUTION: usize = 129;
/// Hill height above the shoreline.
const TERRAIN_AMPLITUDE: f32 = 6.0;

fn main() -> NetResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut bind: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config_path = args.get(i + 1).cloned();
                i += 1;
            }
            "--bind" | "-b" => {
                bind = args.get(i + 1).cloned();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: cairn_server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   TOML configuration (default: built-in)");
                println!("  -b, --bind <ADDR>     Listen address (default: from config)");
                println!("  -h, --help            Show this help");
                return Ok(());
            }
            other => tracing::warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let bind = bind.unwrap_or_else(|| config.server.bind_addr.clone());

    let terrain = HeightGrid::rolling_hills(
        TERRAIN_RESOLUTION,
        config.world.size,
        TERRAIN_AMPLITUDE,
        config.world.sea_level,
    );
    tracing::info!(
        size = config.world.size,
        tick_rate = config.world.tick_rate,
        clouds = config.cloud.count,
        max_stones = config.server.max_stones,
        "World configured"
    );

    let server = GameServer::new(Simulation::new(config, Arc::new(terrain)));
    let tick_thread = server.spawn_tick_thread()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("cairn-net")
        .build()?;

    let result: NetResult<()> = runtime.block_on(async {
        let listener = TcpListener::bind(&bind).await?;
        tokio::select! {
            result = serve(listener, server.clone()) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                Ok(())
            }
        }
    });

    server.shutdown();
    if tick_thread.join().is_err() {
        tracing::error!("Tick thread panicked");
    }
    result
}
