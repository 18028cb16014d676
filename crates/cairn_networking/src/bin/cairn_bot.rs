//! # Cairn Bot
//!
//! A headless client: connects, wanders, picks up stones and throws them.
//! Useful for load and soak testing a server.
//!
//! ## Usage
//!
//! ```bash
//! cairn_bot [--addr 127.0.0.1:8080] [--name bot] [--seconds 60] [--seed 1]
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use cairn_core::{EntityKind, EntityObserver, GameConfig, HeightGrid};
use cairn_gameplay::{PlayerInput, Simulation};
use cairn_networking::{
    spawn_client, ClientConfig, ClientInput, ClientState, GameClient, NetResult, ReconnectPolicy,
    TickLoop,
};
use cairn_shared::{Vec3, DEFAULT_SERVER_ADDR};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

/// Logs what the bot sees of the world's towers.
#[derive(Default)]
struct TowerLog {
    created: u64,
    removed: u64,
}

impl EntityObserver for TowerLog {
    fn on_entity_created(&mut self, kind: EntityKind, id: &str) {
        if kind == EntityKind::Tower {
            self.created += 1;
            tracing::info!(tower = id, "Tower appeared");
        }
    }

    fn on_entity_removed(&mut self, kind: EntityKind, id: &str) {
        if kind == EntityKind::Tower {
            self.removed += 1;
            tracing::info!(tower = id, "Tower destroyed");
        }
    }
}

/// Sticky random input: each choice holds for a while before re-rolling.
struct Wanderer {
    rng: ChaCha8Rng,
    motion: PlayerInput,
    hold_ticks: u32,
}

impl Wanderer {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            motion: PlayerInput::default(),
            hold_ticks: 0,
        }
    }

    fn next(&mut self, holding: bool) -> ClientInput {
        if self.hold_ticks == 0 {
            self.motion = PlayerInput {
                forward: self.rng.gen_bool(0.7),
                backward: false,
                turn_left: self.rng.gen_bool(0.25),
                turn_right: self.rng.gen_bool(0.25),
                sprint: self.rng.gen_bool(0.2),
                jump: self.rng.gen_bool(0.05),
            };
            self.hold_ticks = self.rng.gen_range(20..120);
        }
        self.hold_ticks -= 1;
        ClientInput {
            motion: self.motion,
            pick_up: !holding && self.rng.gen_bool(0.05),
            throw: holding && self.rng.gen_bool(0.01),
        }
    }
}

fn main() -> NetResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut addr = DEFAULT_SERVER_ADDR.to_owned();
    let mut name = String::from("bot");
    let mut seconds: Option<u64> = None;
    let mut seed = 1u64;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--addr" | "-a" => {
                if let Some(value) = value {
                    addr = value.clone();
                }
                i += 1;
            }
            "--name" | "-n" => {
                if let Some(value) = value {
                    name = value.clone();
                }
                i += 1;
            }
            "--seconds" | "-s" => {
                seconds = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--seed" => {
                seed = value.and_then(|v| v.parse().ok()).unwrap_or(seed);
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: cairn_bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -a, --addr <ADDR>      Server address (default: {DEFAULT_SERVER_ADDR})");
                println!("  -n, --name <NAME>      Username (default: bot)");
                println!("  -s, --seconds <SECS>   Run for N seconds then leave");
                println!("      --seed <SEED>      Input seed (default: 1)");
                println!("  -h, --help             Show this help");
                return Ok(());
            }
            other => tracing::warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = GameConfig::default();
    let terrain = HeightGrid::rolling_hills(129, config.world.size, 6.0, config.world.sea_level);
    let policy = ReconnectPolicy::from_config(&config.network);
    let tick_rate = config.world.tick_rate;
    let sim = Simulation::new(config, Arc::new(terrain));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let outbound = spawn_client(runtime.handle(), addr.clone(), policy, events_tx);

    let mut client = GameClient::new(
        ClientConfig {
            player_id: format!("{name}-{seed}"),
            username: name.clone(),
            spawn: Vec3::new(0.0, 2.0, 0.0),
        },
        sim,
        events_rx,
        outbound,
    );
    tracing::info!(%addr, %name, "Bot starting");

    let mut wanderer = Wanderer::new(seed);
    let mut towers = TowerLog::default();
    let mut tick_loop = TickLoop::new(tick_rate);
    let dt = tick_loop.dt();
    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));

    while deadline.map_or(true, |d| Instant::now() < d) {
        while tick_loop.should_tick() {
            let start = tick_loop.begin_tick();
            let holding = client.local_player().is_some_and(|p| !p.held_stones.is_empty());
            let input = wanderer.next(holding);
            for event in client.tick(&input, dt) {
                towers.observe(&event);
            }
            tick_loop.end_tick(start);
        }
        if client.state() == ClientState::Offline {
            tracing::warn!("Server unreachable, stopping");
            break;
        }
        tick_loop.wait_for_next_tick();
    }

    client.leave();
    // let the transport flush the leave
    std::thread::sleep(Duration::from_millis(100));
    tracing::info!(
        player = client.local_id(),
        towers_seen = towers.created,
        towers_lost = towers.removed,
        dropped_sends = client.dropped_sends(),
        "Bot finished"
    );
    Ok(())
}
