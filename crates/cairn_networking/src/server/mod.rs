//! # Cairn Server
//!
//! The authoritative server for the Cairn world.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CAIRN SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Read tasks   │  │ Tick thread  │  │ Writer tasks │      │
//! │  │ (tokio, one  │  │ (TickLoop)   │  │ (tokio, one  │      │
//! │  │  per client) │  │              │  │  per client) │      │
//! │  └──────┬───────┘  └──────┬───────┘  └──────▲───────┘      │
//! │         │   lock          │   lock          │ ConnectionHub │
//! │         └────────────────┼─────────────────┘               │
//! │              ┌───────────▼───────────┐                     │
//! │              │ Mutex<ServerWorld>    │                     │
//! │              │ - EntityStore         │                     │
//! │              │ - Simulation          │                     │
//! │              │ - Sessions, liveness  │                     │
//! │              └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation takes the world lock once and queues the messages it
//! produced before releasing it, so all peers see changes in the order the
//! world applied them. Lock order is always world, then hub.

mod connection;
mod state;
mod tick;

pub use connection::{ConnectionHub, ConnectionId, Outbound, Recipient};
pub use state::ServerWorld;
pub use tick::{TickLoop, TickStats};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cairn_gameplay::Simulation;
use cairn_shared::ClientMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

/// Shared handle to the server world and its connections.
///
/// Cheap to clone: every clone drives the same world.
#[derive(Clone)]
pub struct GameServer {
    world: Arc<Mutex<ServerWorld>>,
    hub: Arc<ConnectionHub>,
    running: Arc<AtomicBool>,
    tick: Arc<AtomicU64>,
    tick_rate: u32,
}

impl GameServer {
    /// Creates a server around a fresh world.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        let tick_rate = sim.config().world.tick_rate;
        Self {
            world: Arc::new(Mutex::new(ServerWorld::new(sim))),
            hub: Arc::new(ConnectionHub::new()),
            running: Arc::new(AtomicBool::new(false)),
            tick: Arc::new(AtomicU64::new(0)),
            tick_rate,
        }
    }

    /// Returns the current tick number.
    #[inline]
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.hub.len()
    }

    /// Returns whether the tick loop is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Runs `f` with the world locked.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut ServerWorld) -> R) -> R {
        f(&mut self.world.lock())
    }

    /// Opens a session. Returns its id and the queue of encoded lines for it.
    pub fn connect(&self) -> (ConnectionId, UnboundedReceiver<String>) {
        let (conn, lines) = self.hub.register();
        self.world.lock().connect(conn);
        (conn, lines)
    }

    /// Applies one client message and queues the replies.
    pub fn receive(&self, conn: ConnectionId, message: ClientMessage) -> usize {
        let mut world = self.world.lock();
        let out = world.handle(conn, message);
        self.hub.dispatch(out)
    }

    /// Closes a session and announces the departure.
    pub fn disconnect(&self, conn: ConnectionId) -> usize {
        let mut world = self.world.lock();
        let out = world.disconnect(conn);
        self.hub.unregister(conn);
        self.hub.dispatch(out)
    }

    /// Processes a single tick.
    pub fn tick(&self, dt: f32) -> usize {
        let mut world = self.world.lock();
        let out = world.tick(dt);
        self.tick.fetch_add(1, Ordering::Relaxed);
        self.hub.dispatch(out)
    }

    /// Ticks at the configured rate until [`shutdown`](Self::shutdown).
    pub fn run_ticks(&self) {
        let mut tick_loop = TickLoop::new(self.tick_rate);
        let dt = tick_loop.dt();
        self.running.store(true, Ordering::Relaxed);
        tracing::info!(tick_rate = self.tick_rate, "Tick loop started");

        while self.is_running() {
            while tick_loop.should_tick() {
                let start = tick_loop.begin_tick();
                self.tick(dt);
                tick_loop.end_tick(start);
            }
            tick_loop.wait_for_next_tick();
        }

        let stats = tick_loop.stats();
        tracing::info!(
            ticks = stats.total_ticks,
            late = stats.late_ticks,
            avg_us = stats.avg_tick_us,
            "Tick loop stopped"
        );
    }

    /// Runs [`run_ticks`](Self::run_ticks) on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn_tick_thread(&self) -> std::io::Result<JoinHandle<()>> {
        let server = self.clone();
        self.running.store(true, Ordering::Relaxed);
        std::thread::Builder::new()
            .name("cairn-tick".into())
            .spawn(move || server.run_ticks())
    }

    /// Stops the tick loop.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
