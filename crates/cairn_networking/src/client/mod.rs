//! # Game Client
//!
//! Client-side tick orchestration with prediction and interpolation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      GAME CLIENT                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Prediction   │  │ Interpolation│  │ Network I/O  │      │
//! │  │ (Local)      │  │ (Remote)     │  │ (tokio task) │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │         │                 │                 │ crossbeam     │
//! │         └────────────────┼─────────────────┘               │
//! │                          │                                  │
//! │              ┌───────────▼───────────┐                     │
//! │              │  EntityStore          │                     │
//! │              │  (Rendered State)     │                     │
//! │              └───────────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport never touches the store. It pushes [`TransportEvent`]s into
//! a channel that [`GameClient::tick`] drains first thing every tick, and
//! takes outgoing messages from an unbounded queue that never blocks.

pub mod reconnect;

pub use reconnect::ReconnectPolicy;

use cairn_core::{EntityEvent, EntityStore, Player};
use cairn_gameplay::gameplay::{pick_up_nearest, throw_held};
use cairn_gameplay::{Authority, PlayerInput, Simulation, StepReport};
use cairn_shared::{ClientMessage, ServerMessage, Vec3};
use crossbeam_channel::{Receiver, TryRecvError};
use tokio::sync::mpsc::UnboundedSender;

use crate::sync::ClientSync;

/// Client state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the first connection.
    Connecting,
    /// Connected and syncing.
    Connected,
    /// Connection lost, attempting reconnect.
    Reconnecting {
        /// Attempt number, 0 until the first retry starts.
        attempt: u32,
    },
    /// Reconnect budget exhausted. The local simulation is authoritative.
    Offline,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::Connecting
    }
}

/// What the transport task reports to the tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// A connection is up. The client must (re)join.
    Connected,
    /// A decoded server message.
    Message(ServerMessage),
    /// The connection dropped.
    Disconnected,
    /// Retry number `attempt` is about to start.
    Reconnecting {
        /// 1-based attempt.
        attempt: u32,
    },
    /// No more retries.
    GaveUp,
}

/// Who this client plays as.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Requested player id.
    pub player_id: String,
    /// Display name.
    pub username: String,
    /// Spawn position.
    pub spawn: Vec3,
}

/// Input sampled for one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientInput {
    /// Movement keys.
    pub motion: PlayerInput,
    /// Grab the nearest free stone.
    pub pick_up: bool,
    /// Throw the top held stone.
    pub throw: bool,
}

/// Game client for Cairn.
pub struct GameClient {
    store: EntityStore,
    sim: Simulation,
    sync: ClientSync,
    state: ClientState,
    username: String,
    inbound: Receiver<TransportEvent>,
    outbound: UnboundedSender<ClientMessage>,
    /// Messages dropped because the transport was gone.
    dropped_sends: u64,
    last_report: StepReport,
}

impl GameClient {
    /// Creates a client and its local player.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        sim: Simulation,
        inbound: Receiver<TransportEvent>,
        outbound: UnboundedSender<ClientMessage>,
    ) -> Self {
        let mut store = EntityStore::new();
        store
            .players
            .insert(Player::new(config.player_id.clone(), config.username.clone(), config.spawn));
        let sync = ClientSync::new(config.player_id, &sim.config().network);
        Self {
            store,
            sim,
            sync,
            state: ClientState::Connecting,
            username: config.username,
            inbound,
            outbound,
            dropped_sends: 0,
            last_report: StepReport::default(),
        }
    }

    /// Returns the current client state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Id of the local player (may change on `welcome`).
    #[must_use]
    pub fn local_id(&self) -> &str {
        self.sync.local_id()
    }

    /// The client's view of the world.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Sync state.
    #[must_use]
    pub const fn sync(&self) -> &ClientSync {
        &self.sync
    }

    /// The local player record.
    #[must_use]
    pub fn local_player(&self) -> Option<&Player> {
        self.store.players.get(self.sync.local_id())
    }

    /// Outgoing messages lost to a closed transport.
    #[must_use]
    pub const fn dropped_sends(&self) -> u64 {
        self.dropped_sends
    }

    /// Tower changes and hazard events from the most recent tick.
    #[must_use]
    pub const fn last_report(&self) -> &StepReport {
        &self.last_report
    }

    /// Runs one client tick. Returns the lifecycle events it produced.
    ///
    /// Order: inbound messages, local prediction, remote interpolation,
    /// reconciliation, stone actions, world step, liveness, broadcast.
    pub fn tick(&mut self, input: &ClientInput, dt: f32) -> Vec<EntityEvent> {
        self.drain_inbound();

        let local_id = self.sync.local_id().to_owned();
        self.sim.step_player(&mut self.store, &local_id, &input.motion, dt);
        self.sync.interpolate(&mut self.store);
        self.sync.reconcile_step(&mut self.store);

        if input.pick_up {
            let player_cfg = &self.sim.config().player;
            if let Some(stone_id) =
                pick_up_nearest(&mut self.store.players, &mut self.store.stones, &local_id, player_cfg)
            {
                self.send(ClientMessage::PickUpStone {
                    player_id: local_id.clone(),
                    stone_id,
                });
            }
        }
        if input.throw {
            let player_cfg = &self.sim.config().player;
            if let Some(release) =
                throw_held(&mut self.store.players, &mut self.store.stones, &local_id, player_cfg)
            {
                self.send(ClientMessage::ThrowStone {
                    player_id: local_id.clone(),
                    stone_id: release.stone_id,
                    position: release.position,
                    velocity: release.velocity,
                });
            }
        }

        let authority = if self.state == ClientState::Offline {
            Authority::Authoritative
        } else {
            Authority::Predicting
        };
        self.last_report = self.sim.step(&mut self.store, authority, dt);

        self.sync.prune(&mut self.store, dt);

        if self.state == ClientState::Connected && self.sync.broadcast_due(dt) {
            if let Some(update) = self.sync.local_update(&self.store) {
                self.send(update);
            }
        }

        self.store.drain_events()
    }

    /// Knocks down a tower as the local player.
    ///
    /// The tower disappears locally at once and the server is told; offline,
    /// the local removal is the whole effect. Returns `false` for an unknown
    /// tower.
    pub fn destroy_tower(&mut self, tower_id: &str) -> bool {
        if self.store.towers.remove(tower_id).is_none() {
            return false;
        }
        tracing::info!(tower = %tower_id, "Destroying tower");
        let actor_id = self.sync.local_id().to_owned();
        self.send(ClientMessage::TowerDestroyed {
            tower_id: tower_id.to_owned(),
            actor_id,
        });
        true
    }

    /// Graceful disconnect.
    pub fn leave(&mut self) {
        let player_id = self.sync.local_id().to_owned();
        self.send(ClientMessage::Leave { player_id });
    }

    fn drain_inbound(&mut self) {
        loop {
            match self.inbound.try_recv() {
                Ok(event) => self.on_transport_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state != ClientState::Offline {
                        tracing::warn!("Transport gone, continuing offline");
                        self.go_offline();
                    }
                    break;
                }
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.state = ClientState::Connected;
                tracing::info!(player = %self.sync.local_id(), "Connected, joining");
                let Some(player) = self.local_player() else {
                    return;
                };
                let join = ClientMessage::Join {
                    player_id: player.id.clone(),
                    username: self.username.clone(),
                    position: player.position,
                    rotation: player.rotation,
                };
                self.send(join);
                self.send(ClientMessage::RequestState);
            }
            TransportEvent::Message(message) => {
                if self.state == ClientState::Offline {
                    return;
                }
                self.sync.apply(&mut self.store, message);
            }
            TransportEvent::Disconnected => {
                tracing::warn!("Connection lost");
                self.state = ClientState::Reconnecting { attempt: 0 };
            }
            TransportEvent::Reconnecting { attempt } => {
                tracing::info!(attempt, "Reconnecting");
                self.state = ClientState::Reconnecting { attempt };
            }
            TransportEvent::GaveUp => {
                tracing::warn!("Reconnect budget exhausted, continuing offline");
                self.go_offline();
            }
        }
    }

    fn go_offline(&mut self) {
        self.state = ClientState::Offline;
        self.sync.forget_remotes(&mut self.store);
    }

    /// Non-blocking send. Failures are counted and dropped.
    fn send(&mut self, message: ClientMessage) {
        if !matches!(self.state, ClientState::Connected) {
            return;
        }
        let kind = message.kind();
        if self.outbound.send(message).is_err() {
            self.dropped_sends += 1;
            tracing::warn!(kind, "Send failed, message dropped");
        }
    }
}
