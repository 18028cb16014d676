//! # Authoritative World State
//!
//! The server's copy of the world and every rule that mutates it.
//!
//! ## Design
//!
//! - One `ServerWorld` behind one lock: a message or a tick is applied
//!   whole, so stone consumption and the tower change it causes are never
//!   seen half done
//! - Methods return the [`Outbound`] messages they produced; the caller
//!   dispatches them before releasing the lock
//! - Players are owned by the client that joined them. Positions are trusted
//!   inside the world disk; everything about stones is decided here

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use cairn_core::{Cloud, EntityStore, Player, Stone};
use cairn_gameplay::gameplay::{pick_up, release_all, throw, HazardEvent};
use cairn_gameplay::physics::{clamp_to_disk, in_water};
use cairn_gameplay::{Authority, IdGenerator, Simulation};
use cairn_shared::{ClientMessage, PlayerState, ServerMessage, Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::server::connection::{ConnectionId, Outbound};
use crate::sync::LivenessTracker;

/// Seed offset for spawn placement.
const SPAWN_STREAM: u64 = 0xA5A5_0000_5EED_0001;
/// Seed offset for player and cloud ids.
const ID_STREAM: u64 = 0x1D1D_0000_5EED_0002;
/// Pick-up reach tolerated on the server, as a multiple of the client reach.
const PICKUP_SLACK: f32 = 2.0;
/// Attempts at finding dry land for a new stone.
const SPAWN_TRIES: usize = 16;

/// Server world: store, simulation, sessions and timers.
pub struct ServerWorld {
    store: EntityStore,
    sim: Simulation,
    liveness: LivenessTracker,
    /// Connection to player id; `None` until the client joins.
    sessions: BTreeMap<ConnectionId, Option<String>>,
    ids: IdGenerator,
    rng: ChaCha8Rng,
    spawn_timer: f32,
    flush_timer: f32,
}

impl ServerWorld {
    /// Creates the world and its clouds.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        let config = sim.config();
        let seed = config.world.seed;
        let mut world = Self {
            liveness: LivenessTracker::new(config.network.liveness_timeout),
            store: EntityStore::new(),
            sessions: BTreeMap::new(),
            ids: IdGenerator::new(seed ^ ID_STREAM),
            rng: ChaCha8Rng::seed_from_u64(seed ^ SPAWN_STREAM),
            spawn_timer: 0.0,
            flush_timer: 0.0,
            sim,
        };
        world.spawn_clouds();
        world.store.drain_events();
        world
    }

    /// Read access to the world.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable access to the world, for seeding scenarios.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// The simulation driving this world.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Player owned by `conn`, if it has joined.
    #[must_use]
    pub fn player_of(&self, conn: ConnectionId) -> Option<&str> {
        self.sessions.get(&conn)?.as_deref()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Registers a new connection.
    pub fn connect(&mut self, conn: ConnectionId) {
        tracing::info!(%conn, "Client connected");
        self.sessions.insert(conn, None);
    }

    /// Drops a connection and its player.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(Some(player_id)) = self.sessions.remove(&conn) {
            self.remove_player(&player_id, &mut out);
        }
        tracing::info!(%conn, "Client disconnected");
        out
    }

    /// Applies one client message.
    pub fn handle(&mut self, conn: ConnectionId, message: ClientMessage) -> Vec<Outbound> {
        let mut out = Vec::new();
        tracing::debug!(%conn, kind = message.kind(), "Client message");
        match message {
            ClientMessage::Join {
                player_id,
                username,
                position,
                rotation,
            } => {
                self.join(conn, &player_id, username, position, rotation, &mut out);
            }
            ClientMessage::RequestState => {
                out.push(Outbound::only(
                    conn,
                    ServerMessage::InitialState(self.store.snapshot()),
                ));
            }
            ClientMessage::PlayerUpdate(state) => {
                let player_id = match self.player_of(conn) {
                    Some(owned) if owned == state.player_id => owned.to_owned(),
                    Some(owned) => {
                        tracing::warn!(%conn, owned, claimed = %state.player_id, "Update for foreign player ignored");
                        return out;
                    }
                    None => self.join(
                        conn,
                        &state.player_id,
                        state.username.clone(),
                        state.position,
                        state.rotation,
                        &mut out,
                    ),
                };
                self.apply_update(conn, &player_id, &state, &mut out);
            }
            ClientMessage::PickUpStone {
                player_id,
                stone_id,
            } => {
                if !self.owns(conn, &player_id) {
                    return out;
                }
                let within_reach = self.within_reach(&player_id, &stone_id);
                let max_held = self.sim.config().player.max_held_stones;
                if within_reach
                    && pick_up(
                        &mut self.store.players,
                        &mut self.store.stones,
                        &player_id,
                        &stone_id,
                        max_held,
                    )
                {
                    self.push_stone(&stone_id, &mut out);
                } else {
                    self.reject(conn, &player_id, &stone_id, &mut out);
                }
            }
            ClientMessage::ThrowStone {
                player_id,
                stone_id,
                position,
                velocity,
            } => {
                if !self.owns(conn, &player_id) {
                    return out;
                }
                if throw(
                    &mut self.store.players,
                    &mut self.store.stones,
                    &player_id,
                    &stone_id,
                    position,
                    velocity,
                ) {
                    self.push_stone(&stone_id, &mut out);
                } else {
                    self.reject(conn, &player_id, &stone_id, &mut out);
                }
            }
            ClientMessage::TowerDestroyed { tower_id, actor_id } => {
                if !self.owns(conn, &actor_id) {
                    return out;
                }
                if self.store.towers.remove(&tower_id).is_some() {
                    tracing::info!(tower = %tower_id, actor = %actor_id, "Tower destroyed by player");
                    out.push(Outbound::all(ServerMessage::TowerDestroyed {
                        tower_id,
                        actor_id: Some(actor_id),
                    }));
                }
            }
            ClientMessage::Leave { player_id } => {
                if !self.owns(conn, &player_id) {
                    return out;
                }
                self.sessions.insert(conn, None);
                self.remove_player(&player_id, &mut out);
            }
        }
        out
    }

    /// Runs one authoritative tick.
    pub fn tick(&mut self, dt: f32) -> Vec<Outbound> {
        let mut out = Vec::new();

        self.spawn_timer += dt;
        let interval = self.sim.config().server.stone_spawn_interval;
        if self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            self.spawn_stone(&mut out);
        }

        let report = self.sim.step(&mut self.store, Authority::Authoritative, dt);

        for change in report.tower_changes {
            out.push(Outbound::all(ServerMessage::StoneRemoved {
                stone_id: change.stone_id,
            }));
            // founded or raised, peers get the whole record either way
            tracing::debug!(tower = %change.tower.id, kind = ?change.kind, "Broadcasting tower");
            out.push(Outbound::all(ServerMessage::TowerCreated(change.tower.to_state())));
        }

        for event in report.hazard_events {
            match event {
                HazardEvent::PhaseChanged { cloud_id, .. } => {
                    if let Some(cloud) = self.store.clouds.get(&cloud_id) {
                        out.push(Outbound::all(ServerMessage::CloudUpdate(cloud.to_state())));
                    }
                }
                HazardEvent::TowerDestroyed { cloud_id, tower_id } => {
                    out.push(Outbound::all(ServerMessage::TowerDestroyed {
                        tower_id,
                        actor_id: Some(cloud_id),
                    }));
                }
                HazardEvent::RainStarted { .. } | HazardEvent::Flood { .. } => {}
            }
        }

        self.flush_timer += dt;
        if self.flush_timer >= self.sim.config().network.broadcast_interval {
            self.flush_timer -= self.sim.config().network.broadcast_interval;
            self.flush_dirty(&mut out);
        }

        for player_id in self.liveness.advance(dt) {
            tracing::info!(player = %player_id, "Player timed out");
            for owner in self.sessions.values_mut() {
                if owner.as_deref() == Some(player_id.as_str()) {
                    *owner = None;
                }
            }
            self.remove_player(&player_id, &mut out);
        }

        out
    }

    /// Joins `conn` as a player. Returns the id actually assigned.
    fn join(
        &mut self,
        conn: ConnectionId,
        requested: &str,
        username: String,
        position: Vec3,
        rotation: Vec3,
        out: &mut Vec<Outbound>,
    ) -> String {
        if let Some(previous) = self.player_of(conn).map(str::to_owned) {
            self.remove_player(&previous, out);
        }

        let owned_elsewhere = self.sessions.values().any(|owner| owner.as_deref() == Some(requested));
        let player_id = if requested.is_empty() || owned_elsewhere {
            self.ids.next_id("player")
        } else {
            requested.to_owned()
        };
        if self.store.players.contains(&player_id) {
            release_all(&mut self.store.players, &mut self.store.stones, &player_id);
        }

        let mut position = position;
        let clamped = clamp_to_disk(&mut position, self.boundary_radius());
        let mut player = Player::new(player_id.clone(), username, position);
        player.rotation = rotation;
        let state = player.to_state();
        self.store.players.insert(player);
        self.liveness.touch(&player_id);
        self.sessions.insert(conn, Some(player_id.clone()));

        let players = self
            .store
            .players
            .iter()
            .filter(|p| p.id != player_id)
            .map(Player::to_state)
            .collect();
        out.push(Outbound::only(
            conn,
            ServerMessage::Welcome {
                player_id: player_id.clone(),
                players,
            },
        ));
        out.push(Outbound::all_except(conn, ServerMessage::PlayerJoined(state)));
        if clamped {
            self.push_correction(conn, &player_id, out);
        }
        tracing::info!(%conn, player = %player_id, requested, "Player joined");
        player_id
    }

    fn apply_update(
        &mut self,
        conn: ConnectionId,
        player_id: &str,
        state: &PlayerState,
        out: &mut Vec<Outbound>,
    ) {
        let mut position = state.position;
        let clamped = clamp_to_disk(&mut position, self.boundary_radius());
        let known = self.store.players.update(player_id, |player| {
            player.position = position;
            player.rotation = state.rotation;
            if !state.username.is_empty() {
                player.username.clone_from(&state.username);
            }
        });
        if !known {
            return;
        }
        self.liveness.touch(player_id);

        let Some(player) = self.store.players.get(player_id) else {
            return;
        };
        let held_mismatch = player.held_stones != state.held_stones;
        out.push(Outbound::all_except(conn, ServerMessage::PlayerUpdate(player.to_state())));
        if clamped || held_mismatch {
            tracing::debug!(player = %player_id, clamped, held_mismatch, "Correcting player");
            self.push_correction(conn, player_id, out);
        }
    }

    fn owns(&self, conn: ConnectionId, player_id: &str) -> bool {
        let owned = self.player_of(conn) == Some(player_id);
        if !owned {
            tracing::warn!(%conn, player = %player_id, "Action for a player this connection does not own");
        }
        owned
    }

    fn within_reach(&self, player_id: &str, stone_id: &str) -> bool {
        let reach = self.sim.config().player.pickup_reach * PICKUP_SLACK;
        match (self.store.players.get(player_id), self.store.stones.get(stone_id)) {
            (Some(player), Some(stone)) => player.position.horizontal_distance(stone.position) <= reach,
            _ => false,
        }
    }

    /// Tells the client its action was refused and what is actually true.
    fn reject(&self, conn: ConnectionId, player_id: &str, stone_id: &str, out: &mut Vec<Outbound>) {
        tracing::debug!(%conn, player = %player_id, stone = %stone_id, "Stone action rejected");
        self.push_correction(conn, player_id, out);
        let truth = match self.store.stones.get(stone_id) {
            Some(stone) => ServerMessage::StoneUpdate(stone.to_state()),
            None => ServerMessage::StoneRemoved {
                stone_id: stone_id.to_owned(),
            },
        };
        out.push(Outbound::only(conn, truth));
    }

    fn push_correction(&self, conn: ConnectionId, player_id: &str, out: &mut Vec<Outbound>) {
        if let Some(player) = self.store.players.get(player_id) {
            out.push(Outbound::only(
                conn,
                ServerMessage::PlayerCorrection {
                    player_id: player.id.clone(),
                    position: player.position,
                    held_stones: player.held_stones.clone(),
                },
            ));
        }
    }

    fn push_stone(&self, stone_id: &str, out: &mut Vec<Outbound>) {
        if let Some(stone) = self.store.stones.get(stone_id) {
            out.push(Outbound::all(ServerMessage::StoneUpdate(stone.to_state())));
        }
    }

    fn remove_player(&mut self, player_id: &str, out: &mut Vec<Outbound>) {
        self.liveness.forget(player_id);
        let released = release_all(&mut self.store.players, &mut self.store.stones, player_id);
        if self.store.players.remove(player_id).is_none() {
            return;
        }
        out.push(Outbound::all(ServerMessage::PlayerLeft {
            player_id: player_id.to_owned(),
        }));
        for stone_id in &released {
            self.push_stone(stone_id, out);
        }
        tracing::info!(player = %player_id, released = released.len(), "Player left");
    }

    /// Stone and cloud motion since the last flush. Held stones are skipped:
    /// every peer carries them itself.
    fn flush_dirty(&mut self, out: &mut Vec<Outbound>) {
        for id in self.store.stones.dirty_ids() {
            if let Some(stone) = self.store.stones.get(&id).filter(|s| !s.is_held) {
                out.push(Outbound::all(ServerMessage::StoneUpdate(stone.to_state())));
            }
        }
        for id in self.store.clouds.dirty_ids() {
            if let Some(cloud) = self.store.clouds.get(&id) {
                out.push(Outbound::all(ServerMessage::CloudUpdate(cloud.to_state())));
            }
        }
        self.store.drain_events();
    }

    fn boundary_radius(&self) -> f32 {
        let config = self.sim.config();
        config.world.half_size() * config.player.boundary_factor
    }

    fn spawn_clouds(&mut self) {
        let config = self.sim.config().clone();
        let half = config.world.half_size();
        for _ in 0..config.cloud.count {
            let angle = self.rng.gen_range(0.0..TAU);
            let radius = self.rng.gen_range(0.0..half * 0.5);
            let heading = self.rng.gen_range(0.0..TAU);
            let cloud = Cloud::new(
                self.ids.next_id("cloud"),
                Vec3::new(angle.cos() * radius, config.cloud.height, angle.sin() * radius),
                Vec2::new(heading.cos(), heading.sin()),
                config.cloud.speed,
            );
            tracing::info!(cloud = %cloud.id, "Cloud spawned");
            self.store.clouds.insert(cloud);
        }
    }

    /// Adds one free stone on dry land, unless the world is full.
    fn spawn_stone(&mut self, out: &mut Vec<Outbound>) {
        let config = self.sim.config();
        let free = self.store.stones.iter().filter(|s| !s.is_held).count();
        if free >= config.server.max_stones {
            return;
        }
        let land = config.stone.water_zone_factor * config.world.half_size() * 0.9;
        let height = config.server.stone_spawn_height;

        for _ in 0..SPAWN_TRIES {
            let angle = self.rng.gen_range(0.0..TAU);
            let radius = land * self.rng.gen_range(0.0f32..1.0).sqrt();
            let (x, z) = (angle.cos() * radius, angle.sin() * radius);
            let ground = self.sim.terrain().height_at(x, z);
            let position = Vec3::new(x, ground + height, z);
            if ground <= config.world.sea_level || in_water(Vec3::new(x, ground, z), &config.world, &config.stone) {
                continue;
            }
            let stone = Stone::spawned(self.ids.next_id("stone"), position);
            tracing::debug!(stone = %stone.id, "Stone spawned");
            out.push(Outbound::all(ServerMessage::StoneSpawned(stone.to_state())));
            self.store.stones.insert(stone);
            return;
        }
        tracing::debug!("No dry land found for a new stone");
    }
}
