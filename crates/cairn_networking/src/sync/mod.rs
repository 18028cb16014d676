//! # Client State Synchronization
//!
//! Applies server messages to the client's [`EntityStore`].
//!
//! ## Authority Split
//!
//! ```text
//! LOCAL PLAYER         predicted here, corrected by player_correction
//! REMOTE PLAYERS       interpolated toward relayed poses, pruned on silence
//! STONES/TOWERS/CLOUDS server verdicts overwrite local prediction
//! ```
//!
//! Every per-entity message is applied by kind and id. An id we have never
//! seen is created on demand, so message order across entities never matters.

pub mod liveness;

pub use liveness::LivenessTracker;

use cairn_core::{Cloud, Collection, EntityStore, NetworkConfig, Player, Stone, Tower};
use cairn_gameplay::gameplay::release_all;
use cairn_gameplay::RemoteInterpolator;
use cairn_shared::{ClientMessage, PlayerState, ServerMessage, StoneState, Vec3, WorldState};

use crate::prediction::{ReconciliationResult, Reconciler};

/// What applying one message did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Applied {
    /// The store changed.
    Changed,
    /// Message had nothing to act on (self echo, unknown id to remove).
    Ignored,
    /// The local player was reconciled.
    Corrected(ReconciliationResult),
}

/// Client-side view of the sync protocol.
#[derive(Debug)]
pub struct ClientSync {
    local_id: String,
    remote: RemoteInterpolator,
    liveness: LivenessTracker,
    reconciler: Reconciler,
    broadcast_interval: f32,
    since_broadcast: f32,
}

impl ClientSync {
    /// Creates the sync state for the player `local_id`.
    #[must_use]
    pub fn new(local_id: impl Into<String>, config: &NetworkConfig) -> Self {
        Self {
            local_id: local_id.into(),
            remote: RemoteInterpolator::new(config.remote_blend, config.remote_snap_epsilon),
            liveness: LivenessTracker::new(config.liveness_timeout),
            reconciler: Reconciler::from_config(config),
            broadcast_interval: config.broadcast_interval,
            since_broadcast: 0.0,
        }
    }

    /// Id of the player this client owns.
    #[must_use]
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Remote player liveness.
    #[must_use]
    pub const fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// Position correction state.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Applies one server message.
    pub fn apply(&mut self, store: &mut EntityStore, message: ServerMessage) -> Applied {
        tracing::debug!(kind = message.kind(), "Applying server message");
        match message {
            ServerMessage::Welcome { player_id, players } => {
                self.adopt_id(store, &player_id);
                for state in players {
                    self.upsert_remote(store, state);
                }
                Applied::Changed
            }
            ServerMessage::PlayerJoined(state) | ServerMessage::PlayerUpdate(state) => {
                if state.player_id == self.local_id {
                    return Applied::Ignored;
                }
                self.upsert_remote(store, state);
                Applied::Changed
            }
            ServerMessage::PlayerLeft { player_id } => {
                if player_id == self.local_id {
                    return Applied::Ignored;
                }
                if self.drop_remote(store, &player_id) {
                    Applied::Changed
                } else {
                    Applied::Ignored
                }
            }
            ServerMessage::PlayerCorrection {
                player_id,
                position,
                held_stones,
            } => {
                if player_id != self.local_id {
                    return Applied::Ignored;
                }
                self.correct_local(store, position, held_stones)
                    .map_or(Applied::Ignored, Applied::Corrected)
            }
            ServerMessage::InitialState(world) => self.replace_world(store, world),
            ServerMessage::StoneSpawned(state) | ServerMessage::StoneUpdate(state) => {
                upsert_stone(store, state);
                Applied::Changed
            }
            ServerMessage::StoneRemoved { stone_id } => {
                if store.stones.remove(&stone_id).is_none() {
                    return Applied::Ignored;
                }
                strip_held(&mut store.players, &stone_id, None);
                Applied::Changed
            }
            ServerMessage::TowerCreated(state) | ServerMessage::TowerUpdate(state) => {
                store.towers.insert(Tower::from_state(state));
                Applied::Changed
            }
            ServerMessage::TowerDestroyed { tower_id, actor_id } => {
                if store.towers.remove(&tower_id).is_none() {
                    return Applied::Ignored;
                }
                tracing::debug!(tower = %tower_id, actor = ?actor_id, "Tower destroyed");
                Applied::Changed
            }
            ServerMessage::CloudUpdate(state) => {
                if !store.clouds.update(&state.id, |cloud| cloud.apply_state(state.clone())) {
                    store.clouds.insert(Cloud::from_state(state));
                }
                Applied::Changed
            }
        }
    }

    /// Glides remote players toward their last relayed positions.
    pub fn interpolate(&mut self, store: &mut EntityStore) -> usize {
        self.remote.step(&mut store.players)
    }

    /// Applies this tick's share of a pending position correction.
    pub fn reconcile_step(&mut self, store: &mut EntityStore) -> bool {
        if !self.reconciler.is_pending() {
            return false;
        }
        let reconciler = &mut self.reconciler;
        let mut stepped = false;
        store.players.update(&self.local_id, |player| {
            stepped = reconciler.step(player);
        });
        stepped
    }

    /// Removes remote players silent for longer than the liveness timeout.
    ///
    /// Returns the pruned ids.
    pub fn prune(&mut self, store: &mut EntityStore, dt: f32) -> Vec<String> {
        let expired = self.liveness.advance(dt);
        let mut pruned = Vec::with_capacity(expired.len());
        for id in expired {
            if self.drop_remote(store, &id) {
                tracing::info!(player = %id, "Remote player timed out");
                pruned.push(id);
            }
        }
        pruned
    }

    /// Advances the broadcast accumulator. True when an update is due.
    ///
    /// Independent of tick rate: at most one update per call, and the
    /// remainder carries over.
    pub fn broadcast_due(&mut self, dt: f32) -> bool {
        self.since_broadcast += dt;
        if self.since_broadcast < self.broadcast_interval {
            return false;
        }
        self.since_broadcast = (self.since_broadcast - self.broadcast_interval).min(self.broadcast_interval);
        true
    }

    /// The periodic pose update for the local player.
    #[must_use]
    pub fn local_update(&self, store: &EntityStore) -> Option<ClientMessage> {
        store
            .players
            .get(&self.local_id)
            .map(|player| ClientMessage::PlayerUpdate(player.to_state()))
    }

    /// Forgets every remote player and pending correction.
    ///
    /// Used when the connection is lost for good: remote poses would only
    /// go stale.
    pub fn forget_remotes(&mut self, store: &mut EntityStore) {
        let remotes: Vec<String> = store
            .players
            .ids()
            .into_iter()
            .filter(|id| *id != self.local_id)
            .collect();
        for id in remotes {
            self.drop_remote(store, &id);
        }
        self.liveness.clear();
        self.remote.clear();
        self.reconciler.reset();
    }

    /// Takes the id the server assigned.
    fn adopt_id(&mut self, store: &mut EntityStore, assigned: &str) {
        if assigned == self.local_id {
            return;
        }
        let previous = std::mem::replace(&mut self.local_id, assigned.to_owned());
        if store.players.rename(&previous, assigned) {
            let held = store
                .players
                .get(assigned)
                .map(|player| player.held_stones.clone())
                .unwrap_or_default();
            for stone_id in held {
                store.stones.update(&stone_id, |stone| stone.hold(assigned));
            }
        }
        tracing::info!(from = %previous, to = %assigned, "Server assigned a new player id");
    }

    fn upsert_remote(&mut self, store: &mut EntityStore, state: PlayerState) {
        if state.player_id == self.local_id {
            return;
        }
        let id = state.player_id.clone();
        let target = state.position;
        let known = store.players.update(&id, |player| {
            if !state.username.is_empty() {
                player.username.clone_from(&state.username);
            }
            player.rotation = state.rotation;
            player.held_stones.clone_from(&state.held_stones);
        });
        if !known {
            tracing::debug!(player = %id, "Remote player created on demand");
            store.players.insert(Player::from_state(state));
        }
        self.remote.set_target(&id, target);
        self.liveness.touch(&id);
    }

    fn drop_remote(&mut self, store: &mut EntityStore, id: &str) -> bool {
        self.remote.forget(id);
        self.liveness.forget(id);
        release_all(&mut store.players, &mut store.stones, id);
        store.players.remove(id).is_some()
    }

    fn correct_local(
        &mut self,
        store: &mut EntityStore,
        position: Vec3,
        held_stones: Vec<String>,
    ) -> Option<ReconciliationResult> {
        let local_id = self.local_id.clone();
        let previous = store.players.get(&local_id)?.held_stones.clone();

        for stone_id in previous.iter().filter(|id| !held_stones.contains(*id)) {
            store.stones.update(stone_id, |stone| {
                if stone.held_by.as_deref() == Some(local_id.as_str()) {
                    stone.drop_loose();
                }
            });
        }
        for stone_id in &held_stones {
            store.stones.update(stone_id, |stone| {
                if stone.held_by.as_deref() != Some(local_id.as_str()) {
                    stone.hold(local_id.as_str());
                }
            });
        }

        let reconciler = &mut self.reconciler;
        let mut result = None;
        store.players.update(&local_id, |player| {
            player.held_stones = held_stones;
            result = Some(reconciler.correct(player, position));
        });
        if let Some(outcome) = result {
            tracing::debug!(player = %local_id, ?outcome, "Applied server correction");
        }
        result
    }

    /// `initial_state`: stones, towers, clouds and remote players are
    /// replaced wholesale; the local record becomes a correction.
    fn replace_world(&mut self, store: &mut EntityStore, world: WorldState) -> Applied {
        let WorldState {
            players,
            stones,
            towers,
            clouds,
        } = world;

        store.stones.clear();
        for state in stones {
            store.stones.insert(Stone::from_state(state));
        }
        store.towers.clear();
        for state in towers {
            store.towers.insert(Tower::from_state(state));
        }
        store.clouds.clear();
        for state in clouds {
            store.clouds.insert(Cloud::from_state(state));
        }

        let listed: Vec<&str> = players.iter().map(|p| p.player_id.as_str()).collect();
        let stale: Vec<String> = store
            .players
            .ids()
            .into_iter()
            .filter(|id| *id != self.local_id && !listed.contains(&id.as_str()))
            .collect();
        for id in stale {
            self.remote.forget(&id);
            self.liveness.forget(&id);
            store.players.remove(&id);
        }

        let mut local = None;
        for state in players {
            if state.player_id == self.local_id {
                local = Some(state);
            } else {
                self.upsert_remote(store, state);
            }
        }

        let correction = local.and_then(|state| self.correct_local(store, state.position, state.held_stones));
        tracing::info!(
            players = store.players.len(),
            stones = store.stones.len(),
            towers = store.towers.len(),
            clouds = store.clouds.len(),
            "World state replaced"
        );
        correction.map_or(Applied::Changed, Applied::Corrected)
    }
}

/// Applies a stone record and keeps holders' lists in step with it.
fn upsert_stone(store: &mut EntityStore, state: StoneState) {
    let id = state.id.clone();
    if !store.stones.update(&id, |stone| stone.apply_state(state.clone())) {
        store.stones.insert(Stone::from_state(state));
    }
    let holder = store.stones.get(&id).and_then(|stone| stone.held_by.clone());
    strip_held(&mut store.players, &id, holder.as_deref());
    if let Some(holder) = holder {
        store.players.update(&holder, |player| {
            if !player.held_stones.contains(&id) {
                player.held_stones.push(id.clone());
            }
        });
    }
}

/// Removes `stone_id` from every held list except `keep`'s.
fn strip_held(players: &mut Collection<Player>, stone_id: &str, keep: Option<&str>) {
    let listing: Vec<String> = players
        .iter()
        .filter(|p| Some(p.id.as_str()) != keep && p.held_stones.iter().any(|s| s == stone_id))
        .map(|p| p.id.clone())
        .collect();
    for id in listing {
        players.update(&id, |player| player.held_stones.retain(|s| s != stone_id));
    }
}
