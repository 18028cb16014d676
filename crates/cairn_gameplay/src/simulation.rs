//! # Simulation Step
//!
//! One tick over the whole store, in fixed order:
//!
//! 1. held stones follow their holders
//! 2. free stones integrate
//! 3. settle timers advance
//! 4. transformation pass (authoritative only)
//! 5. hazard pass (authoritative), or cloud drift only (predicting)
//!
//! Players are stepped separately: only the owning client moves its own
//! player, so [`Simulation::step_player`] is called by the client before
//! [`Simulation::step`].

use std::sync::Arc;

use cairn_core::{EntityStore, GameConfig, TerrainHeight};

use crate::gameplay::{advance_settle_timers, HazardEvent, HazardSequencer, TowerChange, TransformationEngine};
use crate::physics::{carry_held, step_player, step_stone, PlayerEnv, PlayerInput, StoneStep};

/// Seed offset so clouds and tower ids draw from independent streams.
const HAZARD_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Who decides transformations and hazard phases this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Server, or a client that has given up on the server.
    Authoritative,
    /// Connected client: predict motion, wait for the server's verdicts.
    Predicting,
}

/// What one step changed beyond plain motion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Towers founded or raised.
    pub tower_changes: Vec<TowerChange>,
    /// Cloud phase changes and effects.
    pub hazard_events: Vec<HazardEvent>,
    /// Stones that came to rest this tick.
    pub settled_stones: Vec<String>,
}

/// Tick driver shared by server and client.
pub struct Simulation {
    config: GameConfig,
    terrain: Arc<dyn TerrainHeight>,
    transformation: TransformationEngine,
    hazards: HazardSequencer,
}

impl Simulation {
    /// Creates a simulation over `terrain`, seeded from `config.world.seed`.
    #[must_use]
    pub fn new(config: GameConfig, terrain: Arc<dyn TerrainHeight>) -> Self {
        let seed = config.world.seed;
        Self {
            transformation: TransformationEngine::new(seed),
            hazards: HazardSequencer::new(seed ^ HAZARD_STREAM),
            config,
            terrain,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Ground heights.
    #[must_use]
    pub fn terrain(&self) -> &dyn TerrainHeight {
        self.terrain.as_ref()
    }

    /// Shared handle to the terrain.
    #[must_use]
    pub fn terrain_handle(&self) -> Arc<dyn TerrainHeight> {
        Arc::clone(&self.terrain)
    }

    /// Moves the locally owned player. Returns `false` if it does not exist.
    pub fn step_player(
        &self,
        store: &mut EntityStore,
        player_id: &str,
        input: &PlayerInput,
        dt: f32,
    ) -> bool {
        let env = PlayerEnv {
            player: &self.config.player,
            tower: &self.config.tower,
            world: &self.config.world,
            terrain: self.terrain.as_ref(),
            towers: &store.towers,
        };
        match store.players.get_mut(player_id) {
            Some(player) => {
                step_player(player, input, &env, dt);
                true
            }
            None => false,
        }
    }

    /// Advances stones, towers and clouds by `dt` seconds.
    pub fn step(&mut self, store: &mut EntityStore, authority: Authority, dt: f32) -> StepReport {
        let mut report = StepReport::default();
        let clock = store.clock;
        let slices = store.slices();

        carry_held(slices.players, slices.stones, &self.config.player);

        for id in slices.stones.ids() {
            let simulated = slices.stones.get(&id).is_some_and(|s| s.is_simulated());
            if !simulated {
                continue;
            }
            let Some(stone) = slices.stones.get_mut(&id) else {
                continue;
            };
            let outcome = step_stone(
                stone,
                self.terrain.as_ref(),
                &self.config.world,
                &self.config.stone,
                dt,
            );
            if outcome == StoneStep::Settled {
                report.settled_stones.push(id);
            }
        }

        advance_settle_timers(slices.stones, dt);

        match authority {
            Authority::Authoritative => {
                report.tower_changes = self.transformation.run(
                    slices.stones,
                    slices.towers,
                    self.terrain.as_ref(),
                    &self.config.tower,
                    clock,
                );
                report.hazard_events = self.hazards.step(
                    slices.clouds,
                    slices.towers,
                    slices.players,
                    &self.config,
                    dt,
                );
            }
            Authority::Predicting => {
                report.hazard_events = self.hazards.follow(slices.clouds, &self.config, dt);
            }
        }

        store.clock += f64::from(dt);
        report
    }
}
