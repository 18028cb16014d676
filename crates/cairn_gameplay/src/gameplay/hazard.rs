//! # Hazard Sequencer
//!
//! Every cloud runs the same four-phase cycle:
//!
//! ```text
//!   IDLE ──idle_duration──> MOVING ──player on tower in range──> RAINING
//!    ^                                                             │
//!    └──── tower destroyed <──flood_duration── FLOODING <──rain_duration
//! ```
//!
//! Exactly one transition per cloud per tick at most, so every phase is
//! observable. Idle and moving clouds drift and bounce off the world edge.

use std::collections::BTreeSet;

use cairn_core::{Cloud, CloudConfig, Collection, GameConfig, Player, Tower};
use cairn_shared::{CloudPhase, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::physics::is_standing_on;

/// Fraction of the flood spent fading in and fading out.
pub const FLOOD_FADE: f32 = 0.3;

/// Something a renderer or the network layer should hear about.
#[derive(Clone, Debug, PartialEq)]
pub enum HazardEvent {
    /// A cloud moved to its next phase.
    PhaseChanged {
        /// Cloud.
        cloud_id: String,
        /// Previous phase.
        from: CloudPhase,
        /// New phase.
        to: CloudPhase,
    },
    /// Rain started over the target.
    RainStarted {
        /// Cloud.
        cloud_id: String,
        /// Target tower.
        tower_id: String,
    },
    /// Flood ring progress for this tick.
    Flood {
        /// Cloud.
        cloud_id: String,
        /// Target tower.
        tower_id: String,
        /// `elapsed / flood_duration` in `[0, 1]`.
        progress: f32,
        /// Ring opacity in `[0, 1]`.
        opacity: f32,
    },
    /// The target tower was removed.
    TowerDestroyed {
        /// Cloud.
        cloud_id: String,
        /// Removed tower.
        tower_id: String,
    },
}

/// Ring opacity for a flood at `progress`: ramps in over the first 30 %,
/// out over the last 30 %.
#[must_use]
pub fn flood_opacity(progress: f32) -> f32 {
    let progress = progress.clamp(0.0, 1.0);
    if progress < FLOOD_FADE {
        progress / FLOOD_FADE
    } else if progress > 1.0 - FLOOD_FADE {
        (1.0 - progress) / FLOOD_FADE
    } else {
        1.0
    }
}

/// Drives every cloud through its destruction sequence.
#[derive(Debug)]
pub struct HazardSequencer {
    rng: ChaCha8Rng,
}

impl HazardSequencer {
    /// Creates a sequencer with a seeded bounce RNG.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Moves a cloud along its direction and reflects it at the world edge.
    ///
    /// Returns `true` if it bounced.
    pub fn drift(&mut self, cloud: &mut Cloud, half_size: f32, cfg: &CloudConfig, dt: f32) -> bool {
        cloud.position.x += cloud.direction.x * cloud.speed * dt;
        cloud.position.z += cloud.direction.z * cloud.speed * dt;

        let mut bounced = false;
        if cloud.position.x.abs() > half_size {
            cloud.direction.x = -cloud.direction.x;
            cloud.position.x = cloud.position.x.clamp(-half_size, half_size);
            bounced = true;
        }
        if cloud.position.z.abs() > half_size {
            cloud.direction.z = -cloud.direction.z;
            cloud.position.z = cloud.position.z.clamp(-half_size, half_size);
            bounced = true;
        }

        if bounced {
            let jitter = cfg.bounce_jitter.max(0.0);
            let dx = self.rng.gen_range(-jitter..=jitter);
            let dz = self.rng.gen_range(-jitter..=jitter);
            cloud.direction = Vec2::new(cloud.direction.x + dx, cloud.direction.z + dz).normalized();
        }
        bounced
    }

    /// Client-side step between server updates.
    ///
    /// Idle and moving clouds drift. Raining and flooding clouds replay their
    /// effects from the phase the server last sent: rain starts on the first
    /// tick of a raining phase, the flood ring advances until progress 1.
    /// Phases never change and towers are never removed here.
    pub fn follow(
        &mut self,
        clouds: &mut Collection<Cloud>,
        config: &GameConfig,
        dt: f32,
    ) -> Vec<HazardEvent> {
        let half = config.world.half_size();
        let mut events = Vec::new();
        for id in clouds.ids() {
            let Some(cloud) = clouds.get_mut(&id) else {
                continue;
            };
            match cloud.phase {
                CloudPhase::Idle | CloudPhase::Moving => {
                    self.drift(cloud, half, &config.cloud, dt);
                }
                CloudPhase::Raining => {
                    if let Some(tower_id) = cloud.target_tower_id.clone() {
                        if cloud.phase_elapsed == 0.0 {
                            events.push(HazardEvent::RainStarted {
                                cloud_id: id.clone(),
                                tower_id,
                            });
                        }
                    }
                }
                CloudPhase::Flooding => {
                    let progress = ((cloud.phase_elapsed + dt) / config.cloud.flood_duration).min(1.0);
                    if let Some(tower_id) = cloud.target_tower_id.clone() {
                        events.push(HazardEvent::Flood {
                            cloud_id: id.clone(),
                            tower_id,
                            progress,
                            opacity: flood_opacity(progress),
                        });
                    }
                }
            }
            cloud.phase_elapsed += dt;
        }
        events
    }

    /// Runs one authoritative tick for every cloud.
    pub fn step(
        &mut self,
        clouds: &mut Collection<Cloud>,
        towers: &mut Collection<Tower>,
        players: &Collection<Player>,
        config: &GameConfig,
        dt: f32,
    ) -> Vec<HazardEvent> {
        let mut events = Vec::new();
        let mut taken: BTreeSet<String> = clouds
            .iter()
            .filter_map(|c| c.target_tower_id.clone())
            .collect();

        for id in clouds.ids() {
            let Some(cloud) = clouds.get_mut(&id) else {
                continue;
            };
            cloud.phase_elapsed += dt;

            match cloud.phase {
                CloudPhase::Idle => {
                    self.drift(cloud, config.world.half_size(), &config.cloud, dt);
                    if cloud.phase_elapsed >= config.cloud.idle_duration {
                        events.push(transition(cloud, CloudPhase::Moving));
                    }
                }
                CloudPhase::Moving => {
                    self.drift(cloud, config.world.half_size(), &config.cloud, dt);
                    if let Some(tower_id) = find_target(cloud, towers, players, &taken, config) {
                        taken.insert(tower_id.clone());
                        cloud.target_tower_id = Some(tower_id.clone());
                        events.push(transition(cloud, CloudPhase::Raining));
                        events.push(HazardEvent::RainStarted {
                            cloud_id: id.clone(),
                            tower_id,
                        });
                    }
                }
                CloudPhase::Raining => {
                    if cloud.phase_elapsed >= config.cloud.rain_duration {
                        events.push(transition(cloud, CloudPhase::Flooding));
                    }
                }
                CloudPhase::Flooding => {
                    let progress = (cloud.phase_elapsed / config.cloud.flood_duration).min(1.0);
                    let tower_id = cloud.target_tower_id.clone().unwrap_or_default();
                    events.push(HazardEvent::Flood {
                        cloud_id: id.clone(),
                        tower_id: tower_id.clone(),
                        progress,
                        opacity: flood_opacity(progress),
                    });

                    if progress >= 1.0 {
                        cloud.target_tower_id = None;
                        events.push(transition(cloud, CloudPhase::Idle));
                        taken.remove(&tower_id);
                        if towers.remove(&tower_id).is_some() {
                            tracing::info!(cloud = %id, tower = %tower_id, "Tower destroyed by flood");
                            events.push(HazardEvent::TowerDestroyed {
                                cloud_id: id.clone(),
                                tower_id,
                            });
                        }
                    }
                }
            }
        }
        events
    }
}

fn transition(cloud: &mut Cloud, to: CloudPhase) -> HazardEvent {
    let from = cloud.phase;
    debug_assert_eq!(from.next(), to);
    cloud.phase = to;
    cloud.phase_elapsed = 0.0;
    tracing::info!(cloud = %cloud.id, ?from, ?to, "Cloud phase transition");
    HazardEvent::PhaseChanged {
        cloud_id: cloud.id.clone(),
        from,
        to,
    }
}

/// Tower under the nearest player standing on an untargeted tower within
/// `trigger_radius` (horizontal) of the cloud.
fn find_target(
    cloud: &Cloud,
    towers: &Collection<Tower>,
    players: &Collection<Player>,
    taken: &BTreeSet<String>,
    config: &GameConfig,
) -> Option<String> {
    let mut best: Option<(f32, &str)> = None;
    for player in players.iter() {
        let dist = player.position.horizontal_distance(cloud.position);
        if dist > config.cloud.trigger_radius {
            continue;
        }
        let tower = towers.iter().find(|tower| {
            !taken.contains(&tower.id)
                && is_standing_on(player.position, tower, &config.tower, &config.player)
        });
        if let Some(tower) = tower {
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, tower.id.as_str()));
            }
        }
    }
    best.map(|(_, id)| id.to_owned())
}
