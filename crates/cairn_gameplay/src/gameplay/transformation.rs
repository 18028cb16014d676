//! # Transformation Engine
//!
//! Settled thrown stones become towers. Per eligible stone, nearest tower by
//! 3D distance `d` to its base, tower radius `r`:
//!
//! ```text
//!   d < raise × r          consume stone, nearest tower level += 1
//!   raise × r ≤ d ≤ found × r   inert, nothing happens
//!   d > found × r / none   consume stone, found level-1 tower
//! ```
//!
//! This is the only code path that creates towers.

use cairn_core::{Collection, Stone, TerrainHeight, Tower, TowerConfig};
use cairn_shared::Vec3;

use crate::ids::IdGenerator;

/// How a stone was consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TowerChangeKind {
    /// New level-1 tower.
    Founded,
    /// Existing tower raised by one level.
    Raised,
}

/// A consumed stone and the full tower record it produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerChange {
    /// Founded or raised.
    pub kind: TowerChangeKind,
    /// Consumed stone.
    pub stone_id: String,
    /// Tower after the change.
    pub tower: Tower,
}

/// What a single stone would do right now.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    /// Raise this tower.
    Raise(String),
    /// Found a new tower.
    Found,
    /// Inert zone; leave the stone alone.
    Inert,
}

/// Advances the settle timer of every thrown, unheld stone.
pub fn advance_settle_timers(stones: &mut Collection<Stone>, dt: f32) {
    for stone in stones.iter_mut() {
        if stone.is_thrown && !stone.is_held {
            stone.since_throw += dt;
        }
    }
}

/// True if the stone may transform this tick.
#[must_use]
pub fn is_eligible(stone: &Stone, cfg: &TowerConfig) -> bool {
    stone.is_static && stone.is_thrown && !stone.is_held && stone.since_throw >= cfg.settle_delay
}

/// Classifies a stone position against the current towers.
#[must_use]
pub fn placement(position: Vec3, towers: &Collection<Tower>, cfg: &TowerConfig) -> Placement {
    let nearest = towers
        .iter()
        .map(|tower| (tower, tower.position.distance(position)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((tower, d)) if d < cfg.raise_distance() => Placement::Raise(tower.id.clone()),
        Some((_, d)) if d <= cfg.found_distance() => Placement::Inert,
        _ => Placement::Found,
    }
}

/// Transformation pass state.
#[derive(Debug)]
pub struct TransformationEngine {
    ids: IdGenerator,
}

impl TransformationEngine {
    /// Creates an engine whose tower ids derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            ids: IdGenerator::new(seed),
        }
    }

    /// Attempts to transform one stone.
    ///
    /// Returns `None` if the stone is unknown, already consumed, not
    /// eligible, or in the inert zone.
    pub fn transform_stone(
        &mut self,
        stone_id: &str,
        stones: &mut Collection<Stone>,
        towers: &mut Collection<Tower>,
        terrain: &dyn TerrainHeight,
        cfg: &TowerConfig,
        clock: f64,
    ) -> Option<TowerChange> {
        let stone = stones.get(stone_id)?;
        if !is_eligible(stone, cfg) {
            return None;
        }
        let position = stone.position;
        let thrower = stone.thrown_by.clone();

        match placement(position, towers, cfg) {
            Placement::Inert => None,
            Placement::Raise(tower_id) => {
                let tower = towers.get_mut(&tower_id)?;
                tower.level += 1;
                let tower = tower.clone();
                stones.remove(stone_id);
                tracing::info!(
                    tower = %tower.id,
                    stone = %stone_id,
                    level = tower.level,
                    "Tower raised"
                );
                Some(TowerChange {
                    kind: TowerChangeKind::Raised,
                    stone_id: stone_id.to_owned(),
                    tower,
                })
            }
            Placement::Found => {
                let base = Vec3::new(
                    position.x,
                    terrain.height_at(position.x, position.z),
                    position.z,
                );
                let tower = Tower::founded(self.ids.next_id("tower"), base, thrower, clock);
                towers.insert(tower.clone());
                stones.remove(stone_id);
                tracing::info!(tower = %tower.id, stone = %stone_id, "Tower founded");
                Some(TowerChange {
                    kind: TowerChangeKind::Founded,
                    stone_id: stone_id.to_owned(),
                    tower,
                })
            }
        }
    }

    /// Runs one pass over every eligible stone in id order.
    pub fn run(
        &mut self,
        stones: &mut Collection<Stone>,
        towers: &mut Collection<Tower>,
        terrain: &dyn TerrainHeight,
        cfg: &TowerConfig,
        clock: f64,
    ) -> Vec<TowerChange> {
        let eligible: Vec<String> = stones
            .iter()
            .filter(|stone| is_eligible(stone, cfg))
            .map(|stone| stone.id.clone())
            .collect();

        eligible
            .iter()
            .filter_map(|id| self.transform_stone(id, stones, towers, terrain, cfg, clock))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::FlatTerrain;

    fn settled_stone(id: &str, position: Vec3) -> Stone {
        let mut stone = Stone::spawned(id, position);
        stone.hold("p1");
        stone.throw(position, Vec3::ZERO);
        stone.is_static = true;
        stone.since_throw = 2.0;
        stone
    }

    fn tower_at(id: &str, position: Vec3, level: u32) -> Tower {
        let mut tower = Tower::founded(id, position, None, 0.0);
        tower.level = level;
        tower
    }

    struct World {
        stones: Collection<Stone>,
        towers: Collection<Tower>,
        engine: TransformationEngine,
        cfg: TowerConfig,
    }

    impl World {
        fn new() -> Self {
            Self {
                stones: Collection::new(),
                towers: Collection::new(),
                engine: TransformationEngine::new(1),
                cfg: TowerConfig::default(),
            }
        }

        fn run(&mut self) -> Vec<TowerChange> {
            self.engine
                .run(&mut self.stones, &mut self.towers, &FlatTerrain::new(0.0), &self.cfg, 5.0)
        }
    }

    #[test]
    fn test_near_stone_raises_nearest_tower() {
        let mut w = World::new();
        w.towers.insert(tower_at("t1", Vec3::ZERO, 2));
        w.stones.insert(settled_stone("s1", Vec3::new(1.0, 0.3, 0.0)));

        let changes = w.run();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TowerChangeKind::Raised);
        assert_eq!(changes[0].tower.id, "t1");
        assert_eq!(changes[0].tower.level, 3);
        assert!(w.stones.is_empty());
        assert_eq!(w.towers.get("t1").unwrap().level, 3);
    }

    #[test]
    fn test_far_stone_founds_tower_on_terrain() {
        let mut w = World::new();
        w.towers.insert(tower_at("t1", Vec3::ZERO, 1));
        w.stones.insert(settled_stone("s1", Vec3::new(10.0, 0.3, 0.0)));

        let changes = w.run();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, TowerChangeKind::Founded);
        let tower = &changes[0].tower;
        assert_eq!(tower.level, 1);
        assert_eq!(tower.position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(tower.created_by.as_deref(), Some("p1"));
        assert_eq!(tower.created_at, 5.0);
        assert_eq!(w.towers.len(), 2);
    }

    #[test]
    fn test_first_stone_founds_when_no_towers() {
        let mut w = World::new();
        w.stones.insert(settled_stone("s1", Vec3::new(0.0, 0.3, 0.0)));
        assert_eq!(w.run()[0].kind, TowerChangeKind::Founded);
    }

    #[test]
    fn test_inert_zone_is_idempotent() {
        let mut w = World::new();
        w.towers.insert(tower_at("t1", Vec3::ZERO, 1));
        // d = 3.5, between 1.5r = 3 and 2r = 4
        w.stones.insert(settled_stone("s1", Vec3::new(3.5, 0.0, 0.0)));

        for _ in 0..5 {
            assert!(w.run().is_empty());
        }
        assert!(w.stones.contains("s1"));
        assert_eq!(w.towers.len(), 1);
        assert_eq!(w.towers.get("t1").unwrap().level, 1);
    }

    #[test]
    fn test_zone_boundaries() {
        let mut towers = Collection::new();
        towers.insert(tower_at("t1", Vec3::ZERO, 1));
        let cfg = TowerConfig::default();
        assert_eq!(placement(Vec3::new(2.99, 0.0, 0.0), &towers, &cfg), Placement::Raise("t1".into()));
        assert_eq!(placement(Vec3::new(3.0, 0.0, 0.0), &towers, &cfg), Placement::Inert);
        assert_eq!(placement(Vec3::new(4.0, 0.0, 0.0), &towers, &cfg), Placement::Inert);
        assert_eq!(placement(Vec3::new(4.01, 0.0, 0.0), &towers, &cfg), Placement::Found);
    }

    #[test]
    fn test_distance_is_three_dimensional() {
        let mut towers = Collection::new();
        towers.insert(tower_at("t1", Vec3::ZERO, 1));
        let cfg = TowerConfig::default();
        // horizontally on top of the base but 10 units up
        assert_eq!(placement(Vec3::new(0.0, 10.0, 0.0), &towers, &cfg), Placement::Found);
    }

    #[test]
    fn test_settle_delay_gates_eligibility() {
        let mut w = World::new();
        let mut stone = settled_stone("s1", Vec3::ZERO);
        stone.since_throw = 0.0;
        w.stones.insert(stone);

        advance_settle_timers(&mut w.stones, 0.5);
        assert!(w.run().is_empty());
        advance_settle_timers(&mut w.stones, 0.5);
        assert_eq!(w.run().len(), 1);
    }

    #[test]
    fn test_unthrown_or_moving_stones_are_ignored() {
        let mut w = World::new();
        let mut spawned = Stone::spawned("s1", Vec3::ZERO);
        spawned.is_static = true;
        w.stones.insert(spawned);

        let mut moving = settled_stone("s2", Vec3::new(20.0, 0.0, 0.0));
        moving.is_static = false;
        w.stones.insert(moving);

        assert!(w.run().is_empty());
        assert_eq!(w.stones.len(), 2);
    }

    #[test]
    fn test_consumed_stone_is_noop() {
        let mut w = World::new();
        w.stones.insert(settled_stone("s1", Vec3::ZERO));
        assert_eq!(w.run().len(), 1);

        let again = w.engine.transform_stone(
            "s1",
            &mut w.stones,
            &mut w.towers,
            &FlatTerrain::new(0.0),
            &w.cfg,
            6.0,
        );
        assert!(again.is_none());
        assert_eq!(w.towers.len(), 1);
    }

    #[test]
    fn test_stones_in_one_pass_see_earlier_results() {
        let mut w = World::new();
        w.stones.insert(settled_stone("a", Vec3::new(50.0, 0.0, 0.0)));
        w.stones.insert(settled_stone("b", Vec3::new(51.0, 0.0, 0.0)));

        let changes = w.run();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, TowerChangeKind::Founded);
        assert_eq!(changes[1].kind, TowerChangeKind::Raised);
        assert_eq!(changes[1].tower.level, 2);
        assert_eq!(w.towers.len(), 1);
    }
}
