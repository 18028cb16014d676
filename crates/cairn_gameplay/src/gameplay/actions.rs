//! Player stone actions: pick up, throw, release.
//!
//! Invalid requests (unknown stone, stone already held, full hands, wrong
//! holder) are no-ops, never errors.

use cairn_core::{Collection, Player, PlayerConfig, Stone};
use cairn_shared::Vec3;

use crate::physics::carried_position;

/// Hands a free stone to a player.
pub fn pick_up(
    players: &mut Collection<Player>,
    stones: &mut Collection<Stone>,
    player_id: &str,
    stone_id: &str,
    max_held: usize,
) -> bool {
    let Some(player) = players.get(player_id) else {
        return false;
    };
    if player.held_stones.len() >= max_held {
        return false;
    }
    let free = stones.get(stone_id).is_some_and(|stone| !stone.is_held);
    if !free {
        return false;
    }

    stones.update(stone_id, |stone| stone.hold(player_id));
    players.update(player_id, |player| player.held_stones.push(stone_id.to_owned()));
    tracing::debug!(player = %player_id, stone = %stone_id, "Stone picked up");
    true
}

/// Picks up the nearest free stone within reach. Returns its id.
pub fn pick_up_nearest(
    players: &mut Collection<Player>,
    stones: &mut Collection<Stone>,
    player_id: &str,
    cfg: &PlayerConfig,
) -> Option<String> {
    let position = players.get(player_id)?.position;
    let nearest = stones
        .iter()
        .filter(|stone| !stone.is_held)
        .map(|stone| (stone.id.clone(), stone.position.horizontal_distance(position)))
        .filter(|(_, dist)| *dist <= cfg.pickup_reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)?;

    pick_up(players, stones, player_id, &nearest, cfg.max_held_stones).then_some(nearest)
}

/// Releases a held stone as a projectile.
pub fn throw(
    players: &mut Collection<Player>,
    stones: &mut Collection<Stone>,
    player_id: &str,
    stone_id: &str,
    position: Vec3,
    velocity: Vec3,
) -> bool {
    let held_by_player = stones
        .get(stone_id)
        .is_some_and(|stone| stone.is_held && stone.held_by.as_deref() == Some(player_id));
    if !held_by_player {
        return false;
    }

    players.update(player_id, |player| player.held_stones.retain(|id| id != stone_id));
    stones.update(stone_id, |stone| stone.throw(position, velocity));
    tracing::debug!(player = %player_id, stone = %stone_id, "Stone thrown");
    true
}

/// A throw chosen by [`throw_held`].
#[derive(Clone, Debug, PartialEq)]
pub struct ThrowRelease {
    /// Thrown stone.
    pub stone_id: String,
    /// Release position.
    pub position: Vec3,
    /// Launch velocity.
    pub velocity: Vec3,
}

/// Throws the top stone of a player's stack along their heading.
pub fn throw_held(
    players: &mut Collection<Player>,
    stones: &mut Collection<Stone>,
    player_id: &str,
    cfg: &PlayerConfig,
) -> Option<ThrowRelease> {
    let player = players.get(player_id)?;
    let stone_id = player.held_stones.last()?.clone();
    let forward = player.forward();
    let position = carried_position(player.position, 0, cfg);
    let velocity = Vec3::new(
        forward.x * cfg.throw_speed,
        cfg.throw_lift,
        forward.z * cfg.throw_speed,
    );

    throw(players, stones, player_id, &stone_id, position, velocity).then_some(ThrowRelease {
        stone_id,
        position,
        velocity,
    })
}

/// Drops every stone a departing player carried. Returns their ids.
pub fn release_all(
    players: &mut Collection<Player>,
    stones: &mut Collection<Stone>,
    player_id: &str,
) -> Vec<String> {
    let held = players
        .get_mut(player_id)
        .map(|player| std::mem::take(&mut player.held_stones))
        .unwrap_or_default();

    let mut released = Vec::new();
    for stone_id in held {
        if stones.update(&stone_id, Stone::drop_loose) {
            released.push(stone_id);
        }
    }
    // Stones pointing at the player without being listed.
    let orphans: Vec<String> = stones
        .iter()
        .filter(|stone| stone.held_by.as_deref() == Some(player_id))
        .map(|stone| stone.id.clone())
        .collect();
    for stone_id in orphans {
        stones.update(&stone_id, Stone::drop_loose);
        released.push(stone_id);
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (Collection<Player>, Collection<Stone>) {
        let mut players = Collection::new();
        players.insert(Player::new("p1", "ana", Vec3::new(0.0, 1.0, 0.0)));
        players.insert(Player::new("p2", "bo", Vec3::new(50.0, 1.0, 0.0)));
        let mut stones = Collection::new();
        stones.insert(Stone::spawned("s1", Vec3::new(1.0, 0.3, 0.0)));
        stones.insert(Stone::spawned("s2", Vec3::new(2.0, 0.3, 0.0)));
        stones.insert(Stone::spawned("far", Vec3::new(30.0, 0.3, 0.0)));
        (players, stones)
    }

    #[test]
    fn test_pick_up_and_throw() {
        let (mut players, mut stones) = world();
        assert!(pick_up(&mut players, &mut stones, "p1", "s1", 5));
        assert_eq!(players.get("p1").unwrap().held_stones, vec!["s1"]);
        assert!(stones.get("s1").unwrap().is_held);

        // someone else cannot take or throw it
        assert!(!pick_up(&mut players, &mut stones, "p2", "s1", 5));
        assert!(!throw(&mut players, &mut stones, "p2", "s1", Vec3::ZERO, Vec3::ZERO));

        assert!(throw(
            &mut players,
            &mut stones,
            "p1",
            "s1",
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 5.0, -10.0)
        ));
        let stone = stones.get("s1").unwrap();
        assert!(stone.is_thrown && !stone.is_held);
        assert!(players.get("p1").unwrap().held_stones.is_empty());
    }

    #[test]
    fn test_full_hands() {
        let (mut players, mut stones) = world();
        assert!(pick_up(&mut players, &mut stones, "p1", "s1", 1));
        assert!(!pick_up(&mut players, &mut stones, "p1", "s2", 1));
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let (mut players, mut stones) = world();
        assert!(!pick_up(&mut players, &mut stones, "ghost", "s1", 5));
        assert!(!pick_up(&mut players, &mut stones, "p1", "ghost", 5));
        assert!(!throw(&mut players, &mut stones, "p1", "ghost", Vec3::ZERO, Vec3::ZERO));
    }

    #[test]
    fn test_pick_up_nearest_respects_reach() {
        let (mut players, mut stones) = world();
        let cfg = PlayerConfig::default();
        assert_eq!(pick_up_nearest(&mut players, &mut stones, "p1", &cfg).as_deref(), Some("s1"));
        assert_eq!(pick_up_nearest(&mut players, &mut stones, "p1", &cfg).as_deref(), Some("s2"));
        assert_eq!(pick_up_nearest(&mut players, &mut stones, "p1", &cfg), None);
    }

    #[test]
    fn test_throw_held_uses_heading() {
        let (mut players, mut stones) = world();
        let cfg = PlayerConfig::default();
        pick_up(&mut players, &mut stones, "p1", "s1", 5);
        let release = throw_held(&mut players, &mut stones, "p1", &cfg).unwrap();
        assert_eq!(release.stone_id, "s1");
        // heading 0 throws toward -z
        assert!(release.velocity.z < 0.0);
        assert!(release.velocity.y > 0.0);
        assert!(throw_held(&mut players, &mut stones, "p1", &cfg).is_none());
    }

    #[test]
    fn test_release_all_drops_stones() {
        let (mut players, mut stones) = world();
        pick_up(&mut players, &mut stones, "p1", "s1", 5);
        pick_up(&mut players, &mut stones, "p1", "s2", 5);

        let released = release_all(&mut players, &mut stones, "p1");
        assert_eq!(released, vec!["s1", "s2"]);
        for id in ["s1", "s2"] {
            let stone = stones.get(id).unwrap();
            assert!(!stone.is_held && !stone.is_thrown && !stone.is_static);
        }
    }
}
