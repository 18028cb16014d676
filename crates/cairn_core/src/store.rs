//! # Entity Store
//!
//! Four id-keyed collections plus a world clock. Every mutation through a
//! [`Collection`] is recorded so the owner can drain one batch of lifecycle
//! events per tick.
//!
//! Collections are `BTreeMap`s: iteration is in id order on every peer,
//! which keeps transformation and hazard passes deterministic.

use std::collections::{BTreeMap, BTreeSet};

use cairn_shared::WorldState;

use crate::entity::{Cloud, Entity, EntityKind, Player, Stone, Tower};
use crate::events::{ChangeKind, EntityEvent, EntityObserver};

/// One id-keyed collection with change tracking.
#[derive(Clone, Debug)]
pub struct Collection<T> {
    items: BTreeMap<String, T>,
    /// Creations and removals in the order they happened.
    log: Vec<(String, ChangeKind)>,
    /// Ids touched since the last drain.
    dirty: BTreeSet<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            log: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True if `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Inserts or replaces. A replacement is recorded as an update.
    pub fn insert(&mut self, item: T) {
        let id = item.id().to_owned();
        if self.items.insert(id.clone(), item).is_some() {
            self.dirty.insert(id);
        } else {
            self.log.push((id, ChangeKind::Created));
        }
    }

    /// Shared access.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    /// Mutable access. Marks the entity updated.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let item = self.items.get_mut(id)?;
        self.dirty.insert(id.to_owned());
        Some(item)
    }

    /// Applies `f` to the entity if present. Returns whether it was.
    pub fn update(&mut self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    /// Marks an entity updated without touching it.
    pub fn touch(&mut self, id: &str) {
        if self.items.contains_key(id) {
            self.dirty.insert(id.to_owned());
        }
    }

    /// Removes and returns the entity. Removing a missing id is a no-op.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let item = self.items.remove(id)?;
        self.dirty.remove(id);
        self.log.push((id.to_owned(), ChangeKind::Removed));
        Some(item)
    }

    /// Moves an entity to a new id, recorded as remove + create.
    ///
    /// Fails (returns `false`) if `from` is missing or `to` is taken.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.items.contains_key(from);
        }
        if self.items.contains_key(to) {
            return false;
        }
        let Some(mut item) = self.remove(from) else {
            return false;
        };
        item.set_id(to.to_owned());
        self.insert(item);
        true
    }

    /// Removes every entity.
    pub fn clear(&mut self) {
        let ids: Vec<String> = self.items.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Mutable entities in id order. Does NOT mark anything updated; callers
    /// that change an entity must [`touch`](Self::touch) it.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }

    /// Ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Ids updated since the last drain that still exist.
    #[must_use]
    pub fn dirty_ids(&self) -> Vec<String> {
        self.dirty
            .iter()
            .filter(|id| self.items.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Takes the pending events for this collection.
    ///
    /// Order: creations/removals as they happened, then updates for entities
    /// that still exist and were not created in this batch.
    pub fn drain_events(&mut self) -> Vec<EntityEvent> {
        let log = std::mem::take(&mut self.log);
        let dirty = std::mem::take(&mut self.dirty);

        let created: BTreeSet<&str> = log
            .iter()
            .filter(|(_, change)| *change == ChangeKind::Created)
            .map(|(id, _)| id.as_str())
            .collect();

        let mut events: Vec<EntityEvent> = log
            .iter()
            .map(|(id, change)| EntityEvent::new(T::KIND, id.clone(), *change))
            .collect();

        events.extend(
            dirty
                .into_iter()
                .filter(|id| self.items.contains_key(id) && !created.contains(id.as_str()))
                .map(|id| EntityEvent::new(T::KIND, id, ChangeKind::Updated)),
        );
        events
    }
}

/// Mutable borrows of every collection at once.
///
/// Subsystems take the fields they need, so the borrow checker proves the
/// transformation pass never touches clouds and the hazard pass never
/// touches stones.
pub struct StoreSlices<'a> {
    /// Players.
    pub players: &'a mut Collection<Player>,
    /// Stones.
    pub stones: &'a mut Collection<Stone>,
    /// Towers.
    pub towers: &'a mut Collection<Tower>,
    /// Clouds.
    pub clouds: &'a mut Collection<Cloud>,
}

/// All world entities plus the world clock.
#[derive(Clone, Debug, Default)]
pub struct EntityStore {
    /// Players by id.
    pub players: Collection<Player>,
    /// Stones by id.
    pub stones: Collection<Stone>,
    /// Towers by id.
    pub towers: Collection<Tower>,
    /// Clouds by id.
    pub clouds: Collection<Cloud>,
    /// Seconds of simulated time.
    pub clock: f64,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows every collection mutably and separately.
    pub fn slices(&mut self) -> StoreSlices<'_> {
        StoreSlices {
            players: &mut self.players,
            stones: &mut self.stones,
            towers: &mut self.towers,
            clouds: &mut self.clouds,
        }
    }

    /// Takes all pending lifecycle events, grouped by kind.
    pub fn drain_events(&mut self) -> Vec<EntityEvent> {
        let mut events = self.players.drain_events();
        events.extend(self.stones.drain_events());
        events.extend(self.towers.drain_events());
        events.extend(self.clouds.drain_events());
        events
    }

    /// Drains pending events into `observer`. Returns how many were sent.
    pub fn dispatch(&mut self, observer: &mut dyn EntityObserver) -> usize {
        let events = self.drain_events();
        for event in &events {
            observer.observe(event);
        }
        events.len()
    }

    /// Total entity count.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.players.len() + self.stones.len() + self.towers.len() + self.clouds.len()
    }

    /// Id of the player holding `stone_id`, per the stone's back-reference.
    #[must_use]
    pub fn holder_of(&self, stone_id: &str) -> Option<&str> {
        self.stones.get(stone_id)?.held_by.as_deref()
    }

    /// Kind lookup by id across all collections.
    #[must_use]
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        if self.players.contains(id) {
            Some(EntityKind::Player)
        } else if self.stones.contains(id) {
            Some(EntityKind::Stone)
        } else if self.towers.contains(id) {
            Some(EntityKind::Tower)
        } else if self.clouds.contains(id) {
            Some(EntityKind::Cloud)
        } else {
            None
        }
    }

    /// Full wire snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WorldState {
        WorldState {
            players: self.players.iter().map(Player::to_state).collect(),
            stones: self.stones.iter().map(Stone::to_state).collect(),
            towers: self.towers.iter().map(Tower::to_state).collect(),
            clouds: self.clouds.iter().map(Cloud::to_state).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_shared::Vec3;

    fn stone(id: &str) -> Stone {
        Stone::spawned(id, Vec3::ZERO)
    }

    #[test]
    fn test_insert_update_remove_events() {
        let mut store = EntityStore::new();
        store.stones.insert(stone("s1"));
        store.stones.insert(stone("s2"));
        store.drain_events();

        store.stones.update("s1", |s| s.position.y = 3.0);
        store.stones.remove("s2");

        let events = store.drain_events();
        assert_eq!(
            events,
            vec![
                EntityEvent::new(EntityKind::Stone, "s2", ChangeKind::Removed),
                EntityEvent::new(EntityKind::Stone, "s1", ChangeKind::Updated),
            ]
        );
        assert!(store.drain_events().is_empty());
    }

    #[test]
    fn test_update_of_new_entity_folds_into_create() {
        let mut store = EntityStore::new();
        store.towers.insert(Tower::founded("t1", Vec3::ZERO, None, 0.0));
        store.towers.update("t1", |t| t.level += 1);

        let events = store.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change, ChangeKind::Created);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = EntityStore::new();
        assert!(store.stones.remove("ghost").is_none());
        assert!(!store.stones.update("ghost", |_| {}));
        assert!(store.drain_events().is_empty());
    }

    #[test]
    fn test_iteration_is_in_id_order() {
        let mut stones = Collection::new();
        for id in ["c", "a", "b"] {
            stones.insert(stone(id));
        }
        assert_eq!(stones.ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rename_player() {
        let mut store = EntityStore::new();
        store
            .players
            .insert(Player::new("local", "ana", Vec3::ZERO));
        store.players.insert(Player::new("p2", "bo", Vec3::ZERO));

        assert!(!store.players.rename("local", "p2"));
        assert!(store.players.rename("local", "p1"));
        assert_eq!(store.players.get("p1").map(|p| p.id.as_str()), Some("p1"));
        assert!(!store.players.contains("local"));
    }

    #[test]
    fn test_dispatch_to_observer() {
        let mut store = EntityStore::new();
        store.clouds.insert(Cloud::new(
            "c1",
            Vec3::ZERO,
            cairn_shared::Vec2::X,
            3.0,
        ));
        let mut seen: Vec<EntityEvent> = Vec::new();
        assert_eq!(store.dispatch(&mut seen), 1);
        assert_eq!(seen[0].kind, EntityKind::Cloud);
    }

    #[test]
    fn test_snapshot_contains_everything() {
        let mut store = EntityStore::new();
        store.players.insert(Player::new("p1", "ana", Vec3::ZERO));
        store.stones.insert(stone("s1"));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.stones.len(), 1);
        assert!(snapshot.towers.is_empty());
    }
}
