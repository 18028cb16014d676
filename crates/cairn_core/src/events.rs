//! # Entity Lifecycle Events
//!
//! The render-side seam. The store records what changed; once per tick the
//! owner drains the record and hands it to an [`EntityObserver`], which a
//! rendering layer implements to create, move and dispose visuals.
//!
//! ```text
//! ┌─────────────┐  drain_events  ┌─────────────────┐
//! │ EntityStore │───────────────>│ EntityObserver  │
//! └─────────────┘                │ (render / test) │
//!                                └─────────────────┘
//! ```

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::entity::EntityKind;

/// What happened to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// First appearance.
    Created,
    /// Any field change.
    Updated,
    /// Gone for good.
    Removed,
}

/// One lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityEvent {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity id.
    pub id: String,
    /// What happened.
    pub change: ChangeKind,
}

impl EntityEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            kind,
            id: id.into(),
            change,
        }
    }
}

/// Callbacks a rendering layer implements.
///
/// All methods default to no-ops so an observer only overrides what it needs.
pub trait EntityObserver {
    /// An entity appeared.
    fn on_entity_created(&mut self, _kind: EntityKind, _id: &str) {}

    /// An entity changed.
    fn on_entity_updated(&mut self, _kind: EntityKind, _id: &str) {}

    /// An entity disappeared.
    fn on_entity_removed(&mut self, _kind: EntityKind, _id: &str) {}

    /// Routes one event to the matching callback.
    fn observe(&mut self, event: &EntityEvent) {
        match event.change {
            ChangeKind::Created => self.on_entity_created(event.kind, &event.id),
            ChangeKind::Updated => self.on_entity_updated(event.kind, &event.id),
            ChangeKind::Removed => self.on_entity_removed(event.kind, &event.id),
        }
    }
}

impl EntityObserver for Vec<EntityEvent> {
    fn observe(&mut self, event: &EntityEvent) {
        self.push(event.clone());
    }
}

/// Forwards lifecycle events to another thread over a bounded channel.
///
/// Never blocks the tick: when the receiver falls behind, events are dropped
/// and counted.
pub struct ChannelObserver {
    sender: Sender<EntityEvent>,
    dropped: u64,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end for the render thread.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<EntityEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender, dropped: 0 }, receiver)
    }

    /// Events lost because the channel was full or closed.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EntityObserver for ChannelObserver {
    fn observe(&mut self, event: &EntityEvent) {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        created: u32,
        updated: u32,
        removed: u32,
    }

    impl EntityObserver for Counter {
        fn on_entity_created(&mut self, _kind: EntityKind, _id: &str) {
            self.created += 1;
        }
        fn on_entity_updated(&mut self, _kind: EntityKind, _id: &str) {
            self.updated += 1;
        }
        fn on_entity_removed(&mut self, _kind: EntityKind, _id: &str) {
            self.removed += 1;
        }
    }

    #[test]
    fn test_observe_routes_by_change() {
        let mut counter = Counter::default();
        counter.observe(&EntityEvent::new(EntityKind::Stone, "s1", ChangeKind::Created));
        counter.observe(&EntityEvent::new(EntityKind::Stone, "s1", ChangeKind::Updated));
        counter.observe(&EntityEvent::new(EntityKind::Stone, "s1", ChangeKind::Removed));
        assert_eq!((counter.created, counter.updated, counter.removed), (1, 1, 1));
    }

    #[test]
    fn test_channel_observer_drops_when_full() {
        let (mut observer, receiver) = ChannelObserver::new(1);
        observer.observe(&EntityEvent::new(EntityKind::Tower, "t1", ChangeKind::Created));
        observer.observe(&EntityEvent::new(EntityKind::Tower, "t2", ChangeKind::Created));

        assert_eq!(observer.dropped(), 1);
        assert_eq!(receiver.try_recv().unwrap().id, "t1");
    }
}
