//! # Client Connection Management
//!
//! Every connection owns an unbounded queue of encoded lines drained by its
//! writer task. The hub fans outbound messages into those queues.
//!
//! ## Design
//!
//! - Each message is encoded once, however many peers receive it
//! - A full or closed queue never blocks the tick; the line is dropped
//! - Removing a connection drops its sender, which ends its writer task

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cairn_shared::ServerMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::codec;

/// Unique identifier for a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Who receives an outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection.
    All,
    /// Every connection but one (usually the sender).
    AllExcept(ConnectionId),
    /// One connection.
    Only(ConnectionId),
}

impl Recipient {
    /// True if `id` is addressed.
    #[must_use]
    pub fn includes(self, id: ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(except) => except != id,
            Self::Only(only) => only == id,
        }
    }
}

/// A message and its audience.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Audience.
    pub target: Recipient,
    /// Message.
    pub message: ServerMessage,
}

impl Outbound {
    /// To every connection.
    #[must_use]
    pub const fn all(message: ServerMessage) -> Self {
        Self {
            target: Recipient::All,
            message,
        }
    }

    /// To everyone but `id`.
    #[must_use]
    pub const fn all_except(id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            target: Recipient::AllExcept(id),
            message,
        }
    }

    /// To `id` only.
    #[must_use]
    pub const fn only(id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            target: Recipient::Only(id),
            message,
        }
    }
}

/// Registry of live connections and their outbound queues.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    next_id: AtomicU64,
    peers: Mutex<BTreeMap<ConnectionId, UnboundedSender<String>>>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. Returns its id and the queue its writer drains.
    pub fn register(&self) -> (ConnectionId, UnboundedReceiver<String>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = unbounded_channel();
        self.peers.lock().insert(id, sender);
        (id, receiver)
    }

    /// Removes a connection. Its writer ends once the queue drains.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.peers.lock().remove(&id).is_some()
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    /// True if no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    /// Encodes and queues every message. Returns lines queued.
    pub fn dispatch(&self, batch: Vec<Outbound>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let peers = self.peers.lock();
        let mut queued = 0;
        for Outbound { target, message } in batch {
            let line = match codec::encode(&message) {
                Ok(line) => line,
                Err(error) => {
                    tracing::warn!(kind = message.kind(), %error, "Dropping unencodable message");
                    continue;
                }
            };
            for (id, sender) in peers.iter().filter(|(id, _)| target.includes(**id)) {
                if sender.send(line.clone()).is_ok() {
                    queued += 1;
                } else {
                    tracing::warn!(conn = %id, kind = message.kind(), "Send failed, message dropped");
                }
            }
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left(id: &str) -> ServerMessage {
        ServerMessage::PlayerLeft {
            player_id: id.into(),
        }
    }

    #[test]
    fn test_recipient_includes() {
        let a = ConnectionId(1);
        let b = ConnectionId(2);
        assert!(Recipient::All.includes(a));
        assert!(!Recipient::AllExcept(a).includes(a));
        assert!(Recipient::AllExcept(a).includes(b));
        assert!(Recipient::Only(b).includes(b));
        assert!(!Recipient::Only(b).includes(a));
    }

    #[test]
    fn test_dispatch_routes_by_recipient() {
        let hub = ConnectionHub::new();
        let (a, mut rx_a) = hub.register();
        let (b, mut rx_b) = hub.register();
        assert_ne!(a, b);
        assert_eq!(hub.len(), 2);

        let queued = hub.dispatch(vec![
            Outbound::all(left("x")),
            Outbound::all_except(a, left("y")),
            Outbound::only(a, left("z")),
        ]);
        assert_eq!(queued, 4);

        let a_lines: Vec<String> = std::iter::from_fn(|| rx_a.try_recv().ok()).collect();
        let b_lines: Vec<String> = std::iter::from_fn(|| rx_b.try_recv().ok()).collect();
        assert_eq!(a_lines.len(), 2);
        assert_eq!(b_lines.len(), 2);
        assert!(a_lines[1].contains("\"z\""));
        assert!(b_lines[1].contains("\"y\""));
        assert_eq!(codec::decode_server(&a_lines[0]).unwrap(), left("x"));
    }

    #[test]
    fn test_closed_queue_is_not_fatal() {
        let hub = ConnectionHub::new();
        let (_, rx_a) = hub.register();
        let (_, mut rx_b) = hub.register();
        drop(rx_a);

        assert_eq!(hub.dispatch(vec![Outbound::all(left("x"))]), 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_unregister() {
        let hub = ConnectionHub::new();
        let (a, _rx) = hub.register();
        assert!(hub.unregister(a));
        assert!(!hub.unregister(a));
        assert!(hub.is_empty());
    }
}
