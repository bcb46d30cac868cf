//! Connection identity boundary.
//!
//! Maps each player id to the outbound channel of its connection. A player is
//! considered connected while registered and while the receiving half (the
//! connection's writer task) is alive.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tokio::sync::mpsc;
use tracing::trace;

use crate::game::state::PlayerId;
use crate::net::protocol::ServerMessage;

/// Outbound half of a connection
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Recipient list; rooms hold two players so this almost never spills
pub type Recipients = SmallVec<[PlayerId; 2]>;

/// A message addressed to one or more players
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Recipients,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn to_player(player_id: PlayerId, message: ServerMessage) -> Self {
        let mut recipients = Recipients::new();
        recipients.push(player_id);
        Self { recipients, message }
    }

    pub fn to_players<I: IntoIterator<Item = PlayerId>>(players: I, message: ServerMessage) -> Self {
        Self {
            recipients: players.into_iter().collect(),
            message,
        }
    }
}

/// Shared registry of live connections
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<PlayerId, ClientSender>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, player_id: PlayerId, sender: ClientSender) {
        self.clients.write().insert(player_id, sender);
    }

    pub fn unregister(&self, player_id: PlayerId) -> bool {
        self.clients.write().remove(&player_id).is_some()
    }

    /// Registered with an open channel
    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.clients
            .read()
            .get(&player_id)
            .is_some_and(|sender| !sender.is_closed())
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Send to a single player. Returns false if the player is gone.
    pub fn send(&self, player_id: PlayerId, message: ServerMessage) -> bool {
        match self.clients.read().get(&player_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Fan out an envelope. Returns how many recipients accepted it.
    pub fn deliver(&self, envelope: &Envelope) -> usize {
        let clients = self.clients.read();
        let mut delivered = 0;
        for player_id in &envelope.recipients {
            match clients.get(player_id) {
                Some(sender) if sender.send(envelope.message.clone()).is_ok() => delivered += 1,
                _ => trace!(%player_id, "Dropping message for departed player"),
            }
        }
        delivered
    }
}
