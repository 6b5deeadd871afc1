use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Why a connection request was not admitted
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("claimed set {claimed} does not match active set {active}")]
    SetMismatch { claimed: u32, active: u32 },

    #[error("no session has been declared yet")]
    NoActiveSession,

    #[error("missing clientID query parameter")]
    MissingClientId,

    #[error("malformed query parameter: {0}")]
    BadQuery(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Which side of the session a connection belongs to. The host slot and the
/// player table are disjoint address spaces; a host identifier is never
/// eligible for player lookups and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Player,
}

/// Opaque client identifier supplied by the connecting party. Unique among
/// currently-connected players; reusable after disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    pub id: ClientId,
    /// Channel for outbound events to this client.
    /// Cloning an OutboundMessage is O(1), so broadcasts serialize once.
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
}

/// Live channels for all admitted clients. Players keep insertion order so
/// roster snapshots are stable; the host lives in its own slot.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    players: Vec<Connection>,
    host: Option<Connection>,
}

impl Registry {
    pub fn register(
        &mut self,
        role: Role,
        id: ClientId,
        tx: mpsc::UnboundedSender<OutboundMessage>,
    ) {
        let conn = Connection { id, tx };
        match role {
            Role::Host => self.host = Some(conn),
            Role::Player => {
                // Identifier reuse replaces the channel but keeps the
                // roster position.
                if let Some(existing) = self.players.iter_mut().find(|c| c.id == conn.id) {
                    *existing = conn;
                } else {
                    self.players.push(conn);
                }
            }
        }
    }

    /// Removing an identifier that is not registered is a no-op.
    pub fn remove(&mut self, role: Role, id: &ClientId) {
        match role {
            Role::Host => {
                if self.host.as_ref().is_some_and(|h| &h.id == id) {
                    self.host = None;
                }
            }
            Role::Player => self.players.retain(|c| &c.id != id),
        }
    }

    /// Connected player identifiers in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|c| c.id.as_str().to_owned())
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Send to every player. A recipient that disconnected mid-broadcast is
    /// skipped, never an error.
    pub fn broadcast_players(&self, msg: OutboundMessage) {
        for player in &self.players {
            let _ = player.tx.send(msg.clone());
        }
    }

    /// Send to the player registered under `id`, if any.
    pub fn send_player(&self, id: &ClientId, msg: OutboundMessage) {
        if let Some(player) = self.players.iter().find(|c| &c.id == id) {
            let _ = player.tx.send(msg);
        }
    }

    /// Send to the host, if one is connected.
    pub fn send_host(&self, msg: OutboundMessage) {
        if let Some(host) = &self.host {
            let _ = host.tx.send(msg);
        }
    }
}
