// Connection registry: outbound sinks keyed by connection token, and the
// player -> current connection mapping.

use crate::use_cases::types::{Binding, ConnId, PlayerId, ServerEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

const DROP_LOG_THROTTLE: Duration = Duration::from_secs(2);

struct Connection {
    outbound: mpsc::Sender<ServerEvent>,
    /// Fired when another connection takes over this player.
    replaced: Arc<Notify>,
    player_id: Option<PlayerId>,
    binding: Binding,
    dropped: u64,
    last_drop_log: Option<Instant>,
}

/// Detached connection state handed back for cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub player_id: Option<PlayerId>,
    pub binding: Binding,
    /// True when this connection still owned its player mapping.
    pub was_current: bool,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnId, Connection>,
    players: HashMap<PlayerId, ConnId>,
}

impl ConnectionRegistry {
    pub fn attach(
        &mut self,
        conn_id: ConnId,
        outbound: mpsc::Sender<ServerEvent>,
        replaced: Arc<Notify>,
    ) {
        self.connections.insert(
            conn_id,
            Connection {
                outbound,
                replaced,
                player_id: None,
                binding: Binding::Unbound,
                dropped: 0,
                last_drop_log: None,
            },
        );
    }

    /// Removes the connection and drops its player mapping if it still owns it.
    pub fn detach(&mut self, conn_id: ConnId) -> Option<Detached> {
        let conn = self.connections.remove(&conn_id)?;
        let was_current = match conn.player_id {
            Some(player_id) => self.unbind(player_id, conn_id),
            None => false,
        };
        Some(Detached {
            player_id: conn.player_id,
            binding: conn.binding,
            was_current,
        })
    }

    /// Maps `player_id` to `conn_id` (last writer wins).
    ///
    /// A different connection previously mapped to the player loses its binding and is
    /// told to close. Returns the replaced connection token.
    pub fn bind(
        &mut self,
        player_id: PlayerId,
        conn_id: ConnId,
        binding: Binding,
    ) -> Option<ConnId> {
        let previous = self.players.insert(player_id, conn_id);
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.player_id = Some(player_id);
            conn.binding = binding;
        }

        let replaced = previous.filter(|prev| *prev != conn_id)?;
        if let Some(stale) = self.connections.get_mut(&replaced) {
            stale.binding = Binding::Unbound;
            stale.player_id = None;
            stale.replaced.notify_one();
            debug!(player_id, conn_id = replaced, "connection replaced");
        }
        Some(replaced)
    }

    /// Deletes the mapping only when `conn_id` is still the player's connection.
    pub fn unbind(&mut self, player_id: PlayerId, conn_id: ConnId) -> bool {
        if self.players.get(&player_id) == Some(&conn_id) {
            self.players.remove(&player_id);
            return true;
        }
        false
    }

    pub fn current(&self, player_id: PlayerId) -> Option<ConnId> {
        self.players.get(&player_id).copied()
    }

    pub fn player_of(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.connections.get(&conn_id).and_then(|c| c.player_id)
    }

    pub fn binding(&self, conn_id: ConnId) -> Option<&Binding> {
        self.connections.get(&conn_id).map(|c| &c.binding)
    }

    /// Number of live connections routed to `binding`.
    pub fn bound_count(&self, binding: &Binding) -> usize {
        self.connections
            .values()
            .filter(|c| &c.binding == binding)
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Fire-and-forget send to the player's current connection.
    pub fn send(&mut self, player_id: PlayerId, event: ServerEvent) -> bool {
        match self.current(player_id) {
            Some(conn_id) => self.send_to(conn_id, event),
            None => false,
        }
    }

    /// Never blocks: a full queue drops the event.
    pub fn send_to(&mut self, conn_id: ConnId, event: ServerEvent) -> bool {
        let Some(conn) = self.connections.get_mut(&conn_id) else {
            return false;
        };
        match conn.outbound.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                conn.dropped += 1;
                let now = Instant::now();
                let should_log = conn
                    .last_drop_log
                    .is_none_or(|last| now.duration_since(last) >= DROP_LOG_THROTTLE);
                if should_log {
                    conn.last_drop_log = Some(now);
                    warn!(
                        conn_id,
                        player_id = ?conn.player_id,
                        dropped = conn.dropped,
                        "outbound queue full; dropping message"
                    );
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(conn_id, "outbound queue closed");
                false
            }
        }
    }
}
