// Pre-game lobby state grouped by room code.

use crate::domain::GameKind;
use crate::use_cases::types::{ConnId, LobbyPhase, LobbyPlayerView, LobbySnapshot, PlayerId};
use std::collections::HashMap;

/// Maximum number of lobby entries sharing one room code.
pub const MAX_PLAYERS_PER_CODE: usize = 2;

/// Errors returned by lobby operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyError {
    /// Player has no lobby entry.
    UnknownPlayer,
    /// Readiness was requested before anyone picked a game.
    NoGameSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub room_code: String,
    pub ready: bool,
    pub selected_game: Option<GameKind>,
    /// Connection that currently owns this entry.
    pub conn_id: ConnId,
}

#[derive(Debug, Default)]
struct CodeLobby {
    entries: Vec<LobbyEntry>,
    selected_by: Option<PlayerId>,
}

impl CodeLobby {
    fn selected_game(&self) -> Option<GameKind> {
        let selector = self.selected_by?;
        self.entries
            .iter()
            .find(|e| e.player_id == selector)
            .and_then(|e| e.selected_game)
            .or_else(|| self.entries.iter().find_map(|e| e.selected_game))
    }
}

/// Entry removed because its connection went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub entry: LobbyEntry,
    pub was_selector: bool,
}

/// Both entries of a room code, ready and with a game selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyPair {
    pub room_code: String,
    pub game: GameKind,
    pub entries: [LobbyEntry; 2],
}

#[derive(Debug, Default)]
pub struct Lobby {
    codes: HashMap<String, CodeLobby>,
}

impl Lobby {
    pub fn is_empty(&self) -> bool {
        self.codes.values().all(|c| c.entries.is_empty())
    }

    pub fn is_full(&self, room_code: &str) -> bool {
        self.codes
            .get(room_code)
            .is_some_and(|c| c.entries.len() >= MAX_PLAYERS_PER_CODE)
    }

    pub fn entry(&self, player_id: PlayerId) -> Option<&LobbyEntry> {
        self.codes
            .values()
            .flat_map(|c| c.entries.iter())
            .find(|e| e.player_id == player_id)
    }

    fn entry_mut(&mut self, player_id: PlayerId) -> Option<&mut LobbyEntry> {
        self.codes
            .values_mut()
            .flat_map(|c| c.entries.iter_mut())
            .find(|e| e.player_id == player_id)
    }

    pub fn members(&self, room_code: &str) -> Vec<PlayerId> {
        self.codes
            .get(room_code)
            .map(|c| c.entries.iter().map(|e| e.player_id).collect())
            .unwrap_or_default()
    }

    /// Hands an existing same-name entry to a new connection, keeping its player id.
    pub fn take_over(&mut self, room_code: &str, name: &str, conn_id: ConnId) -> Option<PlayerId> {
        let entry = self
            .codes
            .get_mut(room_code)?
            .entries
            .iter_mut()
            .find(|e| e.name == name)?;
        entry.conn_id = conn_id;
        Some(entry.player_id)
    }

    /// Appends a new entry. Callers check capacity first; a full code returns `false`.
    pub fn insert(
        &mut self,
        player_id: PlayerId,
        name: &str,
        room_code: &str,
        conn_id: ConnId,
    ) -> bool {
        let code = self.codes.entry(room_code.to_string()).or_default();
        if code.entries.len() >= MAX_PLAYERS_PER_CODE {
            return false;
        }
        let selected_game = code.selected_game();
        code.entries.push(LobbyEntry {
            player_id,
            name: name.to_string(),
            room_code: room_code.to_string(),
            ready: false,
            selected_game,
            conn_id,
        });
        true
    }

    /// Sets the game for every entry of the selector's room code and clears readiness.
    pub fn select_game(
        &mut self,
        player_id: PlayerId,
        game: GameKind,
    ) -> Result<String, LobbyError> {
        let room_code = self
            .entry(player_id)
            .map(|e| e.room_code.clone())
            .ok_or(LobbyError::UnknownPlayer)?;
        let code = self
            .codes
            .get_mut(&room_code)
            .ok_or(LobbyError::UnknownPlayer)?;
        for entry in &mut code.entries {
            entry.selected_game = Some(game);
            entry.ready = false;
        }
        code.selected_by = Some(player_id);
        Ok(room_code)
    }

    pub fn set_ready(&mut self, player_id: PlayerId, ready: bool) -> Result<String, LobbyError> {
        let entry = self.entry_mut(player_id).ok_or(LobbyError::UnknownPlayer)?;
        if ready && entry.selected_game.is_none() {
            return Err(LobbyError::NoGameSelected);
        }
        entry.ready = ready;
        Ok(entry.room_code.clone())
    }

    /// Removes and returns the room code's entries when they can be promoted into a room.
    pub fn take_ready_pair(&mut self, room_code: &str) -> Option<ReadyPair> {
        let code = self.codes.get(room_code)?;
        let game = code.selected_game()?;
        if code.entries.len() != MAX_PLAYERS_PER_CODE || !code.entries.iter().all(|e| e.ready) {
            return None;
        }

        let code = self.codes.remove(room_code)?;
        let entries: [LobbyEntry; 2] = code.entries.try_into().ok()?;
        Some(ReadyPair {
            room_code: room_code.to_string(),
            game,
            entries,
        })
    }

    /// Removes the player's entry only if `conn_id` still owns it.
    pub fn remove(&mut self, player_id: PlayerId, conn_id: ConnId) -> Option<Departure> {
        let room_code = self.entry(player_id)?.room_code.clone();
        let code = self.codes.get_mut(&room_code)?;
        let idx = code
            .entries
            .iter()
            .position(|e| e.player_id == player_id && e.conn_id == conn_id)?;
        let entry = code.entries.remove(idx);

        let was_selector = code.selected_by == Some(player_id);
        if was_selector {
            code.selected_by = None;
            for other in &mut code.entries {
                other.selected_game = None;
                other.ready = false;
            }
        }
        if code.entries.is_empty() {
            self.codes.remove(&room_code);
        }
        Some(Departure {
            entry,
            was_selector,
        })
    }

    pub fn snapshot(&self, room_code: &str) -> LobbySnapshot {
        let Some(code) = self.codes.get(room_code) else {
            return LobbySnapshot {
                players: Vec::new(),
                phase: LobbyPhase::Waiting,
                selected_game: None,
                selected_by: None,
            };
        };

        let selected_game = code.selected_game();
        let full = code.entries.len() == MAX_PLAYERS_PER_CODE;
        let phase = match selected_game {
            Some(_) if full && code.entries.iter().all(|e| e.ready) => LobbyPhase::Starting,
            Some(_) if full => LobbyPhase::Ready,
            _ => LobbyPhase::Waiting,
        };

        LobbySnapshot {
            players: code
                .entries
                .iter()
                .map(|e| LobbyPlayerView {
                    id: e.player_id,
                    name: e.name.clone(),
                    ready: e.ready,
                })
                .collect(),
            phase,
            selected_game,
            selected_by: code.selected_by,
        }
    }
}
