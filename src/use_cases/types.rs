// Use-case level identifiers, settings and outbound events.

use crate::domain::rounds::{GameSummary, RoundView};
use crate::domain::tuning::{ArenaTuning, RoundTuning};
use crate::domain::{ArenaSnapshot, GameKind};
use std::sync::Arc;
use std::time::Duration;

pub type PlayerId = u64;
/// Identity token of one transport connection.
pub type ConnId = u64;

/// Where a connection's inbound messages are routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Unbound,
    Lobby,
    Round(String),
    Arena(String),
}

impl Binding {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Binding::Round(id) | Binding::Arena(id) => Some(id),
            Binding::Unbound | Binding::Lobby => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    Waiting,
    Ready,
    Starting,
}

impl LobbyPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            LobbyPhase::Waiting => "waiting",
            LobbyPhase::Ready => "ready",
            LobbyPhase::Starting => "starting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyPlayerView {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySnapshot {
    pub players: Vec<LobbyPlayerView>,
    pub phase: LobbyPhase,
    pub selected_game: Option<GameKind>,
    pub selected_by: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub player_id: PlayerId,
    /// `None` while the player sits in the lobby.
    pub room_id: Option<String>,
    pub game: Option<GameKind>,
    pub lobby: Option<LobbySnapshot>,
}

/// Messages queued for one connection's writer.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Welcome(Welcome),
    Lobby(LobbySnapshot),
    GameSelected { game: GameKind, player_id: PlayerId },
    GameStart { game: GameKind, room_id: String },
    Arena(Arc<ArenaSnapshot>),
    RoundState(Arc<RoundView>),
    Summary(Arc<GameSummary>),
}

/// Runtime pacing and buffer sizes for the hub and its tasks.
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Fixed step of the arena simulation.
    pub tick_interval: Duration,
    /// How often each connection is offered the latest arena snapshot.
    pub snapshot_interval: Duration,
    /// Time allowed for the first hello frame.
    pub hello_timeout: Duration,
    /// Delay before the first round of a new room.
    pub countdown: Duration,
    /// Pause on the results screen between rounds.
    pub between_rounds: Duration,
    /// Time after content appears before missing submissions time out.
    pub round_timeout: Duration,
    /// Time an unstarted room with nobody bound keeps its seats before it is ended.
    pub seat_hold: Duration,
    pub arena: ArenaTuning,
    pub rounds: RoundTuning,
}
