// In-progress game rooms and the lifecycle operations the supervisor needs from them.

use crate::domain::rounds::{RoundEngine, RoundPhase};
use crate::domain::{ArenaPhase, ArenaSim, ArenaSnapshot, GameKind};
use crate::use_cases::types::{Binding, PlayerId, ServerEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Notify, watch};

/// Lifecycle surface shared by every room variant.
pub trait GameRoom {
    fn room_id(&self) -> &str;
    fn room_code(&self) -> &str;
    fn kind(&self) -> GameKind;
    fn binding(&self) -> Binding;
    fn is_ended(&self) -> bool;
    fn mark_ended(&mut self);
    /// True once play has actually begun.
    fn has_started(&self) -> bool;
    fn player_named(&self, name: &str) -> Option<PlayerId>;
    fn player_ids(&self) -> Vec<PlayerId>;
    fn set_connected(&mut self, player_id: PlayerId, connected: bool);
    fn has_disconnected_player(&self) -> bool;
    /// When the last bound connection left a room that had not started yet.
    fn vacated_at(&self) -> Option<Instant>;
    fn set_vacated_at(&mut self, at: Option<Instant>);
    /// Current state, pushed to a player who (re)joins the room.
    fn state_event(&self) -> ServerEvent;
}

/// Deadlines driving a round room's loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundPacing {
    pub first_round_at: Option<Instant>,
    pub round_deadline: Option<Instant>,
    pub results_at: Option<Instant>,
}

pub struct RoundRoom {
    pub room_id: String,
    pub room_code: String,
    pub engine: RoundEngine,
    pub pacing: RoundPacing,
    pub loop_running: bool,
    /// Cuts the loop's current wait short.
    pub wake: Arc<Notify>,
    vacated_at: Option<Instant>,
    cancel_tx: watch::Sender<bool>,
}

impl RoundRoom {
    pub fn new(room_id: String, room_code: String, engine: RoundEngine) -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        Self {
            room_id,
            room_code,
            engine,
            pacing: RoundPacing::default(),
            loop_running: false,
            wake: Arc::new(Notify::new()),
            vacated_at: None,
            cancel_tx,
        }
    }

    pub fn cancel_rx(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    /// Stops the room's loop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl GameRoom for RoundRoom {
    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn room_code(&self) -> &str {
        &self.room_code
    }

    fn kind(&self) -> GameKind {
        self.engine.kind()
    }

    fn binding(&self) -> Binding {
        Binding::Round(self.room_id.clone())
    }

    fn is_ended(&self) -> bool {
        self.engine.is_ended()
    }

    fn mark_ended(&mut self) {
        self.engine.finish();
        self.wake.notify_one();
    }

    fn has_started(&self) -> bool {
        self.engine.round() > 0
            || !matches!(self.engine.phase(), RoundPhase::Waiting | RoundPhase::Ready)
    }

    fn player_named(&self, name: &str) -> Option<PlayerId> {
        self.engine.player_named(name).map(|p| p.id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.engine.players().map(|p| p.id).collect()
    }

    fn set_connected(&mut self, player_id: PlayerId, connected: bool) {
        self.engine.set_connected(player_id, connected);
    }

    fn has_disconnected_player(&self) -> bool {
        self.engine.players().any(|p| !p.connected)
    }

    fn vacated_at(&self) -> Option<Instant> {
        self.vacated_at
    }

    fn set_vacated_at(&mut self, at: Option<Instant>) {
        self.vacated_at = at;
    }

    fn state_event(&self) -> ServerEvent {
        ServerEvent::RoundState(Arc::new(self.engine.view()))
    }
}

pub struct ArenaRoom {
    pub room_id: String,
    pub room_code: String,
    pub sim: ArenaSim,
    /// Snapshot after the most recent tick.
    pub latest: Arc<ArenaSnapshot>,
    vacated_at: Option<Instant>,
}

impl ArenaRoom {
    pub fn new(room_id: String, room_code: String, sim: ArenaSim) -> Self {
        let latest = Arc::new(sim.snapshot());
        Self {
            room_id,
            room_code,
            sim,
            latest,
            vacated_at: None,
        }
    }

    pub fn refresh_snapshot(&mut self) {
        self.latest = Arc::new(self.sim.snapshot());
    }
}

impl GameRoom for ArenaRoom {
    fn room_id(&self) -> &str {
        &self.room_id
    }

    fn room_code(&self) -> &str {
        &self.room_code
    }

    fn kind(&self) -> GameKind {
        GameKind::Arena
    }

    fn binding(&self) -> Binding {
        Binding::Arena(self.room_id.clone())
    }

    fn is_ended(&self) -> bool {
        self.sim.phase() == ArenaPhase::Ended
    }

    fn mark_ended(&mut self) {
        self.sim.mark_ended();
        self.refresh_snapshot();
    }

    fn has_started(&self) -> bool {
        self.sim.has_started()
    }

    fn player_named(&self, name: &str) -> Option<PlayerId> {
        self.sim.player_named(name).map(|p| p.id)
    }

    fn player_ids(&self) -> Vec<PlayerId> {
        self.sim.players().map(|p| p.id).collect()
    }

    fn set_connected(&mut self, player_id: PlayerId, connected: bool) {
        self.sim.set_connected(player_id, connected);
    }

    fn has_disconnected_player(&self) -> bool {
        self.sim.players().any(|p| !p.connected)
    }

    fn vacated_at(&self) -> Option<Instant> {
        self.vacated_at
    }

    fn set_vacated_at(&mut self, at: Option<Instant>) {
        self.vacated_at = at;
    }

    fn state_event(&self) -> ServerEvent {
        ServerEvent::Arena(self.latest.clone())
    }
}
