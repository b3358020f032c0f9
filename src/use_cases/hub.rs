// Session hub: single owner of lobby, room and connection state.
//
// Every operation runs under one `tokio::sync::Mutex`; nothing here awaits.

use crate::domain::rounds::{RoundEngine, RoundPhase, SubmitOutcome, Submission, variant_for};
use crate::domain::{ArenaInput, ArenaSim, ArenaSnapshot, GameKind};
use crate::use_cases::lobby::{Lobby, ReadyPair};
use crate::use_cases::registry::ConnectionRegistry;
use crate::use_cases::rooms::{ArenaRoom, GameRoom, RoundRoom};
use crate::use_cases::types::{
    Binding, ConnId, HubSettings, LobbySnapshot, PlayerId, ServerEvent, Welcome,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, mpsc, watch};
use tracing::{debug, info, warn};

pub type SharedHub = Arc<Mutex<SessionHub>>;

/// Result of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub player_id: PlayerId,
    pub binding: Binding,
    /// Round room whose loop the caller must spawn.
    pub start_loop: Option<String>,
}

/// What a round loop should do after one pass under the lock.
#[derive(Debug)]
pub enum RoundStep {
    Exit,
    Wait {
        until: Instant,
        wake: Arc<Notify>,
        cancel: watch::Receiver<bool>,
    },
}

pub struct SessionHub {
    settings: HubSettings,
    registry: ConnectionRegistry,
    lobby: Lobby,
    round_rooms: HashMap<String, RoundRoom>,
    arena_rooms: HashMap<String, ArenaRoom>,
    next_player_id: PlayerId,
    next_room_id: u64,
    rng: StdRng,
}

impl SessionHub {
    pub fn new(settings: HubSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_rng(settings: HubSettings, rng: StdRng) -> Self {
        Self {
            settings,
            registry: ConnectionRegistry::default(),
            lobby: Lobby::default(),
            round_rooms: HashMap::new(),
            arena_rooms: HashMap::new(),
            next_player_id: 1,
            next_room_id: 1,
            rng,
        }
    }

    pub fn shared(self) -> SharedHub {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    pub fn attach(
        &mut self,
        conn_id: ConnId,
        outbound: mpsc::Sender<ServerEvent>,
        replaced: Arc<Notify>,
    ) {
        self.registry.attach(conn_id, outbound, replaced);
    }

    pub fn player_of(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.registry.player_of(conn_id)
    }

    /// Routes a verified identity to a room seat, a lobby entry, or nowhere (capacity).
    pub fn connect(&mut self, conn_id: ConnId, name: &str, room_code: &str) -> Option<Assignment> {
        if let Some(assignment) = self.reconnect_to_room(conn_id, name, room_code) {
            return Some(assignment);
        }

        if let Some(player_id) = self.lobby.take_over(room_code, name, conn_id) {
            self.registry.bind(player_id, conn_id, Binding::Lobby);
            info!(player_id, room_code, "lobby entry taken over by new connection");
            self.welcome_to_lobby(player_id, room_code);
            return Some(Assignment {
                player_id,
                binding: Binding::Lobby,
                start_loop: None,
            });
        }

        if self.lobby.is_full(room_code) {
            warn!(room_code, name, "room code already has two players; rejecting join");
            return None;
        }
        if self.has_reserved_seat(room_code) {
            warn!(room_code, name, "room code has a seat held for reconnection; rejecting join");
            return None;
        }

        let player_id = self.next_player_id;
        self.next_player_id += 1;
        self.lobby.insert(player_id, name, room_code, conn_id);
        self.registry.bind(player_id, conn_id, Binding::Lobby);
        info!(player_id, room_code, name, "player joined lobby");
        self.welcome_to_lobby(player_id, room_code);
        Some(Assignment {
            player_id,
            binding: Binding::Lobby,
            start_loop: None,
        })
    }

    fn reconnect_to_room(
        &mut self,
        conn_id: ConnId,
        name: &str,
        room_code: &str,
    ) -> Option<Assignment> {
        let (binding, player_id) = find_seat(self.round_rooms.values(), name, room_code)
            .or_else(|| find_seat(self.arena_rooms.values(), name, room_code))?;

        self.registry.bind(player_id, conn_id, binding.clone());
        let room = room_mut(&mut self.round_rooms, &mut self.arena_rooms, &binding)?;
        room.set_connected(player_id, true);
        room.set_vacated_at(None);
        let welcome = Welcome {
            player_id,
            room_id: Some(room.room_id().to_string()),
            game: Some(room.kind()),
            lobby: None,
        };
        let state = room.state_event();
        info!(player_id, room_id = room.room_id(), room_code, "player reconnected to room");

        self.registry.send(player_id, ServerEvent::Welcome(welcome));
        self.registry.send(player_id, state);

        let start_loop = match &binding {
            Binding::Round(room_id) => self.claim_loop(room_id).then(|| room_id.clone()),
            _ => None,
        };
        Some(Assignment {
            player_id,
            binding,
            start_loop,
        })
    }

    /// A non-ended room for this code is holding a seat for a disconnected player.
    fn has_reserved_seat(&self, room_code: &str) -> bool {
        let held = |room: &dyn GameRoom| {
            room.room_code() == room_code && !room.is_ended() && room.has_disconnected_player()
        };
        self.round_rooms.values().any(|r| held(r)) || self.arena_rooms.values().any(|r| held(r))
    }

    /// Marks the round loop as running; false if it already is.
    fn claim_loop(&mut self, room_id: &str) -> bool {
        match self.round_rooms.get_mut(room_id) {
            Some(room) if !room.loop_running && !room.engine.is_ended() => {
                room.loop_running = true;
                true
            }
            _ => false,
        }
    }

    fn welcome_to_lobby(&mut self, player_id: PlayerId, room_code: &str) {
        let snapshot = self.lobby.snapshot(room_code);
        let welcome = Welcome {
            player_id,
            room_id: None,
            game: snapshot.selected_game,
            lobby: Some(snapshot),
        };
        self.registry.send(player_id, ServerEvent::Welcome(welcome));
        self.broadcast_lobby(room_code);
    }

    fn broadcast_lobby(&mut self, room_code: &str) {
        let snapshot = self.lobby.snapshot(room_code);
        broadcast(
            &mut self.registry,
            &self.lobby.members(room_code),
            ServerEvent::Lobby(snapshot),
        );
    }

    pub fn lobby_snapshot(&self, room_code: &str) -> LobbySnapshot {
        self.lobby.snapshot(room_code)
    }

    fn lobby_player(&self, conn_id: ConnId) -> Option<PlayerId> {
        match self.registry.binding(conn_id) {
            Some(Binding::Lobby) => self.registry.player_of(conn_id),
            _ => None,
        }
    }

    pub fn select_game(&mut self, conn_id: ConnId, game: GameKind) {
        let Some(player_id) = self.lobby_player(conn_id) else {
            debug!(conn_id, "game selection outside the lobby ignored");
            return;
        };
        match self.lobby.select_game(player_id, game) {
            Ok(room_code) => {
                info!(player_id, %room_code, game = game.as_str(), "game selected");
                let members = self.lobby.members(&room_code);
                broadcast(
                    &mut self.registry,
                    &members,
                    ServerEvent::GameSelected { game, player_id },
                );
                self.broadcast_lobby(&room_code);
            }
            Err(err) => debug!(player_id, ?err, "game selection rejected"),
        }
    }

    /// Lobby readiness or ready-for-next-round, depending on where the connection is bound.
    ///
    /// Returns a round room id when a promotion needs its loop spawned.
    pub fn set_ready(&mut self, conn_id: ConnId, ready: bool) -> Option<String> {
        let player_id = self.registry.player_of(conn_id)?;
        match self.registry.binding(conn_id)?.clone() {
            Binding::Lobby => match self.lobby.set_ready(player_id, ready) {
                Ok(room_code) => {
                    debug!(player_id, ready, "lobby readiness changed");
                    self.broadcast_lobby(&room_code);
                    let pair = self.lobby.take_ready_pair(&room_code)?;
                    self.promote(pair)
                }
                Err(err) => {
                    debug!(player_id, ?err, "lobby readiness rejected");
                    None
                }
            },
            Binding::Round(room_id) => {
                let room = self.round_rooms.get_mut(&room_id)?;
                match room.engine.set_ready_for_next(player_id, ready) {
                    Ok(()) => {
                        room.wake.notify_one();
                        let players = room.player_ids();
                        broadcast(&mut self.registry, &players, room.state_event());
                    }
                    Err(err) => debug!(player_id, %room_id, ?err, "ready-for-next rejected"),
                }
                None
            }
            Binding::Arena(_) | Binding::Unbound => None,
        }
    }

    fn promote(&mut self, pair: ReadyPair) -> Option<String> {
        let ReadyPair {
            room_code,
            game,
            entries,
        } = pair;
        let room_id = format!("{}-{}", game.as_str(), self.next_room_id);
        self.next_room_id += 1;

        let (binding, state) = match variant_for(game) {
            Some(variant) => {
                let mut engine = RoundEngine::new(variant, self.settings.rounds);
                for entry in &entries {
                    engine.add_player(entry.player_id, entry.name.clone());
                }
                let mut room = RoundRoom::new(room_id.clone(), room_code.clone(), engine);
                room.loop_running = true;
                let state = room.state_event();
                self.round_rooms.insert(room_id.clone(), room);
                (Binding::Round(room_id.clone()), state)
            }
            None => {
                let mut sim = ArenaSim::new(self.settings.arena);
                for entry in &entries {
                    sim.add_player(entry.player_id, entry.name.clone());
                }
                let room = ArenaRoom::new(room_id.clone(), room_code.clone(), sim);
                let state = room.state_event();
                self.arena_rooms.insert(room_id.clone(), room);
                (Binding::Arena(room_id.clone()), state)
            }
        };

        for entry in &entries {
            self.registry.bind(entry.player_id, entry.conn_id, binding.clone());
            self.registry.send(
                entry.player_id,
                ServerEvent::GameStart {
                    game,
                    room_id: room_id.clone(),
                },
            );
            self.registry.send(
                entry.player_id,
                ServerEvent::Welcome(Welcome {
                    player_id: entry.player_id,
                    room_id: Some(room_id.clone()),
                    game: Some(game),
                    lobby: None,
                }),
            );
            self.registry.send(entry.player_id, state.clone());
        }
        info!(%room_id, %room_code, game = game.as_str(), "lobby promoted to room");

        game.is_round_based().then_some(room_id)
    }

    pub fn submit(
        &mut self,
        conn_id: ConnId,
        submission: Submission,
        claimed_ms: f64,
        now: Instant,
    ) {
        let Some(player_id) = self.registry.player_of(conn_id) else {
            return;
        };
        let Some(Binding::Round(room_id)) = self.registry.binding(conn_id).cloned() else {
            debug!(player_id, "submission outside a round room ignored");
            return;
        };
        let Some(room) = self.round_rooms.get_mut(&room_id) else {
            return;
        };

        match room.engine.submit(player_id, &submission, claimed_ms, now) {
            Ok(outcome) => {
                if let SubmitOutcome::Resolved(record) = &outcome {
                    room.pacing.round_deadline = None;
                    room.pacing.results_at = Some(now);
                    room.wake.notify_one();
                    info!(
                        %room_id,
                        round = record.round,
                        winner_id = ?record.winner_id,
                        "round resolved"
                    );
                }
                let players = room.player_ids();
                broadcast(&mut self.registry, &players, room.state_event());
            }
            Err(err) => debug!(player_id, %room_id, ?err, "submission rejected"),
        }
    }

    /// Queues arena input; false when the connection is not seated in an arena.
    pub fn queue_input(&mut self, conn_id: ConnId, input: ArenaInput) -> bool {
        let Some(player_id) = self.registry.player_of(conn_id) else {
            return false;
        };
        let Some(Binding::Arena(room_id)) = self.registry.binding(conn_id) else {
            return false;
        };
        self.arena_rooms
            .get_mut(room_id)
            .is_some_and(|room| room.sim.queue_input(player_id, input))
    }

    /// Latest snapshot of the arena this connection is bound to.
    pub fn arena_snapshot(&self, conn_id: ConnId) -> Option<Arc<ArenaSnapshot>> {
        let Some(Binding::Arena(room_id)) = self.registry.binding(conn_id) else {
            return None;
        };
        self.arena_rooms.get(room_id).map(|room| room.latest.clone())
    }

    /// Queues `snapshot` for the connection's writer.
    pub fn push_snapshot(&mut self, conn_id: ConnId, snapshot: Arc<ArenaSnapshot>) -> bool {
        self.registry.send_to(conn_id, ServerEvent::Arena(snapshot))
    }

    pub fn tick_arenas(&mut self, now: Instant, dt: f32) {
        for room in self.arena_rooms.values_mut() {
            if room.is_ended() {
                continue;
            }
            let report = room.sim.tick(now, dt);
            if !report.respawned.is_empty() {
                debug!(room_id = %room.room_id, respawned = ?report.respawned, "players respawned");
            }
            room.refresh_snapshot();
        }
    }

    /// Transport for `conn_id` closed.
    pub fn disconnect(&mut self, conn_id: ConnId) {
        let Some(detached) = self.registry.detach(conn_id) else {
            return;
        };

        if let Some(player_id) = detached.player_id {
            match &detached.binding {
                Binding::Lobby => {
                    if let Some(departure) = self.lobby.remove(player_id, conn_id) {
                        info!(
                            player_id,
                            room_code = %departure.entry.room_code,
                            was_selector = departure.was_selector,
                            "player left lobby"
                        );
                        self.broadcast_lobby(&departure.entry.room_code);
                    }
                }
                Binding::Round(_) | Binding::Arena(_) => {
                    self.leave_room(&detached.binding, player_id, detached.was_current);
                }
                Binding::Unbound => {}
            }
        }

        self.collect_ended_rooms();
        self.maybe_reset_ids();
    }

    fn leave_room(&mut self, binding: &Binding, player_id: PlayerId, was_current: bool) {
        let bound = self.registry.bound_count(binding);
        let Some(room) = room_mut(&mut self.round_rooms, &mut self.arena_rooms, binding) else {
            return;
        };
        if was_current {
            room.set_connected(player_id, false);
        }
        info!(player_id, room_id = room.room_id(), bound, "player left room");

        if bound > 0 || room.is_ended() {
            return;
        }
        if room.has_started() {
            room.mark_ended();
            info!(room_id = room.room_id(), "room abandoned; marked ended");
        } else {
            room.set_vacated_at(Some(Instant::now()));
            debug!(room_id = room.room_id(), "room vacated before start; holding seats");
        }
    }

    /// Ends unstarted rooms whose seats have been held for longer than `seat_hold`.
    pub fn expire_vacated_rooms(&mut self, now: Instant) {
        let hold = self.settings.seat_hold;
        let expired = expire_held_seats(self.round_rooms.values_mut(), &self.registry, hold, now)
            + expire_held_seats(self.arena_rooms.values_mut(), &self.registry, hold, now);
        if expired > 0 {
            self.collect_ended_rooms();
            self.maybe_reset_ids();
        }
    }

    fn collect_ended_rooms(&mut self) {
        let registry = &self.registry;
        let unused =
            |room: &dyn GameRoom| room.is_ended() && registry.bound_count(&room.binding()) == 0;

        self.round_rooms.retain(|room_id, room| {
            let remove = unused(&*room);
            if remove {
                room.cancel();
                info!(%room_id, "round room removed");
            }
            !remove
        });
        self.arena_rooms.retain(|room_id, room| {
            let remove = unused(&*room);
            if remove {
                info!(%room_id, "arena room removed");
            }
            !remove
        });
    }

    fn maybe_reset_ids(&mut self) {
        let idle = self.lobby.is_empty()
            && self.registry.connection_count() == 0
            && self.round_rooms.values().all(|r| r.is_ended())
            && self.arena_rooms.values().all(|r| r.is_ended());
        if idle && self.next_player_id != 1 {
            debug!("server idle; resetting player ids");
            self.next_player_id = 1;
        }
    }

    /// One pass of a round room's loop: advance the state machine, then say how long to wait.
    pub fn drive_round(&mut self, room_id: &str, now: Instant) -> RoundStep {
        let bound = self.registry.bound_count(&Binding::Round(room_id.to_string()));
        let Some(room) = self.round_rooms.get_mut(room_id) else {
            return RoundStep::Exit;
        };
        if room.engine.is_ended() {
            room.loop_running = false;
            return RoundStep::Exit;
        }
        if bound == 0 {
            room.loop_running = false;
            info!(room_id, "no connections bound; pausing round loop");
            return RoundStep::Exit;
        }

        let settings = &self.settings;
        let registry = &mut self.registry;
        match room.engine.phase() {
            RoundPhase::Waiting | RoundPhase::Finished => {
                room.loop_running = false;
                RoundStep::Exit
            }
            RoundPhase::Ready => {
                let at = *room.pacing.first_round_at.get_or_insert(now + settings.countdown);
                if now < at {
                    return wait(room, at);
                }
                begin_round(room, now, &mut self.rng, settings.round_timeout, registry)
            }
            RoundPhase::Playing => {
                let deadline = match room.pacing.round_deadline {
                    Some(deadline) => deadline,
                    None => {
                        let deadline = now + round_window(room, settings.round_timeout);
                        room.pacing.round_deadline = Some(deadline);
                        deadline
                    }
                };
                if now < deadline {
                    return wait(room, deadline);
                }

                if let Some(record) = room.engine.resolve_timeouts() {
                    info!(
                        room_id,
                        round = record.round,
                        winner_id = ?record.winner_id,
                        "round timed out"
                    );
                }
                room.pacing.round_deadline = None;
                room.pacing.results_at = Some(now);
                broadcast(registry, &room.player_ids(), room.state_event());
                wait(room, now + settings.between_rounds)
            }
            RoundPhase::Results => {
                let results_at = *room.pacing.results_at.get_or_insert(now);
                let next_at = results_at + settings.between_rounds;
                if now < next_at && !room.engine.all_ready_for_next() {
                    return wait(room, next_at);
                }

                if room.engine.check_game_end() {
                    room.engine.finish();
                    room.loop_running = false;
                    let players = room.player_ids();
                    broadcast(registry, &players, room.state_event());
                    if let Some(summary) = room.engine.summarize() {
                        info!(room_id, winner_id = ?summary.winner_id, "game finished");
                        broadcast(registry, &players, ServerEvent::Summary(Arc::new(summary)));
                    }
                    return RoundStep::Exit;
                }
                begin_round(room, now, &mut self.rng, settings.round_timeout, registry)
            }
        }
    }
}

fn find_seat<'a, R: GameRoom + 'a>(
    rooms: impl Iterator<Item = &'a R>,
    name: &str,
    room_code: &str,
) -> Option<(Binding, PlayerId)> {
    rooms
        .filter(|room| !room.is_ended() && room.room_code() == room_code)
        .find_map(|room| room.player_named(name).map(|id| (room.binding(), id)))
}

fn expire_held_seats<'a, R: GameRoom + 'a>(
    rooms: impl Iterator<Item = &'a mut R>,
    registry: &ConnectionRegistry,
    hold: Duration,
    now: Instant,
) -> usize {
    let mut expired = 0;
    for room in rooms {
        let Some(vacated_at) = room.vacated_at() else {
            continue;
        };
        if room.is_ended() || registry.bound_count(&room.binding()) > 0 {
            room.set_vacated_at(None);
            continue;
        }
        if now >= vacated_at + hold {
            room.mark_ended();
            expired += 1;
            info!(room_id = room.room_id(), "held seats expired; room ended");
        }
    }
    expired
}

fn room_mut<'a>(
    round_rooms: &'a mut HashMap<String, RoundRoom>,
    arena_rooms: &'a mut HashMap<String, ArenaRoom>,
    binding: &Binding,
) -> Option<&'a mut dyn GameRoom> {
    match binding {
        Binding::Round(room_id) => round_rooms.get_mut(room_id).map(|r| r as &mut dyn GameRoom),
        Binding::Arena(room_id) => arena_rooms.get_mut(room_id).map(|r| r as &mut dyn GameRoom),
        Binding::Lobby | Binding::Unbound => None,
    }
}

fn broadcast(registry: &mut ConnectionRegistry, players: &[PlayerId], event: ServerEvent) {
    for player_id in players {
        registry.send(*player_id, event.clone());
    }
}

fn wait(room: &RoundRoom, until: Instant) -> RoundStep {
    RoundStep::Wait {
        until,
        wake: room.wake.clone(),
        cancel: room.cancel_rx(),
    }
}

/// Appearance delay plus the submission window.
fn round_window(room: &RoundRoom, round_timeout: Duration) -> Duration {
    room.engine
        .content()
        .map(|content| content.appear_delay())
        .unwrap_or_default()
        + round_timeout
}

fn begin_round(
    room: &mut RoundRoom,
    now: Instant,
    rng: &mut StdRng,
    round_timeout: Duration,
    registry: &mut ConnectionRegistry,
) -> RoundStep {
    if let Err(err) = room.engine.start_round(now, rng) {
        warn!(room_id = %room.room_id, ?err, "could not start round");
        room.loop_running = false;
        return RoundStep::Exit;
    }

    let deadline = now + round_window(room, round_timeout);
    room.pacing.round_deadline = Some(deadline);
    room.pacing.results_at = None;
    debug!(room_id = %room.room_id, round = room.engine.round(), "round started");
    broadcast(registry, &room.player_ids(), room.state_event());
    wait(room, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rounds::RoundContent;
    use crate::use_cases::test_support::{TestConn, seeded_hub};
    use crate::use_cases::types::LobbyPhase;

    fn welcome_of(events: &[ServerEvent]) -> Option<&Welcome> {
        events.iter().find_map(|event| match event {
            ServerEvent::Welcome(welcome) => Some(welcome),
            _ => None,
        })
    }

    fn join(
        hub: &mut SessionHub,
        conn_id: ConnId,
        name: &str,
        code: &str,
    ) -> (TestConn, Assignment) {
        let conn = TestConn::attach(hub, conn_id);
        let assignment = hub.connect(conn_id, name, code).unwrap();
        (conn, assignment)
    }

    /// Seats alice (conn 1) and bob (conn 2) of room code ABCD in a fresh room.
    fn promote(hub: &mut SessionHub, game: GameKind) -> (TestConn, TestConn, String) {
        let (mut a, _) = join(hub, 1, "alice", "ABCD");
        let (mut b, _) = join(hub, 2, "bob", "ABCD");
        hub.select_game(1, game);
        hub.set_ready(1, true);
        hub.set_ready(2, true);
        a.drain();
        b.drain();
        (a, b, format!("{}-1", game.as_str()))
    }

    fn current_word(hub: &SessionHub, room_id: &str) -> Submission {
        match hub.round_rooms[room_id].engine.content() {
            Some(RoundContent::Word(word)) => Submission::Word(word.clone()),
            other => panic!("expected a word, got {other:?}"),
        }
    }

    #[test]
    fn when_two_players_join_then_both_get_welcome_and_lobby() {
        let mut hub = seeded_hub();
        let (mut a, first) = join(&mut hub, 1, "alice", "ABCD");
        let (mut b, second) = join(&mut hub, 2, "bob", "ABCD");

        assert_eq!(first.player_id, 1);
        assert_eq!(second.player_id, 2);
        assert_eq!(second.binding, Binding::Lobby);

        let b_events = b.drain();
        let welcome = welcome_of(&b_events).unwrap();
        assert_eq!(welcome.player_id, 2);
        assert_eq!(welcome.room_id, None);
        assert_eq!(welcome.lobby.as_ref().map(|l| l.players.len()), Some(2));

        let last_lobby = a.drain().into_iter().rev().find_map(|event| match event {
            ServerEvent::Lobby(snapshot) => Some(snapshot),
            _ => None,
        });
        assert_eq!(last_lobby.map(|l| l.players.len()), Some(2));
    }

    #[test]
    fn when_third_distinct_name_joins_full_code_then_join_is_rejected() {
        let mut hub = seeded_hub();
        let _a = join(&mut hub, 1, "alice", "ABCD");
        let _b = join(&mut hub, 2, "bob", "ABCD");
        let _c = TestConn::attach(&mut hub, 3);

        assert_eq!(hub.connect(3, "carol", "ABCD"), None);
        assert!(hub.connect(3, "carol", "WXYZ").is_some());
    }

    #[tokio::test]
    async fn when_same_name_joins_again_then_lobby_entry_is_taken_over() {
        let mut hub = seeded_hub();
        let (old, _) = join(&mut hub, 1, "alice", "ABCD");
        let _b = join(&mut hub, 2, "bob", "ABCD");

        let (_new, assignment) = join(&mut hub, 3, "alice", "ABCD");
        assert_eq!(assignment.player_id, 1);
        old.replaced.notified().await;

        // The stale transport closing must not remove the entry.
        hub.disconnect(1);
        assert_eq!(hub.lobby_snapshot("ABCD").players.len(), 2);
    }

    #[test]
    fn when_selection_changes_then_game_selected_is_broadcast() {
        let mut hub = seeded_hub();
        let (mut a, _) = join(&mut hub, 1, "alice", "ABCD");
        let (mut b, _) = join(&mut hub, 2, "bob", "ABCD");
        a.drain();
        b.drain();

        hub.select_game(2, GameKind::MathSprint);

        for events in [a.drain(), b.drain()] {
            assert!(events.iter().any(|event| matches!(
                event,
                ServerEvent::GameSelected {
                    game: GameKind::MathSprint,
                    player_id: 2
                }
            )));
        }
        let snapshot = hub.lobby_snapshot("ABCD");
        assert_eq!(snapshot.phase, LobbyPhase::Ready);
        assert_eq!(snapshot.selected_by, Some(2));
    }

    #[test]
    fn when_both_ready_then_room_is_created_and_both_are_told() {
        let mut hub = seeded_hub();
        let (mut a, _) = join(&mut hub, 1, "alice", "ABCD");
        let (_b, _) = join(&mut hub, 2, "bob", "ABCD");
        hub.select_game(1, GameKind::SpeedType);
        assert_eq!(hub.set_ready(1, true), None);
        a.drain();

        let started = hub.set_ready(2, true);

        assert_eq!(started.as_deref(), Some("speedtype-1"));
        let events = a.drain();
        assert!(events.iter().any(|event| matches!(
            event,
            ServerEvent::GameStart {
                game: GameKind::SpeedType,
                room_id,
            } if room_id == "speedtype-1"
        )));
        let welcome = welcome_of(&events).unwrap();
        assert_eq!(welcome.room_id.as_deref(), Some("speedtype-1"));
        assert!(hub.lobby_snapshot("ABCD").players.is_empty());
        assert!(hub.round_rooms["speedtype-1"].loop_running);
    }

    #[test]
    fn when_player_drops_before_first_round_then_seat_is_held_and_restored() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::SpeedType);

        hub.disconnect(1);
        assert!(!hub.round_rooms[&room_id].is_ended());

        let _carol = TestConn::attach(&mut hub, 6);
        assert_eq!(hub.connect(6, "carol", "ABCD"), None);
        hub.disconnect(6);

        let (mut again, assignment) = join(&mut hub, 5, "alice", "ABCD");
        assert_eq!(assignment.player_id, 1);
        assert_eq!(assignment.binding, Binding::Round(room_id.clone()));
        // The loop never stopped, so nothing needs spawning.
        assert_eq!(assignment.start_loop, None);

        let events = again.drain();
        assert_eq!(
            welcome_of(&events).and_then(|w| w.room_id.clone()),
            Some(room_id)
        );
        assert!(events.iter().any(|event| matches!(event, ServerEvent::RoundState(_))));
    }

    #[test]
    fn when_nobody_is_bound_then_round_loop_pauses_and_reconnect_restarts_it() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::ClickSpeed);
        hub.disconnect(1);
        hub.disconnect(2);

        assert!(matches!(hub.drive_round(&room_id, Instant::now()), RoundStep::Exit));
        assert!(!hub.round_rooms[&room_id].loop_running);

        let (_again, assignment) = join(&mut hub, 7, "bob", "ABCD");
        assert_eq!(assignment.player_id, 2);
        assert_eq!(assignment.start_loop, Some(room_id));
    }

    #[test]
    fn when_everyone_leaves_a_started_arena_then_it_ends_and_names_rejoin_the_lobby() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::Arena);
        assert!(hub.queue_input(1, ArenaInput::default()));
        hub.tick_arenas(Instant::now(), 1.0 / 60.0);

        hub.disconnect(1);
        assert!(!hub.arena_rooms[&room_id].is_ended());
        hub.disconnect(2);

        assert!(hub.arena_rooms.is_empty());
        let (_again, assignment) = join(&mut hub, 9, "alice", "ABCD");
        assert_eq!(assignment.binding, Binding::Lobby);
        // Everything was idle, so ids start over.
        assert_eq!(assignment.player_id, 1);
    }

    #[test]
    fn when_both_leave_an_arena_before_any_input_then_room_is_collected() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::Arena);
        let now = Instant::now();
        hub.tick_arenas(now, 1.0 / 60.0);
        hub.tick_arenas(now, 1.0 / 60.0);

        hub.disconnect(1);
        assert!(!hub.arena_rooms[&room_id].is_ended());
        hub.disconnect(2);

        assert!(hub.arena_rooms.is_empty());
        let (_carol, assignment) = join(&mut hub, 3, "carol", "ABCD");
        assert_eq!(assignment.binding, Binding::Lobby);
    }

    #[test]
    fn when_both_leave_during_countdown_then_held_seats_expire_and_code_reopens() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::SpeedType);
        hub.disconnect(1);
        hub.disconnect(2);
        assert!(matches!(hub.drive_round(&room_id, Instant::now()), RoundStep::Exit));

        let _carol = TestConn::attach(&mut hub, 3);
        assert_eq!(hub.connect(3, "carol", "ABCD"), None);
        hub.disconnect(3);

        let hold = hub.settings().seat_hold;
        hub.expire_vacated_rooms(Instant::now() + hold / 2);
        assert!(hub.round_rooms.contains_key(&room_id));

        hub.expire_vacated_rooms(Instant::now() + hold + Duration::from_secs(1));
        assert!(hub.round_rooms.is_empty());

        let (_carol, assignment) = join(&mut hub, 4, "carol", "ABCD");
        assert_eq!(assignment.binding, Binding::Lobby);
        assert_eq!(assignment.player_id, 1);
    }

    #[test]
    fn when_player_returns_before_hold_expires_then_room_keeps_its_seats() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::MathSprint);
        hub.disconnect(1);
        hub.disconnect(2);

        let (_again, assignment) = join(&mut hub, 5, "alice", "ABCD");
        assert_eq!(assignment.binding, Binding::Round(room_id.clone()));

        let hold = hub.settings().seat_hold;
        hub.expire_vacated_rooms(Instant::now() + hold * 2);
        assert!(!hub.round_rooms[&room_id].is_ended());
    }

    #[test]
    fn when_arena_input_is_queued_then_next_tick_publishes_movement() {
        let mut hub = seeded_hub();
        let (_a, _b, _room_id) = promote(&mut hub, GameKind::Arena);
        let before = hub.arena_snapshot(1).unwrap();

        let input = ArenaInput {
            up: true,
            ..ArenaInput::default()
        };
        assert!(hub.queue_input(1, input));
        hub.tick_arenas(Instant::now(), 1.0 / 60.0);

        let after = hub.arena_snapshot(1).unwrap();
        assert_eq!(after.tick, before.tick + 1);
        assert_ne!(after.players[0].x, before.players[0].x);

        let _spectator = TestConn::attach(&mut hub, 42);
        assert!(!hub.queue_input(42, ArenaInput::default()));
        assert!(hub.arena_snapshot(42).is_none());
    }

    #[test]
    fn when_deadline_passes_without_submissions_then_round_times_out() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::MathSprint);
        let start = Instant::now();

        let RoundStep::Wait { until, .. } = hub.drive_round(&room_id, start) else {
            panic!("countdown should wait");
        };
        assert_eq!(until, start + Duration::from_secs(3));
        let RoundStep::Wait { until: deadline, .. } = hub.drive_round(&room_id, until) else {
            panic!("round should wait for submissions");
        };
        assert_eq!(deadline, until + Duration::from_secs(10));

        hub.drive_round(&room_id, deadline);

        let engine = &hub.round_rooms[&room_id].engine;
        assert_eq!(engine.phase(), RoundPhase::Results);
        assert_eq!(engine.history()[0].times_ms, [None, None]);
        assert_eq!(engine.history()[0].winner_id, None);
    }

    #[test]
    fn when_both_are_ready_for_next_then_pause_is_cut_short() {
        let mut hub = seeded_hub();
        let (_a, _b, room_id) = promote(&mut hub, GameKind::SpeedType);
        let t0 = Instant::now();
        hub.drive_round(&room_id, t0);
        let start = t0 + Duration::from_secs(3);
        hub.drive_round(&room_id, start);

        let word = current_word(&hub, &room_id);
        let t = start + Duration::from_secs(1);
        hub.submit(1, word.clone(), 400.0, t);
        hub.submit(2, word, 600.0, t);
        hub.set_ready(1, true);
        hub.set_ready(2, true);

        hub.drive_round(&room_id, t);

        assert_eq!(hub.round_rooms[&room_id].engine.round(), 2);
        assert_eq!(hub.round_rooms[&room_id].engine.phase(), RoundPhase::Playing);
    }

    #[test]
    fn when_all_rounds_resolve_then_room_finishes_with_summary() {
        let mut hub = seeded_hub();
        let (mut a, mut b, room_id) = promote(&mut hub, GameKind::SpeedType);
        let mut now = Instant::now();
        hub.drive_round(&room_id, now);
        now += Duration::from_secs(3);
        hub.drive_round(&room_id, now);

        for _ in 0..5 {
            let word = current_word(&hub, &room_id);
            now += Duration::from_secs(1);
            hub.submit(1, word.clone(), 500.0, now);
            hub.submit(2, word, 700.0, now);
            assert!(matches!(hub.drive_round(&room_id, now), RoundStep::Wait { .. }));
            now += Duration::from_secs(3);
            hub.drive_round(&room_id, now);
        }

        let room = &hub.round_rooms[&room_id];
        assert_eq!(room.engine.phase(), RoundPhase::Finished);
        assert!(!room.loop_running);
        for events in [a.drain(), b.drain()] {
            let summary = events.iter().find_map(|event| match event {
                ServerEvent::Summary(summary) => Some(summary.clone()),
                _ => None,
            });
            let summary = summary.unwrap();
            assert_eq!(summary.rounds.len(), 5);
            assert_eq!(summary.winner_id, Some(1));
        }
    }
}
