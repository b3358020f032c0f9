// Arena match simulation: two players, static walls, hitscan shots.

use crate::domain::state::{
    ArenaInput, ArenaPhase, ArenaPlayer, ArenaPlayerSnapshot, ArenaSnapshot, SpawnPoint, Wall,
};
use crate::domain::systems::{combat, movement};
use crate::domain::tuning::ArenaTuning;
use std::time::Instant;

pub const SPAWN_POINTS: [SpawnPoint; 2] = [
    SpawnPoint {
        x: 100.0,
        y: 100.0,
        yaw: 45.0,
    },
    SpawnPoint {
        x: 700.0,
        y: 700.0,
        yaw: 225.0,
    },
];

/// Fixed layout for the 800x800 arena.
pub fn default_walls() -> Vec<Wall> {
    vec![
        // Central cover.
        Wall::new(300.0, 300.0, 60.0, 20.0),
        Wall::new(440.0, 300.0, 60.0, 20.0),
        Wall::new(370.0, 500.0, 60.0, 20.0),
        Wall::new(370.0, 100.0, 60.0, 20.0),
        // Side cover.
        Wall::new(150.0, 200.0, 40.0, 100.0),
        Wall::new(610.0, 500.0, 40.0, 100.0),
    ]
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub hits: Vec<(u64, u64)>,
    pub respawned: Vec<u64>,
}

pub struct ArenaSim {
    cfg: ArenaTuning,
    walls: Vec<Wall>,
    players: [Option<ArenaPlayer>; 2],
    // Inputs received since the previous tick, per slot.
    pending: [Vec<ArenaInput>; 2],
    phase: ArenaPhase,
    tick: u64,
}

impl ArenaSim {
    pub fn new(cfg: ArenaTuning) -> Self {
        Self::with_walls(cfg, default_walls())
    }

    pub fn with_walls(cfg: ArenaTuning, walls: Vec<Wall>) -> Self {
        Self {
            cfg,
            walls,
            players: [None, None],
            pending: [Vec::new(), Vec::new()],
            phase: ArenaPhase::Waiting,
            tick: 0,
        }
    }

    /// Seats a player in the first free slot. Playing begins once both slots are filled.
    pub fn add_player(&mut self, id: u64, name: String) -> Option<usize> {
        let slot = self.players.iter().position(Option::is_none)?;
        self.players[slot] = Some(ArenaPlayer::new(id, name, SPAWN_POINTS[slot]));
        if self.players.iter().all(Option::is_some) && self.phase == ArenaPhase::Waiting {
            self.phase = ArenaPhase::Playing;
        }
        Some(slot)
    }

    pub fn slot_of(&self, player_id: u64) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| p.id == player_id))
    }

    pub fn player(&self, player_id: u64) -> Option<&ArenaPlayer> {
        self.players.iter().flatten().find(|p| p.id == player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &ArenaPlayer> {
        self.players.iter().flatten()
    }

    pub fn player_named(&self, name: &str) -> Option<&ArenaPlayer> {
        self.players.iter().flatten().find(|p| p.name == name)
    }

    pub fn set_connected(&mut self, player_id: u64, connected: bool) {
        if let Some(p) = self.players.iter_mut().flatten().find(|p| p.id == player_id) {
            p.connected = connected;
        }
    }

    pub fn queue_input(&mut self, player_id: u64, input: ArenaInput) -> bool {
        if self.phase == ArenaPhase::Ended {
            return false;
        }
        match self.slot_of(player_id) {
            Some(slot) => {
                self.pending[slot].push(input);
                true
            }
            None => false,
        }
    }

    pub fn phase(&self) -> ArenaPhase {
        self.phase
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Play begins the moment the second player is seated.
    pub fn has_started(&self) -> bool {
        self.phase != ArenaPhase::Waiting
    }

    pub fn mark_ended(&mut self) {
        self.phase = ArenaPhase::Ended;
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Advances the simulation by one step of `dt` seconds.
    pub fn tick(&mut self, now: Instant, dt: f32) -> TickReport {
        let mut report = TickReport::default();

        // Respawns run regardless of phase so nobody is left dead after a pause.
        for p in self.players.iter_mut().flatten() {
            if combat::tick_respawn(p, now) {
                report.respawned.push(p.id);
            }
        }

        if self.phase != ArenaPhase::Playing {
            for queue in &mut self.pending {
                queue.clear();
            }
            return report;
        }

        for slot in 0..2 {
            // Only the most recent input since the previous tick is applied.
            let latest = self.pending[slot].pop();
            self.pending[slot].clear();

            let Some(input) = latest else { continue };
            let [first, second] = &mut self.players;
            let (me, other) = if slot == 0 {
                (first, second)
            } else {
                (second, first)
            };
            let Some(me) = me.as_mut() else { continue };
            if !me.alive {
                continue;
            }

            movement::apply_input(me, &input, dt, &self.cfg, &self.walls);

            if input.shoot {
                let outcome = combat::fire(me, other.as_mut(), &self.walls, &self.cfg, now);
                if let combat::ShotOutcome::Hit {
                    shooter_id,
                    victim_id,
                } = outcome
                {
                    report.hits.push((shooter_id, victim_id));
                }
            }
        }

        self.tick += 1;
        report
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            tick: self.tick,
            players: self.players().map(ArenaPlayerSnapshot::from).collect(),
            phase: self.phase,
            winner_id: 0,
            reset_in_ms: 0,
            walls: self.walls.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    fn two_player_sim(walls: Vec<Wall>) -> ArenaSim {
        let mut sim = ArenaSim::with_walls(ArenaTuning::default(), walls);
        sim.add_player(1, "alice".to_string());
        sim.add_player(2, "bob".to_string());
        sim
    }

    fn shoot() -> ArenaInput {
        ArenaInput {
            shoot: true,
            ..ArenaInput::default()
        }
    }

    #[test]
    fn when_second_player_joins_then_phase_becomes_playing() {
        let mut sim = ArenaSim::new(ArenaTuning::default());
        assert_eq!(sim.add_player(1, "a".to_string()), Some(0));
        assert_eq!(sim.phase(), ArenaPhase::Waiting);
        assert!(!sim.has_started());
        assert_eq!(sim.add_player(2, "b".to_string()), Some(1));
        assert_eq!(sim.phase(), ArenaPhase::Playing);
        assert!(sim.has_started());
        assert_eq!(sim.add_player(3, "c".to_string()), None);
    }

    #[test]
    fn when_spawned_then_players_sit_on_fixed_spawn_points() {
        let sim = two_player_sim(default_walls());
        let snap = sim.snapshot();
        assert_eq!((snap.players[0].x, snap.players[0].y), (100.0, 100.0));
        assert_eq!(snap.players[0].yaw, 45.0);
        assert_eq!((snap.players[1].x, snap.players[1].y), (700.0, 700.0));
        assert_eq!(snap.players[1].yaw, 225.0);
        assert_eq!(snap.walls.len(), 6);
    }

    #[test]
    fn when_several_inputs_arrive_in_one_tick_then_only_the_last_is_applied() {
        let mut sim = two_player_sim(Vec::new());
        sim.queue_input(
            1,
            ArenaInput {
                yaw_delta: 90.0,
                ..ArenaInput::default()
            },
        );
        sim.queue_input(
            1,
            ArenaInput {
                yaw_delta: 10.0,
                ..ArenaInput::default()
            },
        );
        sim.tick(Instant::now(), DT);

        let yaw = sim.player(1).map(|p| p.yaw);
        assert_eq!(yaw, Some(55.0));
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn when_facing_opponent_with_clear_line_then_shot_kills_and_respawns_after_delay() {
        let mut sim = two_player_sim(Vec::new());
        // Spawns face each other along the diagonal.
        let start = Instant::now();
        sim.queue_input(1, shoot());
        let report = sim.tick(start, DT);
        assert_eq!(report.hits, vec![(1, 2)]);
        assert_eq!(sim.player(1).map(|p| p.score), Some(1));
        assert_eq!(sim.player(2).map(|p| p.alive), Some(false));

        // Dead players' inputs are dropped.
        sim.queue_input(2, shoot());
        let report = sim.tick(start + Duration::from_millis(500), DT);
        assert!(report.hits.is_empty());

        let report = sim.tick(start + Duration::from_secs(1), DT);
        assert_eq!(report.respawned, vec![2]);
        let bob = sim.player(2).cloned();
        assert!(bob.as_ref().is_some_and(|p| p.alive));
        assert_eq!(bob.map(|p| (p.x, p.y)), Some((700.0, 700.0)));
    }

    #[test]
    fn when_ended_then_inputs_are_ignored() {
        let mut sim = two_player_sim(Vec::new());
        sim.mark_ended();
        assert!(!sim.queue_input(1, shoot()));
        let report = sim.tick(Instant::now(), DT);
        assert!(report.hits.is_empty());
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.snapshot().phase, ArenaPhase::Ended);
    }

    #[test]
    fn when_looking_up_by_name_then_seated_player_is_found() {
        let sim = two_player_sim(Vec::new());
        assert_eq!(sim.player_named("bob").map(|p| p.id), Some(2));
        assert!(sim.player_named("carol").is_none());
    }
}
