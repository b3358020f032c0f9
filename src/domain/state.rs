// Domain-level arena entities and input/snapshot types.

use std::time::Instant;

/// Axis-aligned rectangle that blocks movement and shots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Wall {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArenaInput {
    pub seq: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Degrees to add to the current yaw.
    pub yaw_delta: f32,
    pub shoot: bool,
    pub client_time_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaPhase {
    Waiting,
    Playing,
    Ended,
}

impl ArenaPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ArenaPhase::Waiting => "waiting",
            ArenaPhase::Playing => "playing",
            ArenaPhase::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArenaPlayer {
    pub id: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Degrees in [0, 360).
    pub yaw: f32,
    pub alive: bool,
    pub score: u32,
    pub connected: bool,
    pub spawn: SpawnPoint,

    // Combat timers (do not serialize to clients).
    pub last_shot_at: Option<Instant>,
    pub respawn_at: Option<Instant>,
}

impl ArenaPlayer {
    pub fn new(id: u64, name: String, spawn: SpawnPoint) -> Self {
        Self {
            id,
            name,
            x: spawn.x,
            y: spawn.y,
            yaw: spawn.yaw,
            alive: true,
            score: 0,
            connected: true,
            spawn,
            last_shot_at: None,
            respawn_at: None,
        }
    }

    pub fn respawn(&mut self) {
        self.x = self.spawn.x;
        self.y = self.spawn.y;
        self.yaw = self.spawn.yaw;
        self.alive = true;
        self.respawn_at = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArenaPlayerSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
    pub alive: bool,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArenaSnapshot {
    pub tick: u64,
    pub players: Vec<ArenaPlayerSnapshot>,
    pub phase: ArenaPhase,
    /// Always 0; arena matches have no winner.
    pub winner_id: u64,
    pub reset_in_ms: u64,
    pub walls: Vec<Wall>,
}

impl From<&ArenaPlayer> for ArenaPlayerSnapshot {
    fn from(p: &ArenaPlayer) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            yaw: p.yaw,
            alive: p.alive,
            score: p.score,
        }
    }
}
