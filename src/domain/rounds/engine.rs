use crate::domain::GameKind;
use crate::domain::rounds::click_speed::ClickTarget;
use crate::domain::rounds::math_sprint::MathQuestion;
use crate::domain::tuning::RoundTuning;
use rand::RngCore;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Waiting,
    Ready,
    Playing,
    Results,
    Finished,
}

impl RoundPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundPhase::Waiting => "waiting",
            RoundPhase::Ready => "ready",
            RoundPhase::Playing => "playing",
            RoundPhase::Results => "results",
            RoundPhase::Finished => "finished",
        }
    }
}

/// What players race against in one round.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundContent {
    Word(String),
    Question(MathQuestion),
    Target(ClickTarget),
}

impl RoundContent {
    pub fn appear_delay(&self) -> Duration {
        match self {
            RoundContent::Target(target) => Duration::from_millis(target.appear_delay_ms),
            _ => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Word(String),
    Answer(i64),
    Click,
}

/// Content generation and validation for one round-based game.
pub trait RoundVariant: Send + Sync {
    fn kind(&self) -> GameKind;
    fn round_cap(&self) -> u32;
    fn generate(&self, rng: &mut dyn RngCore) -> RoundContent;
    fn validate(&self, content: &RoundContent, submission: &Submission) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundError {
    WrongState,
    UnknownPlayer,
    InvalidSubmission,
    AlreadySubmitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: u64,
    pub name: String,
    pub score: u32,
    pub last_time_ms: Option<f64>,
    pub connected: bool,
    pub ready_for_next: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub round: u32,
    /// Per slot; `None` when the player never submitted.
    pub times_ms: [Option<f64>; 2],
    /// `None` on a tie.
    pub winner_id: Option<u64>,
    pub content: RoundContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Recorded,
    Resolved(RoundRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    pub player_id: u64,
    pub name: String,
    pub score: u32,
    pub time_ms: Option<f64>,
}

/// Point-in-time room state pushed to both players.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundView {
    pub kind: GameKind,
    pub round: u32,
    pub phase: RoundPhase,
    pub content: Option<RoundContent>,
    pub scores: Vec<ScoreLine>,
    pub result: Option<RoundRecord>,
    pub ready_status: Option<Vec<(u64, bool)>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub id: u64,
    pub name: String,
    pub score: u32,
    /// Mean over the rounds this player actually submitted in.
    pub avg_time_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub kind: GameKind,
    pub players: Vec<PlayerSummary>,
    pub winner_id: Option<u64>,
    pub rounds: Vec<RoundRecord>,
}

pub struct RoundEngine {
    variant: Box<dyn RoundVariant>,
    cfg: RoundTuning,
    players: [Option<Participant>; 2],
    phase: RoundPhase,
    round: u32,
    content: Option<RoundContent>,
    started_at: Option<Instant>,
    submissions: [Option<f64>; 2],
    history: Vec<RoundRecord>,
    ended: bool,
}

impl RoundEngine {
    pub fn new(variant: Box<dyn RoundVariant>, cfg: RoundTuning) -> Self {
        Self {
            variant,
            cfg,
            players: [None, None],
            phase: RoundPhase::Waiting,
            round: 0,
            content: None,
            started_at: None,
            submissions: [None, None],
            history: Vec::new(),
            ended: false,
        }
    }

    pub fn kind(&self) -> GameKind {
        self.variant.kind()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn content(&self) -> Option<&RoundContent> {
        self.content.as_ref()
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Slot 0 fills first; the room becomes ready once both slots are taken.
    pub fn add_player(&mut self, id: u64, name: String) -> Option<usize> {
        let slot = self.players.iter().position(Option::is_none)?;
        self.players[slot] = Some(Participant {
            id,
            name,
            score: 0,
            last_time_ms: None,
            connected: true,
            ready_for_next: false,
        });
        if self.players.iter().all(Option::is_some) && self.phase == RoundPhase::Waiting {
            self.phase = RoundPhase::Ready;
        }
        Some(slot)
    }

    pub fn players(&self) -> impl Iterator<Item = &Participant> {
        self.players.iter().flatten()
    }

    pub fn player_named(&self, name: &str) -> Option<&Participant> {
        self.players().find(|p| p.name == name)
    }

    fn slot_of(&self, player_id: u64) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| p.id == player_id))
    }

    pub fn set_connected(&mut self, player_id: u64, connected: bool) {
        if let Some(p) = self.players.iter_mut().flatten().find(|p| p.id == player_id) {
            p.connected = connected;
        }
    }

    pub fn start_round(&mut self, now: Instant, rng: &mut dyn RngCore) -> Result<(), RoundError> {
        if self.ended || !matches!(self.phase, RoundPhase::Ready | RoundPhase::Results) {
            return Err(RoundError::WrongState);
        }

        self.round += 1;
        self.content = Some(self.variant.generate(rng));
        self.submissions = [None, None];
        for p in self.players.iter_mut().flatten() {
            p.ready_for_next = false;
        }
        self.started_at = Some(now);
        self.phase = RoundPhase::Playing;
        Ok(())
    }

    /// Records a player's claimed elapsed time; the first valid submission per round stands.
    pub fn submit(
        &mut self,
        player_id: u64,
        submission: &Submission,
        claimed_ms: f64,
        now: Instant,
    ) -> Result<SubmitOutcome, RoundError> {
        if self.phase != RoundPhase::Playing {
            return Err(RoundError::WrongState);
        }
        let slot = self.slot_of(player_id).ok_or(RoundError::UnknownPlayer)?;
        let content = self.content.as_ref().ok_or(RoundError::WrongState)?;
        if !self.variant.validate(content, submission) {
            return Err(RoundError::InvalidSubmission);
        }
        if self.submissions[slot].is_some() {
            return Err(RoundError::AlreadySubmitted);
        }

        self.submissions[slot] = Some(self.effective_time(claimed_ms, now));
        if self.submissions.iter().all(Option::is_some) {
            return Ok(SubmitOutcome::Resolved(self.resolve()));
        }
        Ok(SubmitOutcome::Recorded)
    }

    fn effective_time(&self, claimed_ms: f64, now: Instant) -> f64 {
        let timeout = self.cfg.timeout_ms;
        if !claimed_ms.is_finite() || claimed_ms < 0.0 || claimed_ms > timeout {
            return timeout;
        }
        let elapsed_ms = self
            .started_at
            .map(|at| now.saturating_duration_since(at).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        claimed_ms.min(elapsed_ms + self.cfg.submit_tolerance_ms)
    }

    /// Resolves a round whose deadline passed; missing submissions count as the timeout.
    pub fn resolve_timeouts(&mut self) -> Option<RoundRecord> {
        (self.phase == RoundPhase::Playing).then(|| self.resolve())
    }

    fn resolve(&mut self) -> RoundRecord {
        let timeout = self.cfg.timeout_ms;
        let [a, b] = self.submissions.map(|t| t.unwrap_or(timeout));
        let winner_slot = if a < b {
            Some(0)
        } else if b < a {
            Some(1)
        } else {
            None
        };

        let winner_id = winner_slot
            .and_then(|slot| self.players[slot].as_mut())
            .map(|p| {
                p.score += 1;
                p.id
            });
        for (slot, p) in self.players.iter_mut().enumerate() {
            if let Some(p) = p {
                p.last_time_ms = self.submissions[slot];
            }
        }

        let record = RoundRecord {
            round: self.round,
            times_ms: self.submissions,
            winner_id,
            content: self
                .content
                .clone()
                .unwrap_or(RoundContent::Word(String::new())),
        };
        self.history.push(record.clone());
        self.phase = RoundPhase::Results;
        record
    }

    pub fn set_ready_for_next(&mut self, player_id: u64, ready: bool) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Results {
            return Err(RoundError::WrongState);
        }
        let slot = self.slot_of(player_id).ok_or(RoundError::UnknownPlayer)?;
        if let Some(p) = self.players[slot].as_mut() {
            p.ready_for_next = ready;
        }
        Ok(())
    }

    pub fn all_ready_for_next(&self) -> bool {
        self.phase == RoundPhase::Results
            && self
                .players
                .iter()
                .all(|p| p.as_ref().is_some_and(|p| p.ready_for_next))
    }

    pub fn check_game_end(&self) -> bool {
        self.ended || self.round >= self.variant.round_cap()
    }

    /// Moves to `finished`; used both for the natural end and an abandoned room.
    pub fn finish(&mut self) {
        self.ended = true;
        self.phase = RoundPhase::Finished;
    }

    pub fn view(&self) -> RoundView {
        let result = match self.phase {
            RoundPhase::Results | RoundPhase::Finished => self.history.last().cloned(),
            _ => None,
        };
        let ready_status = (self.phase == RoundPhase::Results)
            .then(|| self.players().map(|p| (p.id, p.ready_for_next)).collect());

        RoundView {
            kind: self.kind(),
            round: self.round,
            phase: self.phase,
            content: self.content.clone(),
            scores: self
                .players()
                .map(|p| ScoreLine {
                    player_id: p.id,
                    name: p.name.clone(),
                    score: p.score,
                    time_ms: p.last_time_ms,
                })
                .collect(),
            result,
            ready_status,
        }
    }

    /// `None` until at least one round has resolved.
    pub fn summarize(&self) -> Option<GameSummary> {
        if self.history.is_empty() {
            return None;
        }

        let players = self
            .players
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| p.as_ref().map(|p| (slot, p)))
            .map(|(slot, p)| {
                let times: Vec<f64> = self
                    .history
                    .iter()
                    .filter_map(|r| r.times_ms[slot])
                    .collect();
                let avg_time_ms =
                    (!times.is_empty()).then(|| times.iter().sum::<f64>() / times.len() as f64);
                PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    score: p.score,
                    avg_time_ms,
                }
            })
            .collect();

        let winner_id = match &self.players {
            [Some(a), Some(b)] if a.score > b.score => Some(a.id),
            [Some(a), Some(b)] if b.score > a.score => Some(b.id),
            _ => None,
        };

        Some(GameSummary {
            kind: self.kind(),
            players,
            winner_id,
            rounds: self.history.clone(),
        })
    }
}
