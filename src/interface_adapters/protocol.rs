// Wire protocol DTOs and conversions for the public WebSocket.
// Every frame is a flat JSON object with a `type` discriminator and camelCase fields.

use crate::domain::rounds::{
    GameSummary, PlayerSummary, RoundContent, RoundPhase, RoundRecord, RoundView,
};
use crate::domain::{ArenaInput, ArenaPlayerSnapshot, ArenaSnapshot, GameKind, Wall};
use crate::use_cases::types::{LobbyPlayerView, LobbySnapshot, Welcome};
use crate::use_cases::ServerEvent;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Welcome(WelcomeDto),
    Lobby(LobbyMessageDto),
    GameSelected(GameSelectedDto),
    GameStart(GameStartDto),
    // Arena world snapshot.
    Snap(SnapDto),
    SpeedTypeState(RoundStateDto),
    MathSprintState(RoundStateDto),
    ClickSpeedState(RoundStateDto),
    GameSummary(SummaryDto),
    MathGameSummary(SummaryDto),
    ClickGameSummary(SummaryDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Hello(HelloDto),
    Ready(ReadyDto),
    Input(InputDto),
    SelectGame(SelectGameDto),
    SpeedTypeSubmit(SpeedTypeSubmitDto),
    MathSprintSubmit(MathSprintSubmitDto),
    ClickSpeedSubmit(ClickSpeedSubmitDto),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyDto {
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDto {
    #[serde(default)]
    pub seq: u32,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub yaw_delta: f32,
    #[serde(default)]
    pub shoot: bool,
    #[serde(default)]
    pub client_time_ms: i64,
}

impl From<InputDto> for ArenaInput {
    fn from(input: InputDto) -> Self {
        Self {
            seq: input.seq,
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
            yaw_delta: input.yaw_delta,
            shoot: input.shoot,
            client_time_ms: input.client_time_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectGameDto {
    pub game_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTypeSubmitDto {
    pub word: String,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathSprintSubmitDto {
    pub answer: i64,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickSpeedSubmitDto {
    pub time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeDto {
    pub player_id: u64,
    pub room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lobby: Option<LobbyDto>,
}

impl From<Welcome> for WelcomeDto {
    fn from(welcome: Welcome) -> Self {
        Self {
            player_id: welcome.player_id,
            room_id: welcome.room_id.unwrap_or_default(),
            game_type: welcome.game.map(GameKind::as_str),
            lobby: welcome.lobby.map(LobbyDto::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyMessageDto {
    pub lobby: LobbyDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyDto {
    pub players: Vec<LobbyPlayerDto>,
    pub state: &'static str,
    pub selected_game: String,
    pub selected_by: u64,
}

impl From<LobbySnapshot> for LobbyDto {
    fn from(lobby: LobbySnapshot) -> Self {
        Self {
            players: lobby.players.into_iter().map(LobbyPlayerDto::from).collect(),
            state: lobby.phase.as_str(),
            selected_game: lobby
                .selected_game
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
            selected_by: lobby.selected_by.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyPlayerDto {
    pub id: u64,
    pub name: String,
    pub ready: bool,
}

impl From<LobbyPlayerView> for LobbyPlayerDto {
    fn from(p: LobbyPlayerView) -> Self {
        Self {
            id: p.id,
            name: p.name,
            ready: p.ready,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSelectedDto {
    pub game_type: &'static str,
    pub player_id: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartDto {
    pub game_type: &'static str,
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapDto {
    pub tick: u64,
    pub players: Vec<SnapPlayerDto>,
    pub round: SnapRoundDto,
    pub walls: Vec<WallDto>,
}

impl From<&ArenaSnapshot> for SnapDto {
    fn from(snap: &ArenaSnapshot) -> Self {
        Self {
            tick: snap.tick,
            players: snap.players.iter().map(SnapPlayerDto::from).collect(),
            round: SnapRoundDto {
                state: snap.phase.as_str(),
                winner_id: snap.winner_id,
                reset_in_ms: snap.reset_in_ms,
            },
            walls: snap.walls.iter().map(WallDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapPlayerDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
    pub alive: bool,
    pub score: u32,
}

impl From<&ArenaPlayerSnapshot> for SnapPlayerDto {
    fn from(p: &ArenaPlayerSnapshot) -> Self {
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

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapRoundDto {
    pub state: &'static str,
    pub winner_id: u64,
    pub reset_in_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WallDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<&Wall> for WallDto {
    fn from(w: &Wall) -> Self {
        Self {
            x: w.x,
            y: w.y,
            w: w.w,
            h: w.h,
        }
    }
}

/// Round content flattened into the state and history records.
///
/// Only the fields of the room's game are present.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_appear_delay_ms: Option<u64>,
}

impl ContentDto {
    // The math answer is withheld while the round is still being played.
    fn from_content(content: &RoundContent, reveal_answer: bool) -> Self {
        match content {
            RoundContent::Word(word) => Self {
                word: Some(word.clone()),
                ..Self::default()
            },
            RoundContent::Question(q) => Self {
                question: Some(q.to_string()),
                answer: reveal_answer.then_some(q.answer),
                ..Self::default()
            },
            RoundContent::Target(t) => Self {
                target_x: Some(t.x),
                target_y: Some(t.y),
                radius: Some(t.radius),
                target_appear_delay_ms: Some(t.appear_delay_ms),
                ..Self::default()
            },
        }
    }

    // History entries carry only what identifies the round.
    fn history(content: &RoundContent) -> Self {
        match content {
            RoundContent::Target(t) => Self {
                target_x: Some(t.x),
                target_y: Some(t.y),
                ..Self::default()
            },
            other => Self::from_content(other, true),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStateDto {
    pub round: u32,
    #[serde(flatten)]
    pub content: ContentDto,
    pub state: &'static str,
    pub scores: Vec<ScoreDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_result: Option<RoundResultDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_status: Option<Vec<ReadyStatusDto>>,
}

impl From<&RoundView> for RoundStateDto {
    fn from(view: &RoundView) -> Self {
        let reveal = view.phase != RoundPhase::Playing;
        Self {
            round: view.round,
            content: view
                .content
                .as_ref()
                .map(|c| ContentDto::from_content(c, reveal))
                .unwrap_or_default(),
            state: view.phase.as_str(),
            scores: view
                .scores
                .iter()
                .map(|s| ScoreDto {
                    player_id: s.player_id,
                    name: s.name.clone(),
                    score: s.score,
                    time_ms: s.time_ms.unwrap_or(0.0),
                })
                .collect(),
            round_result: view.result.as_ref().map(RoundResultDto::from),
            ready_status: view.ready_status.as_ref().map(|status| {
                status
                    .iter()
                    .map(|&(player_id, ready)| ReadyStatusDto { player_id, ready })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDto {
    pub player_id: u64,
    pub name: String,
    pub score: u32,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultDto {
    pub winner_id: u64,
    pub player1_time_ms: f64,
    pub player2_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i64>,
}

impl From<&RoundRecord> for RoundResultDto {
    fn from(record: &RoundRecord) -> Self {
        Self {
            winner_id: record.winner_id.unwrap_or(0),
            player1_time_ms: record.times_ms[0].unwrap_or(0.0),
            player2_time_ms: record.times_ms[1].unwrap_or(0.0),
            correct_answer: match &record.content {
                RoundContent::Question(q) => Some(q.answer),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyStatusDto {
    pub player_id: u64,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    pub player1_id: u64,
    pub player1_name: String,
    pub player1_score: u32,
    pub player1_avg_time: f64,
    pub player2_id: u64,
    pub player2_name: String,
    pub player2_score: u32,
    pub player2_avg_time: f64,
    pub winner_id: u64,
    pub round_history: Vec<RoundHistoryDto>,
}

impl From<&GameSummary> for SummaryDto {
    fn from(summary: &GameSummary) -> Self {
        let empty = PlayerSummary {
            id: 0,
            name: String::new(),
            score: 0,
            avg_time_ms: None,
        };
        let p1 = summary.players.first().unwrap_or(&empty);
        let p2 = summary.players.get(1).unwrap_or(&empty);
        Self {
            player1_id: p1.id,
            player1_name: p1.name.clone(),
            player1_score: p1.score,
            player1_avg_time: p1.avg_time_ms.unwrap_or(0.0),
            player2_id: p2.id,
            player2_name: p2.name.clone(),
            player2_score: p2.score,
            player2_avg_time: p2.avg_time_ms.unwrap_or(0.0),
            winner_id: summary.winner_id.unwrap_or(0),
            round_history: summary.rounds.iter().map(RoundHistoryDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundHistoryDto {
    pub round_number: u32,
    pub player1_time_ms: f64,
    pub player2_time_ms: f64,
    pub winner_id: u64,
    #[serde(flatten)]
    pub content: ContentDto,
}

impl From<&RoundRecord> for RoundHistoryDto {
    fn from(record: &RoundRecord) -> Self {
        Self {
            round_number: record.round,
            player1_time_ms: record.times_ms[0].unwrap_or(0.0),
            player2_time_ms: record.times_ms[1].unwrap_or(0.0),
            winner_id: record.winner_id.unwrap_or(0),
            content: ContentDto::history(&record.content),
        }
    }
}

impl From<&ServerEvent> for ServerMessage {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::Welcome(welcome) => ServerMessage::Welcome(welcome.clone().into()),
            ServerEvent::Lobby(lobby) => ServerMessage::Lobby(LobbyMessageDto {
                lobby: lobby.clone().into(),
            }),
            ServerEvent::GameSelected { game, player_id } => {
                ServerMessage::GameSelected(GameSelectedDto {
                    game_type: game.as_str(),
                    player_id: *player_id,
                })
            }
            ServerEvent::GameStart { game, room_id } => ServerMessage::GameStart(GameStartDto {
                game_type: game.as_str(),
                room_id: room_id.clone(),
            }),
            ServerEvent::Arena(snap) => ServerMessage::Snap(snap.as_ref().into()),
            ServerEvent::RoundState(view) => {
                let dto = RoundStateDto::from(view.as_ref());
                match view.kind {
                    GameKind::MathSprint => ServerMessage::MathSprintState(dto),
                    GameKind::ClickSpeed => ServerMessage::ClickSpeedState(dto),
                    GameKind::SpeedType | GameKind::Arena => ServerMessage::SpeedTypeState(dto),
                }
            }
            ServerEvent::Summary(summary) => {
                let dto = SummaryDto::from(summary.as_ref());
                match summary.kind {
                    GameKind::MathSprint => ServerMessage::MathGameSummary(dto),
                    GameKind::ClickSpeed => ServerMessage::ClickGameSummary(dto),
                    GameKind::SpeedType | GameKind::Arena => ServerMessage::GameSummary(dto),
                }
            }
        }
    }
}
