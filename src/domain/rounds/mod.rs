// Round-based duels: one engine, three content variants.

pub mod click_speed;
pub mod engine;
pub mod math_sprint;
pub mod speed_type;

pub use click_speed::{ClickSpeed, ClickTarget};
pub use engine::{
    GameSummary, Participant, PlayerSummary, RoundContent, RoundEngine, RoundError, RoundPhase,
    RoundRecord, RoundVariant, RoundView, ScoreLine, SubmitOutcome, Submission,
};
pub use math_sprint::{MathOp, MathQuestion, MathSprint};
pub use speed_type::SpeedType;

use crate::domain::GameKind;

/// Variant for a round-based game kind; `None` for the arena.
pub fn variant_for(kind: GameKind) -> Option<Box<dyn RoundVariant>> {
    match kind {
        GameKind::SpeedType => Some(Box::new(SpeedType)),
        GameKind::MathSprint => Some(Box::new(MathSprint)),
        GameKind::ClickSpeed => Some(Box::new(ClickSpeed)),
        GameKind::Arena => None,
    }
}
