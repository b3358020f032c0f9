use crate::domain::GameKind;
use crate::domain::rounds::engine::{RoundContent, RoundVariant, Submission};
use rand::{Rng, RngCore};

/// Target position in percent of the play field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickTarget {
    pub x: f64,
    pub y: f64,
    /// Pixels.
    pub radius: f64,
    /// Server-chosen delay before the target becomes visible.
    pub appear_delay_ms: u64,
}

impl ClickTarget {
    pub fn random(rng: &mut dyn RngCore) -> Self {
        // 10..90 percent keeps the whole target on screen.
        Self {
            x: f64::from(rng.gen_range(10_u32..90)),
            y: f64::from(rng.gen_range(10_u32..90)),
            radius: 30.0,
            appear_delay_ms: rng.gen_range(2000..4000),
        }
    }
}

/// Click the target first once it appears.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickSpeed;

impl RoundVariant for ClickSpeed {
    fn kind(&self) -> GameKind {
        GameKind::ClickSpeed
    }

    fn round_cap(&self) -> u32 {
        10
    }

    fn generate(&self, rng: &mut dyn RngCore) -> RoundContent {
        RoundContent::Target(ClickTarget::random(rng))
    }

    fn validate(&self, content: &RoundContent, submission: &Submission) -> bool {
        // Clicks carry no content to check.
        matches!(
            (content, submission),
            (RoundContent::Target(_), Submission::Click)
        )
    }
}
