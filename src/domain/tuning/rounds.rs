/// Gameplay tuning shared by the round-based variants.
#[derive(Debug, Clone, Copy)]
pub struct RoundTuning {
    /// Slack granted on top of the server-measured elapsed time when clamping claims.
    pub submit_tolerance_ms: f64,

    /// Time recorded for a missing or out-of-range submission.
    pub timeout_ms: f64,
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self {
            submit_tolerance_ms: 1000.0,
            timeout_ms: 10_000.0,
        }
    }
}
