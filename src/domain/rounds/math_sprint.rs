use crate::domain::GameKind;
use crate::domain::rounds::engine::{RoundContent, RoundVariant, Submission};
use rand::{Rng, RngCore};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl MathOp {
    fn symbol(self) -> char {
        match self {
            MathOp::Add => '+',
            MathOp::Subtract => '-',
            MathOp::Multiply => '×',
            MathOp::Divide => '÷',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathQuestion {
    pub left: i64,
    pub right: i64,
    pub op: MathOp,
    pub answer: i64,
}

impl fmt::Display for MathQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

impl MathQuestion {
    /// Add/subtract use operands up to 999; multiply/divide stay within the 12x12 table.
    /// Subtraction never goes negative and division is always exact.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        match rng.gen_range(0..4) {
            0 => {
                let left = rng.gen_range(1..=999);
                let right = rng.gen_range(1..=999);
                Self {
                    left,
                    right,
                    op: MathOp::Add,
                    answer: left + right,
                }
            }
            1 => {
                let left = rng.gen_range(1..=999);
                let right = rng.gen_range(1..=left);
                Self {
                    left,
                    right,
                    op: MathOp::Subtract,
                    answer: left - right,
                }
            }
            2 => {
                let left = rng.gen_range(1..=12);
                let right = rng.gen_range(1..=12);
                Self {
                    left,
                    right,
                    op: MathOp::Multiply,
                    answer: left * right,
                }
            }
            _ => {
                let right = rng.gen_range(1..=12);
                let answer = rng.gen_range(1..=12);
                Self {
                    left: right * answer,
                    right,
                    op: MathOp::Divide,
                    answer,
                }
            }
        }
    }
}

/// Answer the arithmetic question first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathSprint;

impl RoundVariant for MathSprint {
    fn kind(&self) -> GameKind {
        GameKind::MathSprint
    }

    fn round_cap(&self) -> u32 {
        10
    }

    fn generate(&self, rng: &mut dyn RngCore) -> RoundContent {
        RoundContent::Question(MathQuestion::random(rng))
    }

    fn validate(&self, content: &RoundContent, submission: &Submission) -> bool {
        match (content, submission) {
            (RoundContent::Question(q), Submission::Answer(answer)) => q.answer == *answer,
            _ => false,
        }
    }
}
