use crate::domain::GameKind;
use crate::domain::rounds::engine::{RoundContent, RoundVariant, Submission};
use rand::RngCore;
use rand::seq::SliceRandom;

pub const WORDS: &[&str] = &[
    "hello", "world", "quick", "brown", "fox", "jumps", "lazy", "dog", "speed", "type",
    "challenge", "keyboard", "typing", "skill", "test", "computer", "mouse", "screen", "button",
    "click", "enter", "practice", "improve", "accuracy", "words", "random", "select", "game",
];

/// Type the shown word first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedType;

impl RoundVariant for SpeedType {
    fn kind(&self) -> GameKind {
        GameKind::SpeedType
    }

    fn round_cap(&self) -> u32 {
        5
    }

    fn generate(&self, rng: &mut dyn RngCore) -> RoundContent {
        let word = WORDS.choose(rng).copied().unwrap_or("hello");
        RoundContent::Word(word.to_string())
    }

    fn validate(&self, content: &RoundContent, submission: &Submission) -> bool {
        match (content, submission) {
            (RoundContent::Word(expected), Submission::Word(typed)) => expected == typed,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn when_generating_then_word_comes_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            match SpeedType.generate(&mut rng) {
                RoundContent::Word(word) => assert!(WORDS.contains(&word.as_str())),
                other => panic!("unexpected content {other:?}"),
            }
        }
    }

    #[test]
    fn when_word_differs_then_submission_is_invalid() {
        let content = RoundContent::Word("fox".to_string());
        assert!(SpeedType.validate(&content, &Submission::Word("fox".to_string())));
        assert!(!SpeedType.validate(&content, &Submission::Word("Fox".to_string())));
        assert!(!SpeedType.validate(&content, &Submission::Click));
    }
}
