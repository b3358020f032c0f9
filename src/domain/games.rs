// Game variants a lobby can select.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    SpeedType,
    MathSprint,
    ClickSpeed,
    Arena,
}

impl GameKind {
    pub const ALL: [GameKind; 4] = [
        GameKind::SpeedType,
        GameKind::MathSprint,
        GameKind::ClickSpeed,
        GameKind::Arena,
    ];

    /// Wire name, also used as the room id prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::SpeedType => "speedtype",
            GameKind::MathSprint => "mathsprint",
            GameKind::ClickSpeed => "clickspeed",
            GameKind::Arena => "arena",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    pub fn is_round_based(self) -> bool {
        !matches!(self, GameKind::Arena)
    }
}
