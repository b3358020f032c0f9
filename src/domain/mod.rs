// Domain layer: core simulation types and rules.

pub mod arena;
pub mod games;
pub mod ports;
pub mod rounds;
pub mod state;
pub mod systems;
pub mod tuning;

pub use arena::ArenaSim;
pub use games::GameKind;
pub use ports::{SessionVerifier, VerifiedSession, VerifyError};
pub use state::{ArenaInput, ArenaPhase, ArenaPlayerSnapshot, ArenaSnapshot, Wall};
