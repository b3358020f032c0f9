pub mod arena;
pub mod rounds;

pub use arena::ArenaTuning;
pub use rounds::RoundTuning;
