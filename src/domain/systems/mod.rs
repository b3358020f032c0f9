pub mod collision;
pub mod combat;
pub mod movement;
pub mod raycast;
