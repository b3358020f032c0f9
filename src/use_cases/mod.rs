// Use cases layer: lobby, rooms and connection workflows for the session server.

pub mod game;
pub mod hub;
pub mod lobby;
pub mod registry;
pub mod rooms;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use hub::{Assignment, RoundStep, SessionHub, SharedHub};
pub use types::{Binding, ConnId, HubSettings, PlayerId, ServerEvent};
