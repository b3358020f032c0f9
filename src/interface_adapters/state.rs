use crate::domain::SessionVerifier;
use crate::use_cases::{HubSettings, SharedHub};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Lobby, rooms and connection registry behind one lock.
    pub hub: SharedHub,
    // Resolves session tokens into a name/room code pair.
    pub verifier: Arc<dyn SessionVerifier>,
    // Pacing copied out of the hub so handlers need not lock for it.
    pub settings: HubSettings,
}
