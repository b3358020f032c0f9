// Long-running game tasks: the shared arena ticker and one loop per round room.

use super::hub::{RoundStep, SharedHub};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Advances every arena room at a fixed step and retires rooms whose held seats expired.
pub async fn arena_tick_task(hub: SharedHub, tick_interval: Duration) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let dt = tick_interval.as_secs_f32();

    loop {
        interval.tick().await;
        let now = Instant::now().into_std();
        let mut guard = hub.lock().await;
        guard.tick_arenas(now, dt);
        guard.expire_vacated_rooms(now);
    }
}

pub fn spawn_round_loop(hub: SharedHub, room_id: String) {
    tokio::spawn(round_loop(hub, room_id));
}

/// Drives one round room until it finishes, disappears, or loses every connection.
///
/// State is re-validated under the lock on every pass; waits happen outside it.
pub async fn round_loop(hub: SharedHub, room_id: String) {
    info!(%room_id, "round loop started");
    loop {
        let now = Instant::now().into_std();
        let step = hub.lock().await.drive_round(&room_id, now);

        match step {
            RoundStep::Exit => break,
            RoundStep::Wait {
                until,
                wake,
                mut cancel,
            } => {
                tokio::select! {
                    _ = tokio::time::sleep_until(Instant::from_std(until)) => {}
                    _ = wake.notified() => {}
                    // Fires when the room is garbage-collected (or its sender dropped).
                    _ = cancel.changed() => break,
                }
            }
        }
    }
    debug!(%room_id, "round loop stopped");
}
