use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Notify, mpsc};

use crate::domain::tuning::{ArenaTuning, RoundTuning};
use crate::use_cases::hub::SessionHub;
use crate::use_cases::types::{ConnId, HubSettings, ServerEvent};

// Production pacing; async tests run with paused time.
pub(crate) fn settings() -> HubSettings {
    HubSettings {
        outbound_capacity: 256,
        tick_interval: Duration::from_millis(1000 / 60),
        snapshot_interval: Duration::from_millis(1000 / 60),
        hello_timeout: Duration::from_secs(5),
        countdown: Duration::from_secs(3),
        between_rounds: Duration::from_secs(3),
        round_timeout: Duration::from_secs(10),
        seat_hold: Duration::from_secs(60),
        arena: ArenaTuning::default(),
        rounds: RoundTuning::default(),
    }
}

pub(crate) fn seeded_hub() -> SessionHub {
    SessionHub::with_rng(settings(), StdRng::seed_from_u64(11))
}

// One fake transport: the outbound queue and the replacement signal.
pub(crate) struct TestConn {
    pub conn_id: ConnId,
    pub rx: mpsc::Receiver<ServerEvent>,
    pub replaced: Arc<Notify>,
}

impl TestConn {
    pub(crate) fn attach(hub: &mut SessionHub, conn_id: ConnId) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let replaced = Arc::new(Notify::new());
        hub.attach(conn_id, tx, replaced.clone());
        Self {
            conn_id,
            rx,
            replaced,
        }
    }

    pub(crate) fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
