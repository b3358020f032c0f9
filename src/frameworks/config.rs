use crate::domain::tuning::{ArenaTuning, RoundTuning};
use crate::use_cases::HubSettings;
use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("VERSUS_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn bind_addr() -> IpAddr {
    env::var("VERSUS_BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn auth_service_url() -> String {
    env::var("AUTH_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3002".to_string())
}

pub fn auth_verify_timeout() -> Duration {
    let millis = env::var("AUTH_VERIFY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_micros(1_000_000 / 60);
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_micros(1_000_000 / 60);
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

pub const ROUND_COUNTDOWN: Duration = Duration::from_secs(3);
pub const BETWEEN_ROUNDS: Duration = Duration::from_secs(3);
pub const ROUND_TIMEOUT: Duration = Duration::from_secs(10);

// How long an unstarted room keeps its seats after every player has dropped.
pub const SEAT_HOLD: Duration = Duration::from_secs(60);

pub fn hub_settings() -> HubSettings {
    HubSettings {
        outbound_capacity: OUTBOUND_QUEUE_CAPACITY,
        tick_interval: TICK_INTERVAL,
        snapshot_interval: SNAPSHOT_INTERVAL,
        hello_timeout: HELLO_TIMEOUT,
        countdown: ROUND_COUNTDOWN,
        between_rounds: BETWEEN_ROUNDS,
        round_timeout: ROUND_TIMEOUT,
        seat_hold: SEAT_HOLD,
        arena: ArenaTuning::default(),
        rounds: RoundTuning {
            timeout_ms: ROUND_TIMEOUT.as_secs_f64() * 1000.0,
            ..RoundTuning::default()
        },
    }
}
