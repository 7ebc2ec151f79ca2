use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("DEADKEYS_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn scoreboard_service_url() -> String {
    env::var("SCOREBOARD_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3002".to_string())
}

pub fn scoreboard_timeout() -> Duration {
    let millis = env::var("SCOREBOARD_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 256;
pub const PEER_CHANNEL_CAPACITY: usize = 64;
pub const NOTICE_BROADCAST_CAPACITY: usize = 128;
pub const SNAPSHOT_BROADCAST_CAPACITY: usize = 128;

// The three match tickers: one-second countdown, spawn cadence, motion step.
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);
pub const SPAWN_INTERVAL: Duration = Duration::from_secs(2);
pub const MOTION_INTERVAL: Duration = Duration::from_millis(50);

// Match every client attaches to when it doesn't name one.
pub const DEFAULT_MATCH_ID: &str = "practice";
