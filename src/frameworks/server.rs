// Runtime bootstrap: logging, routing, and process-wide state.

use crate::domain::tuning::{EnemyTuning, MatchTuning};
use crate::domain::words::WordPool;
use crate::frameworks::config;
use crate::interface_adapters::clients::scores::ScoreboardClient;
use crate::interface_adapters::net::{
    activate_match, create_match_handler, create_pvp_handler, player_state_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::match_loop::MatchSchedule;
use crate::use_cases::session::{MatchRegistry, SessionSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().with_current_span(true).init(),
        _ => builder.compact().init(),
    }

    // Panics land in the log stream, not on a bare stderr.
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the engine on an already-bound listener. Tests bind their own
/// ephemeral ports and call this directly, skipping env configuration.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/matches", post(create_match_handler))
        .route("/pvp", post(create_pvp_handler))
        .route("/players/{player_id}", get(player_state_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let scoreboard_url = config::scoreboard_service_url();
    let scoreboard_timeout = config::scoreboard_timeout();
    let scoreboard = ScoreboardClient::new(scoreboard_url.clone(), scoreboard_timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize scoreboard client: {e}")))?;
    let scoreboard = Arc::new(scoreboard);
    tracing::debug!(
        scoreboard_url = %scoreboard_url,
        scoreboard_timeout_ms = scoreboard_timeout.as_millis(),
        "scoreboard client configured"
    );

    // The registry owns every active match event-loop task.
    let registry = Arc::new(MatchRegistry::new(SessionSettings {
        command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
        peer_channel_capacity: config::PEER_CHANNEL_CAPACITY,
        notice_broadcast_capacity: config::NOTICE_BROADCAST_CAPACITY,
        snapshot_broadcast_capacity: config::SNAPSHOT_BROADCAST_CAPACITY,
        schedule: MatchSchedule {
            countdown: config::COUNTDOWN_INTERVAL,
            spawn: config::SPAWN_INTERVAL,
            motion: config::MOTION_INTERVAL,
        },
        rules: MatchTuning::default(),
        enemies: EnemyTuning::default(),
        dictionary: WordPool::default_dictionary(),
    }));

    // An always-available practice match, so a bare client can play without
    // creating a session first.
    let default_match_id = config::DEFAULT_MATCH_ID.to_string();
    let practice = registry
        .create_match(default_match_id.clone(), None, None)
        .await
        .map_err(|e| std::io::Error::other(format!("practice match should initialize: {e:?}")))?;
    activate_match(&practice, scoreboard.clone());

    Ok(Arc::new(AppState {
        registry,
        default_match_id: Arc::from(default_match_id.as_str()),
        scoreboard,
    }))
}
