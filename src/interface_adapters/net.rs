use crate::interface_adapters::clients::scores::{ScoreboardClient, ScoreboardError};
use crate::interface_adapters::protocol::{
    ClientMessage, MatchSnapshotDto, NoticeDto, ServerMessage,
};
use crate::interface_adapters::pvp;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::fresh_id;
use crate::use_cases::match_core::PvpRole;
use crate::use_cases::session::{MatchHandle, SessionError};
use crate::use_cases::types::{MatchCommand, MatchSnapshot, Notification};
use futures_util::sink::SinkExt;

use axum::{
    Error,
    extract::{
        Json, Path, Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Connection lifecycle failures, split so the loop can pick a policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandsClosed,
    SnapshotsClosed,
    NoticesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    // Human-readable error string for consistent JSON error payloads.
    error: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct MatchInitRequest {
    // Optional match id; when omitted the server generates one.
    #[serde(default)]
    match_id: Option<String>,
    // Player identity reported to the scoreboard at match end.
    #[serde(default)]
    player: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct MatchInitResponse {
    match_id: String,
    chain_id: String,
    player: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PvpInitRequest {
    #[serde(default)]
    host_id: Option<String>,
    #[serde(default)]
    joiner_id: Option<String>,
    #[serde(default)]
    host_player: Option<String>,
    #[serde(default)]
    joiner_player: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct PvpInitResponse {
    host: MatchInitResponse,
    joiner: MatchInitResponse,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct MatchQuery {
    // The match id the client wants to attach to.
    #[serde(default)]
    match_id: Option<String>,
}

/// Serializes each snapshot once and broadcasts the shared bytes, keeping
/// the latest copy around for lag recovery.
pub async fn snapshot_serializer(
    mut snapshot_rx: watch::Receiver<MatchSnapshot>,
    snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        let snapshot = snapshot_rx.borrow_and_update().clone();
        let msg = ServerMessage::Snapshot(MatchSnapshotDto::from(snapshot));
        match serde_json::to_string(&msg) {
            Ok(txt) => {
                let bytes = Utf8Bytes::from(txt);
                let _ = snapshot_latest_tx.send(bytes.clone());
                let _ = snapshot_bytes_tx.send(bytes);
            }
            Err(e) => error!(error = ?e, "failed to serialize snapshot"),
        }
        if snapshot_rx.changed().await.is_err() {
            debug!("snapshot channel closed; serializer exiting");
            break;
        }
    }
}

/// Starts the background services every live match needs: the snapshot
/// serializer and the match-end score reporter.
pub fn activate_match(handle: &MatchHandle, scoreboard: Arc<ScoreboardClient>) {
    tokio::spawn(snapshot_serializer(
        handle.snapshot_tx.subscribe(),
        handle.snapshot_bytes_tx.clone(),
        handle.snapshot_latest_tx.clone(),
    ));
    crate::interface_adapters::clients::scores::spawn_score_reporter(
        handle.snapshot_tx.subscribe(),
        scoreboard,
        handle.player.clone(),
    );
}

pub async fn create_match_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MatchInitRequest>,
) -> impl IntoResponse {
    let match_id = payload
        .match_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("match-{}", fresh_id()));

    match state
        .registry
        .create_match(match_id.clone(), payload.player, None)
        .await
    {
        Ok(handle) => {
            activate_match(&handle, state.scoreboard.clone());
            let body = MatchInitResponse {
                match_id,
                chain_id: handle.chain_id.to_string(),
                player: handle.player.to_string(),
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(SessionError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "match already exists".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = ?e, "unexpected match creation failure");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn create_pvp_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PvpInitRequest>,
) -> impl IntoResponse {
    let host_id = payload
        .host_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("pvp-host-{}", fresh_id()));
    let joiner_id = payload
        .joiner_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("pvp-joiner-{}", fresh_id()));

    let host = match state
        .registry
        .create_match(host_id.clone(), payload.host_player, Some(PvpRole::Host))
        .await
    {
        Ok(handle) => handle,
        Err(e) => return pvp_creation_error(e),
    };
    let joiner = match state
        .registry
        .create_match(
            joiner_id.clone(),
            payload.joiner_player,
            Some(PvpRole::Joiner),
        )
        .await
    {
        Ok(handle) => handle,
        Err(e) => return pvp_creation_error(e),
    };

    if let Err(e) = pvp::link_loopback(&host, &joiner).await {
        error!(error = ?e, "failed to link fresh pvp matches");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    activate_match(&host, state.scoreboard.clone());
    activate_match(&joiner, state.scoreboard.clone());

    let body = PvpInitResponse {
        host: MatchInitResponse {
            match_id: host_id,
            chain_id: host.chain_id.to_string(),
            player: host.player.to_string(),
        },
        joiner: MatchInitResponse {
            match_id: joiner_id,
            chain_id: joiner.chain_id.to_string(),
            player: joiner.player.to_string(),
        },
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

fn pvp_creation_error(e: SessionError) -> axum::response::Response {
    match e {
        SessionError::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "match already exists".to_string(),
            }),
        )
            .into_response(),
        other => {
            error!(error = ?other, "unexpected pvp creation failure");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Read-through proxy of the persistence boundary, surfacing failures as
/// an inline error payload instead of breaking the view.
pub async fn player_state_handler(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> impl IntoResponse {
    match state.scoreboard.fetch_player_state(&player_id).await {
        Ok(player_state) => (StatusCode::OK, Json(player_state)).into_response(),
        Err(ScoreboardError::UnknownPlayer) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "unknown player".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(player_id, error = ?e, "scoreboard lookup failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: "scoreboard unavailable".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> impl IntoResponse {
    let match_id = query
        .match_id
        .unwrap_or_else(|| state.default_match_id.to_string());

    let handle = match state.registry.get_match(&match_id).await {
        Some(handle) => handle,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    ws.on_upgrade(|socket| handle_socket(socket, handle))
}

async fn handle_socket(mut socket: WebSocket, handle: MatchHandle) {
    // Separate connection id for correlating logs across one socket's life.
    let conn_id = fresh_id();
    let span = info_span!("conn", conn_id, match_id = %handle.match_id);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &handle).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!("view connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    command_tx: mpsc::Sender<MatchCommand>,
    snapshot_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    snapshot_latest_rx: watch::Receiver<Utf8Bytes>,
    notice_rx: broadcast::Receiver<Notification>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_command_full_log: Instant,
    last_snapshot_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    handle: &MatchHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no published update can slip past.
    let snapshot_bytes_rx = handle.snapshot_bytes_tx.subscribe();
    let snapshot_latest_rx = handle.snapshot_latest_tx.subscribe();
    let notice_rx = handle.notice_tx.subscribe();

    // Tell the view which match it is attached to and which address its
    // opponent would pair against.
    let identity = ServerMessage::Identity {
        match_id: handle.match_id.to_string(),
        chain_id: handle.chain_id.to_string(),
    };
    send_message(socket, &identity).await?;

    // Catch the view up immediately rather than waiting for the next tick.
    let latest = snapshot_latest_rx.borrow().clone();
    if !latest.is_empty() {
        socket
            .send(Message::Text(latest))
            .await
            .map_err(NetError::Ws)?;
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        command_tx: handle.command_tx.clone(),
        snapshot_bytes_rx,
        snapshot_latest_rx,
        notice_rx,

        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_command_full_log: now,
        last_snapshot_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_INPUT_LEN: usize = 64;

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

// Shared command submission with drop-on-full semantics; a slow match task
// must not be able to stall the socket loop.
fn submit_command(
    command_tx: &mpsc::Sender<MatchCommand>,
    command: MatchCommand,
    last_command_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match command_tx.try_send(command) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_cmd)) => {
            if should_log(last_command_full_log) {
                warn!("command channel full; dropping command");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_cmd)) => Err(NetError::CommandsClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        command_tx,
        snapshot_bytes_rx,
        snapshot_latest_rx,
        notice_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_command_full_log,
        last_snapshot_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming command from the view.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    command_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_command_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing snapshot bytes, shared across connections.
            snapshot = snapshot_bytes_rx.recv() => {
                match snapshot {
                    Ok(bytes) => match forward_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_snapshot_lag_log) {
                            warn!(missed = n, "snapshots lagged; sending latest");
                        }

                        // Resync strategy: skip ahead to the latest snapshot.
                        let latest = snapshot_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            match forward_bytes(latest, socket, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::SnapshotsClosed);
                        true
                    }
                }
            }

            // Outgoing discrete notification.
            notice = notice_rx.recv() => {
                match notice {
                    Ok(notice) => {
                        let msg = ServerMessage::Notice(NoticeDto::from(notice));
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send notice");
                                true
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Notices are advisory; snapshots carry the state.
                        warn!(missed = n, "notices lagged; skipping");
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::NoticesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    debug!(
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        invalid_json = *invalid_json,
        "connection stats"
    );
    info!("view disconnected");

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    command_tx: &mpsc::Sender<MatchCommand>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_command_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Start) => {
                        submit_command(command_tx, MatchCommand::Start, last_command_full_log)
                    }
                    Ok(ClientMessage::Restart) => {
                        submit_command(command_tx, MatchCommand::Restart, last_command_full_log)
                    }
                    Ok(ClientMessage::Input(payload)) => {
                        if payload.text.chars().count() > MAX_INPUT_LEN {
                            // No word is this long; drop instead of matching.
                            if should_log(last_invalid_input_log) {
                                warn!(len = payload.text.len(), "oversized input; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        submit_command(
                            command_tx,
                            MatchCommand::Input { text: payload.text },
                            last_command_full_log,
                        )
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_bytes(
    payload: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let len = payload.len();
    match socket.send(Message::Text(payload)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}
