// Session registry: creates and wires per-match event-loop tasks.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, watch};
use tracing::info;

use crate::domain::tuning::{EnemyTuning, MatchTuning};
use crate::interface_adapters::utils::rng::fresh_id;
use crate::use_cases::match_core::{MatchCore, MatchSettings, PvpRole, PvpSettings};
use crate::use_cases::match_loop::{MatchChannels, MatchSchedule, match_task};
use crate::use_cases::types::{MatchCommand, MatchSnapshot, Notification, PeerEvent};

/// Shared configuration applied to newly created matches.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound view commands.
    pub command_channel_capacity: usize,
    /// Capacity for peer events in each direction.
    pub peer_channel_capacity: usize,
    /// Capacity for broadcast notifications.
    pub notice_broadcast_capacity: usize,
    /// Capacity for broadcast serialized snapshots.
    pub snapshot_broadcast_capacity: usize,
    /// Ticker cadences handed to every match task.
    pub schedule: MatchSchedule,
    /// Gameplay tuning shared by all matches in this process.
    pub rules: MatchTuning,
    pub enemies: EnemyTuning,
    /// Dictionary the per-match word pools draw from.
    pub dictionary: Vec<String>,
}

/// Errors returned by registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Match already exists and cannot be re-created.
    AlreadyExists,
    /// No match under the given id.
    NotFound,
    /// The match's outbound peer stream was already claimed by a transport.
    AlreadyLinked,
}

/// Per-match channels and identifiers handed to adapters.
#[derive(Clone, Debug)]
pub struct MatchHandle {
    /// Identifier clients use to target this match.
    pub match_id: Arc<str>,
    /// Address used for this side in peer envelopes.
    pub chain_id: Arc<str>,
    /// Player identity reported to the scoreboard at match end.
    pub player: Arc<str>,
    /// Sender for view commands into the match task.
    pub command_tx: mpsc::Sender<MatchCommand>,
    /// Inbound peer events; transports push decoded messages here.
    pub peer_event_tx: mpsc::Sender<PeerEvent>,
    /// Watch sender holding the latest match snapshot.
    pub snapshot_tx: watch::Sender<MatchSnapshot>,
    /// Broadcast sender for discrete notifications.
    pub notice_tx: broadcast::Sender<Notification>,
    /// Broadcast sender for serialized snapshots.
    pub snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender for the latest serialized snapshot (lag recovery).
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
    /// Cancels the match task on teardown.
    pub shutdown: Arc<tokio::sync::Notify>,
    /// Outbound peer events, claimed once by a transport relay.
    peer_outbound_rx: Arc<Mutex<Option<mpsc::Receiver<PeerEvent>>>>,
}

impl MatchHandle {
    /// Claims the outbound peer stream; a second claim returns None.
    pub async fn take_peer_outbound(&self) -> Option<mpsc::Receiver<PeerEvent>> {
        self.peer_outbound_rx.lock().await.take()
    }

    /// Hands an unclaimed outbound stream back after a failed pairing.
    pub async fn restore_peer_outbound(&self, rx: mpsc::Receiver<PeerEvent>) {
        *self.peer_outbound_rx.lock().await = Some(rx);
    }
}

/// Thread-safe registry of active matches.
pub struct MatchRegistry {
    /// Global settings applied to newly created matches.
    settings: SessionSettings,
    /// Map of match id to active handle.
    matches: RwLock<HashMap<String, MatchHandle>>,
}

impl MatchRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            matches: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new match and spawns its event-loop task. A PVP role makes
    /// the match pairable; solo matches never produce peer traffic.
    pub async fn create_match(
        &self,
        match_id: String,
        player: Option<String>,
        pvp_role: Option<PvpRole>,
    ) -> Result<MatchHandle, SessionError> {
        let mut matches = self.matches.write().await;
        if matches.contains_key(&match_id) {
            return Err(SessionError::AlreadyExists);
        }

        let chain_id = format!("chain-{}", fresh_id());
        let player = player.unwrap_or_else(|| format!("guest-{}", fresh_id()));

        let core = MatchCore::new(
            MatchSettings {
                rules: self.settings.rules,
                enemies: self.settings.enemies,
                dictionary: self.settings.dictionary.clone(),
                pvp: pvp_role.map(|role| PvpSettings {
                    local_chain: chain_id.clone(),
                    role,
                }),
            },
            fresh_id(),
        );

        // Channel wiring for the match event loop.
        let (command_tx, command_rx) =
            mpsc::channel::<MatchCommand>(self.settings.command_channel_capacity);
        let (peer_event_tx, peer_rx) =
            mpsc::channel::<PeerEvent>(self.settings.peer_channel_capacity);
        let (peer_tx, peer_outbound_rx) =
            mpsc::channel::<PeerEvent>(self.settings.peer_channel_capacity);
        let (snapshot_tx, _snapshot_rx) = watch::channel::<MatchSnapshot>(core.snapshot());
        let (notice_tx, _notice_rx) =
            broadcast::channel::<Notification>(self.settings.notice_broadcast_capacity);
        let (snapshot_bytes_tx, _snapshot_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_latest_tx, _snapshot_latest_rx) =
            watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let shutdown = Arc::new(tokio::sync::Notify::new());

        // Spawn the event loop that owns this match's state and tickers.
        tokio::spawn(match_task(
            core,
            MatchChannels {
                command_rx,
                peer_rx,
                peer_tx,
                snapshot_tx: snapshot_tx.clone(),
                notice_tx: notice_tx.clone(),
                shutdown: shutdown.clone(),
            },
            self.settings.schedule,
        ));

        let handle = MatchHandle {
            match_id: Arc::from(match_id.clone()),
            chain_id: Arc::from(chain_id.as_str()),
            player: Arc::from(player.as_str()),
            command_tx,
            peer_event_tx,
            snapshot_tx,
            notice_tx,
            snapshot_bytes_tx,
            snapshot_latest_tx,
            shutdown,
            peer_outbound_rx: Arc::new(Mutex::new(Some(peer_outbound_rx))),
        };

        matches.insert(match_id.clone(), handle.clone());
        info!(%match_id, %chain_id, "match created");
        Ok(handle)
    }

    /// Returns a match handle for the provided id, if it exists.
    pub async fn get_match(&self, match_id: &str) -> Option<MatchHandle> {
        let matches = self.matches.read().await;
        matches.get(match_id).cloned()
    }
}
