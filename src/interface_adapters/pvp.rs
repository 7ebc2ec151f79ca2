// Peer sync transport: wire envelopes and the in-process loopback relay.
//
// The engine never assumes reliable or ordered delivery from a peer
// channel; de-duplication and idempotent handlers in the match core are
// the compatibility contract. The relay here stands in for a remote
// transport by pumping one side's outbound events into the other side's
// inbox through the wire encoding.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::enemy::EnemyKind;
use crate::use_cases::session::{MatchHandle, SessionError};
use crate::use_cases::types::PeerEvent;

/// Wire-level message tags. The spawn tags double as the enemy kind.
pub const MSG_JOIN: u8 = 0;
pub const MSG_SPAWN_BASIC: u8 = 1;
pub const MSG_SPAWN_FAST: u8 = 2;
pub const MSG_SPAWN_FASTEST: u8 = 3;
pub const MSG_JOIN_ACK: u8 = 5;
pub const MSG_MATCH_END: u8 = 6;

/// Payload exchanged between paired matches.
///
/// The word field is overloaded by message type: a spawn carries the enemy
/// word, the handshake messages carry the sender's chain id, and a match
/// end carries the final score as decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerEnvelope {
    pub target_chain: String,
    pub word: String,
    pub msg_type: u8,
}

pub fn encode(event: &PeerEvent, target_chain: &str) -> PeerEnvelope {
    let (word, msg_type) = match event {
        PeerEvent::Join { chain } => (chain.clone(), MSG_JOIN),
        PeerEvent::JoinAck { chain } => (chain.clone(), MSG_JOIN_ACK),
        PeerEvent::EnemySpawn { word, kind } => (word.clone(), spawn_code(*kind)),
        PeerEvent::MatchEnd { score } => (score.to_string(), MSG_MATCH_END),
    };
    PeerEnvelope {
        target_chain: target_chain.to_string(),
        word,
        msg_type,
    }
}

/// Decodes a wire envelope. Unknown tags and malformed payloads yield None
/// and are dropped by the caller.
pub fn decode(envelope: &PeerEnvelope) -> Option<PeerEvent> {
    match envelope.msg_type {
        MSG_JOIN => Some(PeerEvent::Join {
            chain: envelope.word.clone(),
        }),
        MSG_JOIN_ACK => Some(PeerEvent::JoinAck {
            chain: envelope.word.clone(),
        }),
        MSG_SPAWN_BASIC | MSG_SPAWN_FAST | MSG_SPAWN_FASTEST => Some(PeerEvent::EnemySpawn {
            word: envelope.word.clone(),
            kind: kind_from_code(envelope.msg_type)?,
        }),
        MSG_MATCH_END => envelope
            .word
            .parse()
            .ok()
            .map(|score| PeerEvent::MatchEnd { score }),
        _ => None,
    }
}

fn spawn_code(kind: EnemyKind) -> u8 {
    match kind {
        EnemyKind::Basic => MSG_SPAWN_BASIC,
        EnemyKind::Fast => MSG_SPAWN_FAST,
        EnemyKind::Fastest => MSG_SPAWN_FASTEST,
    }
}

fn kind_from_code(code: u8) -> Option<EnemyKind> {
    match code {
        MSG_SPAWN_BASIC => Some(EnemyKind::Basic),
        MSG_SPAWN_FAST => Some(EnemyKind::Fast),
        MSG_SPAWN_FASTEST => Some(EnemyKind::Fastest),
        _ => None,
    }
}

/// Pumps one side's outbound events to the other side's inbox through the
/// wire encoding. Failures are logged and dropped; the sending match never
/// waits on its peer.
pub async fn relay_task(
    mut outbound: mpsc::Receiver<PeerEvent>,
    target_chain: Arc<str>,
    inbox: mpsc::Sender<PeerEvent>,
) {
    while let Some(event) = outbound.recv().await {
        let envelope = encode(&event, &target_chain);
        debug!(
            target = %envelope.target_chain,
            msg_type = envelope.msg_type,
            "relaying peer message"
        );
        let Some(event) = decode(&envelope) else {
            warn!(msg_type = envelope.msg_type, "undecodable peer message; dropping");
            continue;
        };
        if inbox.send(event).await.is_err() {
            warn!("peer inbox closed; relay exiting");
            break;
        }
    }
}

/// Wires two matches back-to-back with a relay in each direction.
pub async fn link_loopback(host: &MatchHandle, joiner: &MatchHandle) -> Result<(), SessionError> {
    let host_out = host
        .take_peer_outbound()
        .await
        .ok_or(SessionError::AlreadyLinked)?;
    let Some(joiner_out) = joiner.take_peer_outbound().await else {
        host.restore_peer_outbound(host_out).await;
        return Err(SessionError::AlreadyLinked);
    };

    tokio::spawn(relay_task(
        host_out,
        joiner.chain_id.clone(),
        joiner.peer_event_tx.clone(),
    ));
    tokio::spawn(relay_task(
        joiner_out,
        host.chain_id.clone(),
        host.peer_event_tx.clone(),
    ));
    Ok(())
}
