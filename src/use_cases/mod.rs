// Use cases layer: application workflows for the match engine.

pub mod match_core;
pub mod match_loop;
pub mod session;
pub mod types;

pub use match_core::{MatchCore, MatchSettings, PvpRole, PvpSettings};
pub use match_loop::{MatchChannels, MatchSchedule, match_task};
pub use session::{MatchHandle, MatchRegistry, SessionError, SessionSettings};
pub use types::{
    EndReason, MatchCommand, MatchOutput, MatchPhase, MatchSnapshot, Notification, PeerEvent,
    PvpOutcome,
};
