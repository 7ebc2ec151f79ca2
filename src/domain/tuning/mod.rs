// Gameplay tuning, separate from runtime/server configuration.

pub mod enemies;
pub mod rules;

pub use enemies::{EnemyTuning, KindTuning};
pub use rules::MatchTuning;
