// Domain layer: core simulation types and rules.

pub mod enemy;
pub mod registry;
pub mod systems;
pub mod tuning;
pub mod words;

pub use enemy::{Enemy, EnemyKind, EnemyOrigin, EnemySnapshot};
pub use registry::EnemyRegistry;
pub use words::WordPool;
