use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a process-unique, monotonically increasing identifier.
///
/// Seeding the counter from the clock keeps ids from different process runs
/// distinct, while the atomic increment keeps ids generated in the same
/// instant from colliding.
pub fn fresh_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::fresh_id;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = fresh_id();
        let b = fresh_id();
        assert!(b > a);
    }
}
