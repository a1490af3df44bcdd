use std::sync::{
    OnceLock,
    atomic::{AtomicU64, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-unique connection id.
///
/// Seeded from the clock so ids from a restarted process do not repeat earlier logs; never zero,
/// which is reserved for the computer-controlled player's render reference.
pub fn next_conn_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        AtomicU64::new(seed.max(1))
    });
    counter.fetch_add(1, Ordering::Relaxed)
}
