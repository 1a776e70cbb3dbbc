use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::Mutex;

/// Striped per-session turn locks.
///
/// A chat turn holds its session's stripe for the whole read-modify-write
/// (registry read, external calls, registry write-back), so two concurrent
/// turns for the same session id never interleave. Turns for different
/// sessions almost always land on different stripes and stay concurrent;
/// a stripe collision only serializes, it never misorders.
pub struct SessionLocks {
    stripes: Vec<Mutex<()>>,
}

impl SessionLocks {
    pub fn new(stripe_count: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        Self { stripes: (0..stripe_count).map(|_| Mutex::new(())).collect() }
    }

    pub fn for_session(&self, session_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        &self.stripes[index]
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new(32)
    }
}
