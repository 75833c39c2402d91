//! Precomputed proxy roster.
//!
//! For deployments without a proxy daemon: a fixed list of bindings is
//! assigned to bots round-robin by index.

use rand::seq::SliceRandom;
use tracing::debug;

use wearcheck_protocol::ProxyBinding;

/// Static bot-index → binding mapping.
pub struct RosterSelector {
    entries: Vec<ProxyBinding>,
}

impl RosterSelector {
    pub fn new(entries: Vec<ProxyBinding>) -> Self {
        Self { entries }
    }

    /// Round-robin lookup for a bot. No daemon interaction, no cooldown.
    pub fn pick_for_bot(&self, index: usize, username: &str) -> Option<ProxyBinding> {
        if self.entries.is_empty() {
            return None;
        }
        let binding = self.entries[index % self.entries.len()].clone();
        debug!(bot = %username, proxy = %binding.name, "assigned roster proxy");
        Some(binding)
    }

    /// Random roster entry, for callers without a stable index.
    pub fn pick_random(&self) -> Option<ProxyBinding> {
        self.entries.choose(&mut rand::thread_rng()).cloned()
    }
}
