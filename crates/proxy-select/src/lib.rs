//! Egress proxy selection for bot sessions.
//!
//! One capability, three backends: a proxy-control daemon (Clash-style
//! HTTP API), a precomputed roster, or direct connections. Selection
//! failures are never fatal — callers receive `None` and dial directly.

pub mod daemon;
pub mod roster;
pub mod wire;

pub use daemon::{DaemonConfig, DaemonSelector, SelectError};
pub use roster::RosterSelector;

use wearcheck_protocol::ProxyBinding;

/// Process-wide proxy selector consulted by every bot before dialing.
pub enum ProxySelector {
    /// Rotate upstreams through a local proxy-control daemon.
    Daemon(DaemonSelector),
    /// Fixed bot-index → binding mapping, no daemon interaction.
    Roster(RosterSelector),
    /// No proxying; every bot dials directly.
    Direct,
}

impl ProxySelector {
    /// Picks a binding for a fresh session, honoring the daemon's switch
    /// cooldown. `None` means connect directly (cooldown active, daemon
    /// unreachable, or no backend configured).
    pub async fn pick_random(&self) -> Option<ProxyBinding> {
        match self {
            Self::Daemon(daemon) => daemon.pick_random().await,
            Self::Roster(roster) => roster.pick_random(),
            Self::Direct => None,
        }
    }

    /// Picks the binding for a specific bot. The roster backend maps the
    /// index round-robin; the daemon backend falls back to rotation.
    pub async fn pick_for_bot(&self, index: usize, username: &str) -> Option<ProxyBinding> {
        match self {
            Self::Daemon(daemon) => daemon.pick_random().await,
            Self::Roster(roster) => roster.pick_for_bot(index, username),
            Self::Direct => None,
        }
    }

    /// Name of the currently selected daemon upstream, if any.
    pub async fn current_name(&self) -> Option<String> {
        match self {
            Self::Daemon(daemon) => daemon.current_name().await,
            Self::Roster(_) | Self::Direct => None,
        }
    }
}
