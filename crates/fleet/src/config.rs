//! Fleet configuration and lifecycle constants.

use std::time::Duration;

use serde::Deserialize;

use wearcheck_proxy_select::{DaemonConfig, DaemonSelector, ProxySelector, RosterSelector};
use wearcheck_protocol::ProxyBinding;

use crate::classify::LoginClassifier;

/// Health monitor period.
pub const HEALTH_CHECK_PERIOD: Duration = Duration::from_secs(60);
/// Base period of the scheduled session refresh.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(30 * 60);
/// Upper bound of the uniform jitter added to each refresh period.
pub const REFRESH_JITTER: Duration = Duration::from_secs(4 * 60);
/// Retry delay when a refresh fires while the bot is serving a request.
pub const REFRESH_BUSY_RETRY: Duration = Duration::from_secs(30);
/// GC silence beyond this demotes a ready bot and forces a reattach.
pub const GC_INACTIVITY_MAX: Duration = Duration::from_secs(10 * 60);
/// Default startup barrier for [`crate::BotController::wait_for_initialization`].
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Pause between clearing the played-games list and re-playing the game
/// when forcing a fresh GC handshake.
pub const GC_PLAY_TOGGLE_DELAY: Duration = Duration::from_secs(1);

/// Fleet-wide settings. Field names match the recognized configuration
/// keys; all durations are milliseconds on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FleetSettings {
    pub max_login_retries: u32,
    #[serde(rename = "login_retry_delay")]
    pub login_retry_delay_ms: u64,
    pub max_gc_reconnect_attempts: u32,
    #[serde(rename = "gc_reconnect_delay")]
    pub gc_reconnect_delay_ms: u64,
    #[serde(rename = "request_ttl")]
    pub request_ttl_ms: u64,
    #[serde(rename = "request_delay")]
    pub request_delay_ms: u64,
    #[serde(rename = "proxy_switch_cooldown")]
    pub proxy_switch_cooldown_ms: u64,
    /// Local HTTP listener of the proxy daemon; SOCKS5 sits on port + 1.
    pub proxy_port: u16,
    /// Proxy-control daemon base URL. Unset means no daemon.
    pub clash_api_url: Option<String>,
    pub clash_secret: Option<String>,
    /// Fixed per-bot proxy roster. Non-empty takes precedence over the
    /// daemon.
    pub proxy_roster: Vec<ProxyBinding>,
    pub login_classifier: LoginClassifier,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            max_login_retries: 5,
            login_retry_delay_ms: 5_000,
            max_gc_reconnect_attempts: 10,
            gc_reconnect_delay_ms: 10_000,
            request_ttl_ms: 10_000,
            request_delay_ms: 1_000,
            proxy_switch_cooldown_ms: 5_000,
            proxy_port: 7890,
            clash_api_url: None,
            clash_secret: None,
            proxy_roster: Vec::new(),
            login_classifier: LoginClassifier::default(),
        }
    }
}

impl FleetSettings {
    pub fn login_retry_delay(&self) -> Duration {
        Duration::from_millis(self.login_retry_delay_ms)
    }

    pub fn gc_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.gc_reconnect_delay_ms)
    }

    pub fn request_ttl(&self) -> Duration {
        Duration::from_millis(self.request_ttl_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn proxy_switch_cooldown(&self) -> Duration {
        Duration::from_millis(self.proxy_switch_cooldown_ms)
    }

    /// Builds the proxy selector these settings describe: a fixed roster
    /// when one is configured, else the control-plane daemon, else
    /// direct connections.
    pub fn build_selector(&self) -> ProxySelector {
        if !self.proxy_roster.is_empty() {
            return ProxySelector::Roster(RosterSelector::new(self.proxy_roster.clone()));
        }
        if let Some(api_url) = &self.clash_api_url {
            let config = DaemonConfig {
                api_url: api_url.clone(),
                secret: self.clash_secret.clone(),
                local_port: self.proxy_port,
                switch_cooldown: self.proxy_switch_cooldown(),
            };
            match DaemonSelector::new(config) {
                Ok(daemon) => return ProxySelector::Daemon(daemon),
                Err(e) => {
                    tracing::warn!(error = %e, "proxy daemon misconfigured, using direct connections");
                }
            }
        }
        ProxySelector::Direct
    }
}

/// Exponential backoff ladder: `base · 2^(attempt − 1)` for 1-based
/// attempt numbers, saturating instead of overflowing.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exp)
}
