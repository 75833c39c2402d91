//! Daemon-driven proxy selection.
//!
//! Talks to a Clash-compatible control plane: lists the proxy table,
//! samples a live concrete upstream, and switches the daemon's selector
//! to it. The local daemon then exposes the chosen upstream on a fixed
//! HTTP/SOCKS listener pair, which is what the session dials.

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use wearcheck_protocol::ProxyBinding;

use crate::wire::{ProxiesResponse, SwitchRequest, candidate_names};

/// Daemon control-plane request timeout.
const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Name of the daemon selector group the switch command targets.
const SELECTOR_GROUP: &str = "PROXY";

/// Errors from daemon interaction. All of them are swallowed into `None`
/// by the selection entry points; they exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("daemon returned status {0}")]
    Api(StatusCode),

    #[error("invalid daemon secret")]
    InvalidSecret,
}

/// Configuration for [`DaemonSelector`].
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Control-plane base URL, e.g. `http://127.0.0.1:9090`.
    pub api_url: String,
    /// Optional bearer secret.
    pub secret: Option<String>,
    /// Local HTTP listener port; SOCKS5 sits on `port + 1`.
    pub local_port: u16,
    /// Minimum interval between two switch commands.
    pub switch_cooldown: Duration,
}

#[derive(Debug, Default)]
struct SwitchState {
    current: Option<String>,
    last_switch: Option<Instant>,
}

impl SwitchState {
    fn cooldown_active(&self, window: Duration, now: Instant) -> bool {
        self.last_switch
            .is_some_and(|last| now.duration_since(last) < window)
    }
}

/// Rotating upstream selection through a proxy-control daemon.
pub struct DaemonSelector {
    http: reqwest::Client,
    base_url: String,
    local_port: u16,
    cooldown: Duration,
    state: Mutex<SwitchState>,
}

impl DaemonSelector {
    /// Creates a selector for the given control plane.
    pub fn new(config: DaemonConfig) -> Result<Self, SelectError> {
        let mut headers = HeaderMap::new();
        if let Some(secret) = &config.secret {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {secret}"))
                    .map_err(|_| SelectError::InvalidSecret)?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(API_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            local_port: config.local_port,
            cooldown: config.switch_cooldown,
            state: Mutex::new(SwitchState::default()),
        })
    }

    /// Rotates to a random live upstream and returns the local listener
    /// binding, or `None` when the cooldown is active, the daemon is
    /// unreachable, or no candidate survives filtering.
    ///
    /// The state lock is held across the whole exchange so concurrent
    /// callers serialize and cannot double-switch.
    pub async fn pick_random(&self) -> Option<ProxyBinding> {
        let mut state = self.state.lock().await;

        if state.cooldown_active(self.cooldown, Instant::now()) {
            debug!("proxy switch cooldown active");
            return None;
        }

        let candidates = match self.fetch_candidates().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to list daemon proxies");
                return None;
            }
        };
        if candidates.is_empty() {
            warn!("daemon reported no live upstream tunnels");
            return None;
        }

        let chosen = choose_upstream(&candidates, state.current.as_deref(), &mut rand::thread_rng());

        if let Err(e) = self.switch_to(&chosen).await {
            warn!(upstream = %chosen, error = %e, "proxy switch failed");
            return None;
        }

        info!(upstream = %chosen, "switched egress proxy");
        state.current = Some(chosen.clone());
        state.last_switch = Some(Instant::now());

        Some(ProxyBinding::local_listeners(chosen, self.local_port))
    }

    /// Name of the currently selected upstream.
    pub async fn current_name(&self) -> Option<String> {
        self.state.lock().await.current.clone()
    }

    async fn fetch_candidates(&self) -> Result<Vec<String>, SelectError> {
        let url = format!("{}/proxies", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SelectError::Api(status));
        }
        let table: ProxiesResponse = resp.json().await?;
        Ok(candidate_names(&table))
    }

    async fn switch_to(&self, name: &str) -> Result<(), SelectError> {
        let url = format!("{}/proxies/{SELECTOR_GROUP}", self.base_url);
        let resp = self
            .http
            .put(&url)
            .json(&SwitchRequest { name })
            .send()
            .await?;

        match resp.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(SelectError::Api(status)),
        }
    }
}

/// Uniformly samples a candidate; when the sample equals the current
/// upstream and an alternative exists, resamples from the complement.
fn choose_upstream(candidates: &[String], current: Option<&str>, rng: &mut impl Rng) -> String {
    let idx = rng.gen_range(0..candidates.len());
    let chosen = &candidates[idx];

    if candidates.len() > 1 && Some(chosen.as_str()) == current {
        let offset = 1 + rng.gen_range(0..candidates.len() - 1);
        return candidates[(idx + offset) % candidates.len()].clone();
    }
    chosen.clone()
}
