//! The session capability a bot drives.
//!
//! The Steam authentication protocol and the GC wire format are not
//! implemented here; any compatible stack (or a scripted fake in tests)
//! sits behind [`SessionClient`]. Each bot exclusively owns its client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use wearcheck_protocol::{ProxyBinding, RawItemInfo};

/// Error surfaced by a session operation or pushed as
/// [`SessionEvent::Error`].
///
/// Carries the upstream message and, when known, the numeric Steam result
/// code so callers can classify transient failures by either.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    pub message: String,
    pub eresult: Option<i32>,
}

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            eresult: None,
        }
    }

    pub fn with_eresult(message: impl Into<String>, eresult: i32) -> Self {
        Self {
            message: message.into(),
            eresult: Some(eresult),
        }
    }
}

/// Steam connection status as reported by the underlying stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    Connecting,
    Offline,
}

/// Details delivered with a successful logon.
#[derive(Debug, Clone, Default)]
pub struct LogOnOutcome {
    pub steam_id: Option<u64>,
    /// True when the session resumed from a scheduled relog rather than a
    /// cold login.
    pub resumed: bool,
}

/// Events pushed by the session stack, in arrival order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Asynchronous failure (bad credentials, replaced logon session,
    /// transport loss during logon).
    Error(SessionError),
    /// Steam-level disconnect. The stack is expected to auto-reconnect.
    Disconnected { eresult: i32, msg: Option<String> },
    LoggedOn(LogOnOutcome),
    /// The license cache is populated; ownership queries are now valid.
    OwnershipCached,
    ConnectedToGc,
    DisconnectedFromGc { reason: String },
    ConnectionStatus(ConnectionStatus),
    /// Raw item payload answering an earlier `inspect_item`.
    InspectItemInfo(RawItemInfo),
}

/// Credentials for [`SessionClient::log_on`].
#[derive(Debug, Clone, Default)]
pub struct LogOnDetails {
    pub account_name: String,
    pub password: String,
    pub remember_password: bool,
    /// One-time Steam Guard code, when the caller already has one.
    pub auth_code: Option<String>,
    /// TOTP-derived two-factor code.
    pub two_factor_code: Option<String>,
}

/// Operations a bot requires from its session stack.
///
/// Push events arrive on the receiver returned by
/// [`take_events`](Self::take_events); operations report dial-time
/// failures through their `Result` and everything asynchronous through
/// [`SessionEvent`].
#[async_trait]
pub trait SessionClient: Send + 'static {
    /// Starts (or restarts) a logon with the given credentials.
    async fn log_on(&mut self, details: LogOnDetails) -> Result<(), SessionError>;

    /// Tears the session down. Idempotent.
    async fn log_off(&mut self);

    /// Drops and re-establishes the Steam connection, keeping credentials.
    async fn relog(&mut self) -> Result<(), SessionError>;

    /// Reports the played-app list to Steam. An empty list closes any GC
    /// session; a list containing the game app opens one. `persist`
    /// keeps the list across the stack's automatic reconnects.
    async fn set_played_games(&mut self, app_ids: &[u32], persist: bool) -> Result<(), SessionError>;

    async fn request_free_license(&mut self, app_ids: &[u32]) -> Result<(), SessionError>;

    /// Whether the logged-on account owns the app. Only meaningful after
    /// [`SessionEvent::OwnershipCached`].
    async fn owns_app(&self, app_id: u32) -> bool;

    /// Issues an inspect RPC to the GC. The reply arrives as
    /// [`SessionEvent::InspectItemInfo`].
    async fn inspect_item(
        &mut self,
        owner_id: &str,
        asset_id: &str,
        proof_token: &str,
    ) -> Result<(), SessionError>;

    /// Binds egress for subsequent dials. `None` means direct.
    fn set_proxy(&mut self, binding: Option<ProxyBinding>);

    /// Takes the event receiver. Can only be called once.
    fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>>;
}
