//! Public types for the bot fleet.

use std::sync::Arc;

use serde::Serialize;

use wearcheck_session::SessionError;

/// Derives a 6-digit two-factor code from a shared TOTP seed. The
/// generator itself is supplied by the embedder.
pub type TotpFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Lifecycle state of one bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// No session activity yet (or Steam-level disconnect awaiting
    /// recovery).
    Init,
    /// Logon in flight or a retry scheduled.
    LoggingIn,
    /// Steam session up, GC bootstrap not started or pending ownership.
    LoggedOn,
    /// Played-games toggle issued, waiting for the GC handshake.
    GcConnecting,
    /// GC session attached; serving or available.
    Ready,
    /// GC session dropped, reattach pending.
    GcLost,
    /// Unrecoverable auth failure or explicit shutdown. Terminal.
    Dead,
}

/// Account login material for one bot.
#[derive(Clone)]
pub struct AccountCredentials {
    pub username: String,
    pub password: String,
    /// Either a short one-time Steam Guard code or a long-lived TOTP
    /// seed; `None` for accounts without two-factor.
    pub auth_secret: Option<String>,
}

impl AccountCredentials {
    /// Splits the auth secret into logon fields: length ≤ 5 is a
    /// one-time code, anything longer is a TOTP seed.
    pub fn guard_codes(&self, totp: &TotpFn) -> (Option<String>, Option<String>) {
        match self.auth_secret.as_deref() {
            None => (None, None),
            Some(code) if code.len() <= 5 => (Some(code.to_string()), None),
            Some(seed) => (None, Some(totp(seed))),
        }
    }
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Point-in-time snapshot of one bot, as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotStatus {
    pub username: String,
    pub ready: bool,
    pub busy: bool,
    pub login_attempt: u32,
    pub gc_attempt: u32,
}

/// Edge-triggered lifecycle events emitted by a bot.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// GC session attached; the bot can serve.
    Ready { bot: usize },
    /// The bot can no longer serve (GC loss, relog, shutdown).
    Unready { bot: usize },
    /// The first logon attempt has concluded, whatever its outcome.
    /// Reported once per bot; feeds the controller's startup barrier.
    LoginAttempted { bot: usize },
    /// Login given up after exhausting retries (or a non-retryable
    /// failure). The bot is dead.
    LoginFailed { bot: usize, error: SessionError },
    /// GC reattach given up after exhausting attempts.
    GcReconnectFailed { bot: usize },
}

/// Service-level events emitted by the controller.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// At least one bot became ready while the service was unready.
    Ready,
    /// The last ready bot was lost.
    Unready,
    LoginFailed {
        bot: usize,
        username: String,
        error: SessionError,
    },
    GcReconnectFailed {
        bot: usize,
        username: String,
    },
    /// The startup barrier resolved (a bot is ready or every bot has
    /// attempted login).
    InitializationComplete,
}
