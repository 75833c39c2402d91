//! Request-scoped errors.
//!
//! Lifecycle failures (login retries, GC reattach, license grants) are
//! logged and emitted as events instead; only errors that answer a
//! caller's inspect future live here.

use wearcheck_session::SessionError;

/// Failure of a single inspect request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InspectError {
    /// The bot is not ready (or already serving a request).
    #[error("bot is not ready")]
    NotReady,

    /// No matching GC reply arrived within the request TTL.
    #[error("no GC reply within the request TTL")]
    TtlExceeded,

    /// No free ready bot at dispatch time. Callers retry at a higher
    /// layer; the pool does not queue.
    #[error("no free ready bot available")]
    NoBotsAvailable,

    /// The bot was torn down while the request was in flight.
    #[error("bot destroyed with request in flight")]
    Destroyed,

    /// The session rejected the inspect RPC outright.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
