//! Bot fleet: lifecycle state machines behind a dispatching pool.
//!
//! A [`Bot`] owns one logged-in session and drives it from login through
//! GC attach, request serving, and recovery. The [`BotController`] owns
//! the bots, spreads inspect requests across the free ready ones, and
//! aggregates their readiness into a single service-level signal.

pub mod bot;
pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod types;

pub use bot::Bot;
pub use classify::LoginClassifier;
pub use config::FleetSettings;
pub use controller::BotController;
pub use error::InspectError;
pub use types::{AccountCredentials, BotEvent, BotState, BotStatus, ControllerEvent, TotpFn};
