//! Shared value types for the inspection fleet.
//!
//! Pure data: inspect-link parsing, raw GC reply payloads and their
//! normalized form, and proxy bindings. No I/O lives here.

pub mod constants;
pub mod item;
pub mod link;
pub mod proxy;

// Re-export primary types.
pub use constants::CSGO_APP_ID;
pub use item::{ItemInfo, RawItemInfo, RawSticker, Sticker};
pub use link::{InspectLink, LinkError};
pub use proxy::ProxyBinding;
