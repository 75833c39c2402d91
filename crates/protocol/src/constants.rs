//! Protocol-level constants.

/// Steam app id of the game whose coordinator serves inspect queries.
pub const CSGO_APP_ID: u32 = 730;

/// URL action marker that precedes the `S…A…D…` / `M…A…D…` parameter blob
/// in an inspect link.
pub const INSPECT_ACTION: &str = "csgo_econ_action_preview";
