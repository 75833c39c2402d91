//! GC item payloads.
//!
//! [`RawItemInfo`] mirrors the econ-item fields as the coordinator sends
//! them; [`ItemInfo`] is the normalized shape handed back to callers
//! (renamed wear field, defaulted paint seed, camelCase sticker ids, plus
//! the originating request fields and the post-reply delay).

use serde::{Deserialize, Serialize};

use crate::link::InspectLink;

/// Sticker entry as the GC sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSticker {
    pub sticker_id: u32,
    #[serde(default)]
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wear: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Item payload as the GC sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItemInfo {
    pub itemid: u64,
    #[serde(default)]
    pub defindex: u32,
    #[serde(default)]
    pub paintindex: u32,
    #[serde(default)]
    pub rarity: u32,
    #[serde(default)]
    pub quality: u32,
    pub paintwear: f64,
    /// Absent for items that never rolled a seed.
    #[serde(default)]
    pub paintseed: Option<u32>,
    #[serde(default)]
    pub killeatervalue: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customname: Option<String>,
    #[serde(default)]
    pub origin: u32,
    #[serde(default)]
    pub stickers: Vec<RawSticker>,
}

/// Normalized sticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(rename = "stickerId")]
    pub sticker_id: u32,
    pub slot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wear: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl From<RawSticker> for Sticker {
    fn from(raw: RawSticker) -> Self {
        Self {
            sticker_id: raw.sticker_id,
            slot: raw.slot,
            wear: raw.wear,
            scale: raw.scale,
            rotation: raw.rotation,
        }
    }
}

/// Normalized item attributes as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    #[serde(rename = "itemId")]
    pub item_id: u64,
    pub defindex: u32,
    pub paintindex: u32,
    pub rarity: u32,
    pub quality: u32,
    #[serde(rename = "floatValue")]
    pub float_value: f64,
    pub paintseed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killeatervalue: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customname: Option<String>,
    pub origin: u32,
    pub stickers: Vec<Sticker>,
    pub s: String,
    pub a: String,
    pub d: String,
    pub m: String,
    /// Remaining post-reply cooldown in milliseconds. Never negative.
    pub delay: u64,
}

impl ItemInfo {
    /// Normalizes a raw GC reply, attaching the originating request fields
    /// and the remaining cooldown.
    pub fn from_raw(raw: RawItemInfo, link: &InspectLink, delay_ms: u64) -> Self {
        Self {
            item_id: raw.itemid,
            defindex: raw.defindex,
            paintindex: raw.paintindex,
            rarity: raw.rarity,
            quality: raw.quality,
            float_value: raw.paintwear,
            paintseed: raw.paintseed.unwrap_or(0),
            killeatervalue: raw.killeatervalue,
            customname: raw.customname,
            origin: raw.origin,
            stickers: raw.stickers.into_iter().map(Sticker::from).collect(),
            s: link.s().to_string(),
            a: link.a().to_string(),
            d: link.d().to_string(),
            m: link.m().to_string(),
            delay: delay_ms,
        }
    }
}
