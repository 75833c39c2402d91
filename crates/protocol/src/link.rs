//! Inspect-link parsing.
//!
//! A signed inspect URL carries an owner (`S` for inventories, `M` for
//! market listings), an asset id (`A`) and a proof token (`D`) in one
//! concatenated blob after the preview action:
//!
//! ```text
//! steam://rungame/730/<ctx>/+csgo_econ_action_preview%20S<owner>A<asset>D<proof>
//! steam://rungame/730/<ctx>/+csgo_econ_action_preview%20M<listing>A<asset>D<proof>
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{CSGO_APP_ID, INSPECT_ACTION};

/// Errors from inspect-link parsing and construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid inspect link: {0}")]
    InvalidLink(&'static str),
}

/// A parsed inspect link. Immutable once constructed.
///
/// Exactly one of `s` (owner Steam id) or `m` (market listing id) is
/// non-`"0"`; `a` (asset id) and `d` (proof token) are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectLink {
    s: String,
    a: String,
    d: String,
    m: String,
}

impl InspectLink {
    /// Parses a full inspect URL.
    pub fn parse(url: &str) -> Result<Self, LinkError> {
        let rest = url
            .split_once(INSPECT_ACTION)
            .map(|(_, rest)| rest)
            .ok_or(LinkError::InvalidLink("missing preview action"))?;

        // The blob follows either a literal space or its %20 encoding.
        let blob = rest
            .trim_start_matches("%20")
            .trim_start_matches([' ', '+']);

        let (kind, fields) = blob
            .split_at_checked(1)
            .ok_or(LinkError::InvalidLink("empty parameter blob"))?;

        let (owner, tail) = take_digits(fields)?;
        let tail = expect_marker(tail, 'A')?;
        let (asset, tail) = take_digits(tail)?;
        let tail = expect_marker(tail, 'D')?;
        let (proof, tail) = take_digits(tail)?;
        if !tail.is_empty() {
            return Err(LinkError::InvalidLink("trailing data after proof token"));
        }

        match kind {
            "S" => Self::from_parts(Some(owner), None, asset, proof),
            "M" => Self::from_parts(None, Some(owner), asset, proof),
            _ => Err(LinkError::InvalidLink("unknown owner marker")),
        }
    }

    /// Builds a link from pre-parsed fields, normalizing the absent owner
    /// to `"0"`.
    pub fn from_parts(
        s: Option<&str>,
        m: Option<&str>,
        a: &str,
        d: &str,
    ) -> Result<Self, LinkError> {
        let s = normalize_owner(s);
        let m = normalize_owner(m);

        match (s.as_str(), m.as_str()) {
            ("0", "0") => return Err(LinkError::InvalidLink("no owner field set")),
            ("0", _) | (_, "0") => {}
            _ => return Err(LinkError::InvalidLink("both owner fields set")),
        }
        if a.is_empty() || d.is_empty() {
            return Err(LinkError::InvalidLink("missing asset id or proof token"));
        }
        for field in [s.as_str(), m.as_str(), a, d] {
            if !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(LinkError::InvalidLink("non-decimal field"));
            }
        }

        Ok(Self {
            s,
            a: a.to_string(),
            d: d.to_string(),
            m,
        })
    }

    /// Owner Steam id, or `"0"` for market links.
    pub fn s(&self) -> &str {
        &self.s
    }

    /// Asset id.
    pub fn a(&self) -> &str {
        &self.a
    }

    /// Proof token.
    pub fn d(&self) -> &str {
        &self.d
    }

    /// Market listing id, or `"0"` for inventory links.
    pub fn m(&self) -> &str {
        &self.m
    }

    /// Whichever of `s`/`m` identifies the owner.
    pub fn owner_id(&self) -> &str {
        if self.s != "0" { &self.s } else { &self.m }
    }

    /// True when the item sits in a market listing rather than an
    /// inventory.
    pub fn is_market_link(&self) -> bool {
        self.m != "0"
    }
}

impl std::fmt::Display for InspectLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = if self.is_market_link() { 'M' } else { 'S' };
        write!(
            f,
            "steam://rungame/{CSGO_APP_ID}/{owner}/+{INSPECT_ACTION}%20{marker}{owner}A{a}D{d}",
            owner = self.owner_id(),
            a = self.a,
            d = self.d,
        )
    }
}

fn normalize_owner(field: Option<&str>) -> String {
    match field {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "0".to_string(),
    }
}

/// Splits a leading run of ASCII digits off `input`.
fn take_digits(input: &str) -> Result<(&str, &str), LinkError> {
    let end = input
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(input.len());
    if end == 0 {
        return Err(LinkError::InvalidLink("expected decimal digits"));
    }
    Ok(input.split_at(end))
}

fn expect_marker(input: &str, marker: char) -> Result<&str, LinkError> {
    input
        .strip_prefix(marker)
        .ok_or(LinkError::InvalidLink("missing field marker"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNED: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20S76561198084749846A6768147729D12557175561287951743";
    const MARKET: &str = "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20M625254122282020305A6760346663D30614827701953021";

    #[test]
    fn parse_inventory_link() {
        let link = InspectLink::parse(OWNED).unwrap();
        assert_eq!(link.s(), "76561198084749846");
        assert_eq!(link.a(), "6768147729");
        assert_eq!(link.d(), "12557175561287951743");
        assert_eq!(link.m(), "0");
        assert_eq!(link.owner_id(), "76561198084749846");
        assert!(!link.is_market_link());
    }

    #[test]
    fn parse_market_link() {
        let link = InspectLink::parse(MARKET).unwrap();
        assert_eq!(link.s(), "0");
        assert_eq!(link.m(), "625254122282020305");
        assert_eq!(link.owner_id(), "625254122282020305");
        assert!(link.is_market_link());
    }

    #[test]
    fn parse_accepts_literal_space() {
        let url = OWNED.replace("%20", " ");
        let link = InspectLink::parse(&url).unwrap();
        assert_eq!(link.a(), "6768147729");
    }

    #[test]
    fn parse_rejects_missing_action() {
        let err = InspectLink::parse("steam://rungame/730/123/+open_menu").unwrap_err();
        assert!(matches!(err, LinkError::InvalidLink(_)));
    }

    #[test]
    fn parse_rejects_unknown_marker() {
        let url = OWNED.replace("%20S", "%20X");
        assert!(InspectLink::parse(&url).is_err());
    }

    #[test]
    fn parse_rejects_missing_proof() {
        let url = "steam://rungame/730/1/+csgo_econ_action_preview%20S76561198084749846A6768147729";
        assert!(InspectLink::parse(url).is_err());
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        let url = format!("{OWNED}zzz");
        assert!(InspectLink::parse(&url).is_err());
    }

    #[test]
    fn from_parts_requires_exactly_one_owner() {
        assert!(InspectLink::from_parts(None, None, "1", "2").is_err());
        assert!(InspectLink::from_parts(Some("3"), Some("4"), "1", "2").is_err());
        assert!(InspectLink::from_parts(Some("0"), None, "1", "2").is_err());
        assert!(InspectLink::from_parts(Some("3"), None, "1", "2").is_ok());
        assert!(InspectLink::from_parts(None, Some("4"), "1", "2").is_ok());
    }

    #[test]
    fn from_parts_requires_asset_and_proof() {
        assert!(InspectLink::from_parts(Some("3"), None, "", "2").is_err());
        assert!(InspectLink::from_parts(Some("3"), None, "1", "").is_err());
    }

    #[test]
    fn from_parts_rejects_non_decimal() {
        assert!(InspectLink::from_parts(Some("3a"), None, "1", "2").is_err());
        assert!(InspectLink::from_parts(Some("3"), None, "0x1", "2").is_err());
    }

    #[test]
    fn display_round_trips() {
        for url in [OWNED, MARKET] {
            let link = InspectLink::parse(url).unwrap();
            let reparsed = InspectLink::parse(&link.to_string()).unwrap();
            assert_eq!(link, reparsed);
        }
    }
}
