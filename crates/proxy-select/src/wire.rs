//! Wire types for the proxy-control daemon API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Proxy groups and sentinel sinks that are not concrete upstream tunnels.
const META_TYPES: [&str; 6] = [
    "Direct",
    "Reject",
    "Selector",
    "URLTest",
    "Fallback",
    "LoadBalance",
];

/// `GET {base}/proxies` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxiesResponse {
    pub proxies: HashMap<String, ProxyEntry>,
}

/// One entry of the daemon's proxy table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyEntry {
    #[serde(rename = "type")]
    pub proxy_type: String,
    /// Liveness from the daemon's health checks; absent means unknown.
    #[serde(default)]
    pub alive: Option<bool>,
}

impl ProxyEntry {
    /// A concrete upstream tunnel that is not known-dead.
    pub fn is_selectable(&self) -> bool {
        !META_TYPES.contains(&self.proxy_type.as_str()) && self.alive != Some(false)
    }
}

/// `PUT {base}/proxies/PROXY` request body.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchRequest<'a> {
    pub name: &'a str,
}

/// Extracts the sorted candidate upstream names from a proxy table.
pub fn candidate_names(resp: &ProxiesResponse) -> Vec<String> {
    let mut names: Vec<String> = resp
        .proxies
        .iter()
        .filter(|(_, entry)| entry.is_selectable())
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ProxiesResponse {
        serde_json::from_str(
            r#"{
                "proxies": {
                    "GLOBAL": {"type": "Selector"},
                    "auto": {"type": "URLTest", "alive": true},
                    "DIRECT": {"type": "Direct"},
                    "REJECT": {"type": "Reject"},
                    "balance": {"type": "LoadBalance"},
                    "backup": {"type": "Fallback"},
                    "jp-01": {"type": "Shadowsocks", "alive": true},
                    "jp-02": {"type": "Vmess", "alive": false},
                    "us-01": {"type": "Trojan"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn filters_meta_entries_and_dead_upstreams() {
        let names = candidate_names(&table());
        assert_eq!(names, vec!["jp-01".to_string(), "us-01".to_string()]);
    }

    #[test]
    fn unknown_liveness_is_selectable() {
        let entry = ProxyEntry {
            proxy_type: "Shadowsocks".into(),
            alive: None,
        };
        assert!(entry.is_selectable());
    }

    #[test]
    fn switch_request_body_shape() {
        let body = serde_json::to_string(&SwitchRequest { name: "jp-01" }).unwrap();
        assert_eq!(body, r#"{"name":"jp-01"}"#);
    }
}
