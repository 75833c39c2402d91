//! Egress proxy bindings.

use serde::{Deserialize, Serialize};

/// Egress endpoints a session should dial through. Absent fields mean a
/// direct connection for that transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_proxy: Option<String>,
    /// Upstream name, for logs and status.
    pub name: String,
}

impl ProxyBinding {
    /// Binding for the local listener pair exposed by a proxy daemon:
    /// HTTP on `port`, SOCKS5 on `port + 1`.
    pub fn local_listeners(name: impl Into<String>, port: u16) -> Self {
        Self {
            http_proxy: Some(format!("http://127.0.0.1:{port}")),
            socks_proxy: Some(format!("socks5://127.0.0.1:{}", port + 1)),
            name: name.into(),
        }
    }
}
