//! Retryable-login classification.
//!
//! Upstream stacks report transient logon failures as loosely formatted
//! message strings and, when available, numeric Steam result codes. The
//! classifier is configuration, not hard-coded matching, so deployments
//! can track upstream wording changes without a rebuild.

use serde::Deserialize;

use wearcheck_session::SessionError;

/// Predicate deciding whether a logon failure is worth retrying.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginClassifier {
    /// Substrings of error messages considered transient.
    pub retryable_messages: Vec<String>,
    /// Steam result codes considered transient.
    pub retryable_eresults: Vec<i32>,
}

impl Default for LoginClassifier {
    fn default() -> Self {
        Self {
            retryable_messages: [
                "Proxy connection timed out",
                "LogonSessionReplaced",
                "ServiceUnavailable",
                "ConnectFailed",
                "Timeout",
            ]
            .map(str::to_string)
            .to_vec(),
            // RateLimitExceeded and its neighbors.
            retryable_eresults: vec![84, 85, 86, 87],
        }
    }
}

impl LoginClassifier {
    /// True when the failure matches a transient class by message
    /// substring or result code.
    pub fn is_retryable(&self, err: &SessionError) -> bool {
        err.eresult
            .is_some_and(|code| self.retryable_eresults.contains(&code))
            || self
                .retryable_messages
                .iter()
                .any(|needle| err.message.contains(needle))
    }
}
