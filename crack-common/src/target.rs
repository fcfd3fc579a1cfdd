//! Target descriptor passed through to protocol checkers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Description of the system under attack.
///
/// The scheduler never interprets this value; it is carried verbatim to the
/// credential checker, which knows what its protocol needs. `options` holds
/// protocol-specific settings (timeouts, SSH key paths, HTTP form fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Hostname or IP address of the target
    pub host: String,

    /// Service port (0 lets the checker pick the protocol default)
    pub port: u16,

    /// Protocol identifier the checker was registered for ("ssh", "ftp", ...)
    pub service: String,

    /// Username the candidates are tried against
    pub username: String,

    /// Free-form protocol options
    pub options: HashMap<String, String>,
}

impl TargetInfo {
    /// Create a target for the given service endpoint.
    pub fn new(host: impl Into<String>, port: u16, service: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            service: service.into(),
            username: String::new(),
            options: HashMap::new(),
        }
    }

    /// Set the username candidates are checked against.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Add a protocol-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get a protocol-specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let target = TargetInfo::new("10.0.0.5", 22, "ssh")
            .with_username("root")
            .with_option("timeout_secs", "5");

        assert_eq!(target.host, "10.0.0.5");
        assert_eq!(target.username, "root");
        assert_eq!(target.option("timeout_secs"), Some("5"));
        assert_eq!(target.option("missing"), None);
    }

    #[test]
    fn test_round_trips_through_json() {
        let target = TargetInfo::new("example.org", 21, "ftp").with_username("anonymous");
        let json = serde_json::to_string(&target).unwrap();
        let back: TargetInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(back.host, "example.org");
        assert_eq!(back.service, "ftp");
    }
}
