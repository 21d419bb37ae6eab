//! Access node endpoint configuration
//!
//! Resolution order:
//! 1. `FLOW_ACCESSNODE_API` env var - highest priority
//! 2. `access_node` in the config file
//! 3. The public REST endpoint of the configured network
//!
//! # Examples
//!
//! ```bash
//! # Point at a private access node
//! export FLOW_ACCESSNODE_API="https://rest-testnet.onflow.org"
//!
//! # Or rely on the network default (rate limited)
//! ```

use super::Network;

/// Environment variable overriding the access node URL
pub const ACCESS_NODE_ENV: &str = "FLOW_ACCESSNODE_API";

/// Public REST endpoints
pub mod public_endpoints {
    pub const MAINNET: &str = "https://rest-mainnet.onflow.org";
    pub const TESTNET: &str = "https://rest-testnet.onflow.org";
    pub const EMULATOR: &str = "http://127.0.0.1:8888";
}

/// Where the access node URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessNodeSource {
    Environment,
    ConfigFile,
    NetworkDefault,
}

/// Resolved access node endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessNodeConfig {
    pub url: String,
    pub source: AccessNodeSource,
}

impl AccessNodeConfig {
    /// Resolve using the process environment
    pub fn resolve(network: Network, configured: Option<&str>) -> Self {
        Self::resolve_with(network, configured, std::env::var(ACCESS_NODE_ENV).ok())
    }

    /// Resolve with an explicit environment value
    pub fn resolve_with(network: Network, configured: Option<&str>, env_value: Option<String>) -> Self {
        if let Some(url) = env_value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using {} for access node", ACCESS_NODE_ENV);
            return Self {
                url: url.trim().to_string(),
                source: AccessNodeSource::Environment,
            };
        }

        if let Some(url) = configured.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using access node from config file");
            return Self {
                url: url.trim().to_string(),
                source: AccessNodeSource::ConfigFile,
            };
        }

        if network == Network::Mainnet {
            tracing::warn!("No access node configured, using public mainnet endpoint (rate limited)");
        } else {
            tracing::info!(network = network.name(), "Using public access node");
        }
        Self {
            url: network.default_access_node().to_string(),
            source: AccessNodeSource::NetworkDefault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_takes_priority() {
        let resolved = AccessNodeConfig::resolve_with(
            Network::Testnet,
            Some("https://configured.example"),
            Some("https://env.example".to_string()),
        );
        assert_eq!(resolved.url, "https://env.example");
        assert_eq!(resolved.source, AccessNodeSource::Environment);
    }

    #[test]
    fn config_file_beats_network_default() {
        let resolved =
            AccessNodeConfig::resolve_with(Network::Testnet, Some("https://configured.example"), None);
        assert_eq!(resolved.url, "https://configured.example");
        assert_eq!(resolved.source, AccessNodeSource::ConfigFile);
    }

    #[test]
    fn network_defaults() {
        let mainnet = AccessNodeConfig::resolve_with(Network::Mainnet, None, None);
        assert_eq!(mainnet.url, public_endpoints::MAINNET);

        let emulator = AccessNodeConfig::resolve_with(Network::Emulator, Some("  "), Some(String::new()));
        assert_eq!(emulator.url, public_endpoints::EMULATOR);
        assert_eq!(emulator.source, AccessNodeSource::NetworkDefault);
    }
}
