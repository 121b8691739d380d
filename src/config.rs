use url::Url;

use crate::ConfigError;

const DISCOVERY_SENTINEL: &str = "http://0.0.0.0";

/// How the Core endpoint is chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointMode {
    /// Use this base URI as-is; no DNS lookup.
    Static { uri: String },
    /// Discover candidates from DNS TXT records at startup.
    DiscoverViaDns,
}

impl EndpointMode {
    /// Parses a base-URI setting. `http://0.0.0.0` selects DNS discovery.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.trim_end_matches('/') == DISCOVERY_SENTINEL {
            return Ok(Self::DiscoverViaDns);
        }

        let invalid = |reason: String| ConfigError::InvalidBaseUri {
            uri: trimmed.to_owned(),
            reason,
        };
        let url = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_owned()));
        }
        Ok(Self::Static {
            uri: trimmed.to_owned(),
        })
    }
}

/// Read-only process configuration consumed by [`CoreClient`](crate::CoreClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    pub endpoint: EndpointMode,
    /// Sent as `X-Node-Address` on every request.
    pub node_address: String,
    /// Sent as `X-Node-Version` on every request.
    pub node_version: String,
}

impl CoreConfig {
    /// Creates a config reporting this crate's version.
    pub fn new(endpoint: EndpointMode, node_address: impl Into<String>) -> Self {
        Self {
            endpoint,
            node_address: node_address.into(),
            node_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.node_version = version.into();
        self
    }

    /// Builds the config from environment variables.
    ///
    /// Reads:
    /// - `CHAINPOINT_CORE_API_BASE_URI`: static base URI, or `http://0.0.0.0`
    ///   (the default) for DNS discovery
    /// - `NODE_TNT_ADDRESS`: node address, required
    /// - `NODE_VERSION`: optional, defaults to the crate version
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = std::env::var("CHAINPOINT_CORE_API_BASE_URI")
            .unwrap_or_else(|_| DISCOVERY_SENTINEL.to_owned());
        let address = std::env::var("NODE_TNT_ADDRESS")
            .map_err(|_| ConfigError::Missing("NODE_TNT_ADDRESS"))?;
        if address.trim().is_empty() {
            return Err(ConfigError::Empty("NODE_TNT_ADDRESS"));
        }

        let mut config = Self::new(EndpointMode::parse(&base)?, address.trim());
        if let Ok(version) = std::env::var("NODE_VERSION") {
            if !version.trim().is_empty() {
                config.node_version = version.trim().to_owned();
            }
        }
        Ok(config)
    }
}
