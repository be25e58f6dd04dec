//! Client configuration.
//!
//! Server address parsing and the [`ClientConfig`] builder.

use std::fmt;
use std::time::Duration;

use super::error::{DriverError, DriverResult};
use crate::bolt::{BoltVersion, Handshake};
use crate::bolt::codec::DEFAULT_MAX_MESSAGE_SIZE;

pub use crate::bolt::AuthToken;

/// Default Bolt port
pub const DEFAULT_PORT: u16 = 7687;

/// Default user agent sent in HELLO
pub const DEFAULT_USER_AGENT: &str = concat!("bolt-client/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// ServerAddress
// ============================================================================

/// Server address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// Host name or IP
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl ServerAddress {
    /// Create a new server address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `bolt://host:port`, `neo4j://host:port` or `host[:port]`.
    pub fn from_uri(uri: &str) -> DriverResult<Self> {
        let rest = match uri.split_once("://") {
            Some(("bolt", rest)) | Some(("neo4j", rest)) => rest,
            Some((scheme, _)) => {
                return Err(DriverError::configuration(format!(
                    "Unsupported URI scheme: {}",
                    scheme
                )))
            }
            None => uri,
        };
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Ok(Self::default());
        }

        let parts: Vec<&str> = rest.split(':').collect();
        match parts.as_slice() {
            [host] => Ok(Self::new(*host, DEFAULT_PORT)),
            [host, port] => {
                let port = port
                    .parse()
                    .map_err(|_| DriverError::configuration(format!("Invalid port: {}", port)))?;
                let host = if host.is_empty() { "localhost" } else { host };
                Ok(Self::new(host, port))
            }
            _ => Err(DriverError::configuration(format!(
                "Invalid server address: {}",
                uri
            ))),
        }
    }

    /// Address in `host:port` form for socket resolution.
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address
    pub address: ServerAddress,
    /// Authentication token
    pub auth: AuthToken,
    /// User agent reported in HELLO
    pub user_agent: String,
    /// Logging verbosity: 1 queries and rows, 2 messages and state
    /// transitions, 3 hex dumps of inbound messages
    pub verbosity: u8,
    /// Protocol versions proposed during the handshake, preferred first
    pub versions: Vec<BoltVersion>,
    /// Timeout for opening the socket
    pub connect_timeout: Option<Duration>,
    /// Socket read timeout
    pub read_timeout: Option<Duration>,
    /// Socket write timeout
    pub write_timeout: Option<Duration>,
    /// Largest inbound message accepted
    pub max_message_size: usize,
}

impl ClientConfig {
    /// Create a configuration for `uri` with default settings.
    pub fn new(uri: &str, auth: AuthToken) -> DriverResult<Self> {
        Ok(Self {
            address: ServerAddress::from_uri(uri)?,
            auth,
            ..Self::default()
        })
    }

    /// Start a builder.
    pub fn builder(uri: &str, auth: AuthToken) -> DriverResult<ClientConfigBuilder> {
        let config = Self::new(uri, auth)?;
        Ok(ClientConfigBuilder { config })
    }

    /// Handshake proposing the configured versions.
    pub fn handshake(&self) -> DriverResult<Handshake> {
        Handshake::with_versions(self.versions.clone())
            .map_err(|e| DriverError::configuration(e.to_string()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            auth: AuthToken::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verbosity: 0,
            versions: BoltVersion::DEFAULT_PROPOSALS.to_vec(),
            connect_timeout: Some(Duration::from_secs(30)),
            read_timeout: None,
            write_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

// ============================================================================
// ClientConfigBuilder
// ============================================================================

/// Client configuration builder
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set logging verbosity.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Set the proposed protocol versions (at most four).
    pub fn with_versions(mut self, versions: Vec<BoltVersion>) -> Self {
        self.config.versions = versions;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the socket read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the socket write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Set the inbound message size limit.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Build, validating the version proposals.
    pub fn build(self) -> DriverResult<ClientConfig> {
        self.config.handshake()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address_parsing() {
        let addr = ServerAddress::from_uri("bolt://db.example.com:7688").unwrap();
        assert_eq!(addr, ServerAddress::new("db.example.com", 7688));

        let addr = ServerAddress::from_uri("neo4j://graph").unwrap();
        assert_eq!(addr.port, DEFAULT_PORT);

        let addr = ServerAddress::from_uri("127.0.0.1:9999").unwrap();
        assert_eq!(addr.to_socket_addr(), "127.0.0.1:9999");

        assert_eq!(ServerAddress::from_uri("").unwrap(), ServerAddress::default());
    }

    #[test]
    fn test_server_address_errors() {
        assert!(matches!(
            ServerAddress::from_uri("http://localhost"),
            Err(DriverError::Configuration(_))
        ));
        assert!(ServerAddress::from_uri("bolt://host:port").is_err());
        assert!(ServerAddress::from_uri("a:1:2").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder("bolt://localhost:7687", AuthToken::basic("neo4j", "pw"))
            .unwrap()
            .with_user_agent("tests/1.0")
            .with_verbosity(2)
            .with_versions(vec![BoltVersion::V5_1])
            .with_read_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.user_agent, "tests/1.0");
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.versions, vec![BoltVersion::V5_1]);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.auth.scheme, "basic");
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.versions, BoltVersion::DEFAULT_PROPOSALS.to_vec());
        assert!(config.user_agent.starts_with("bolt-client/"));
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_too_many_versions_rejected() {
        let result = ClientConfig::builder("localhost", AuthToken::none())
            .unwrap()
            .with_versions(BoltVersion::ALL.to_vec())
            .build();
        assert!(matches!(result, Err(DriverError::Configuration(_))));

        let result = ClientConfig::builder("localhost", AuthToken::none())
            .unwrap()
            .with_versions(vec![])
            .build();
        assert!(result.is_err());
    }
}
