//! Client handle.
//!
//! A [`Client`] owns at most one [`BoltConnection`], opened lazily on first
//! use. There is no pooling: one client per worker thread.

use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::bolt::BoltConnection;
use super::config::ClientConfig;
use super::error::{DriverError, DriverResult};
use super::transport::{Connector, OwnerIdentity, TcpConnector};
use crate::bolt::ServerState;

/// Query used to check whether the server answers.
const PING_QUERY: &str = "MATCH (n) RETURN n LIMIT 1;";

/// Handle to a graph database server.
pub struct Client<C: Connector = TcpConnector> {
    config: ClientConfig,
    connector: C,
    pub(crate) connection: Option<BoltConnection<C::Stream>>,
}

impl Client<TcpConnector> {
    /// Create a client connecting over TCP.
    pub fn new(config: ClientConfig) -> Self {
        let connector = TcpConnector::from_config(&config);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> Client<C> {
    /// Create a client that opens streams through `connector`.
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            connection: None,
        }
    }

    /// Configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the connection now instead of on first use.
    pub fn connect(&mut self) -> DriverResult<()> {
        self.ensure_connection().map(|_| ())
    }

    /// Send GOODBYE and drop the connection.
    pub fn disconnect(&mut self) -> DriverResult<()> {
        match self.connection.take() {
            Some(mut conn) if conn.owner() == OwnerIdentity::current() => conn.goodbye(),
            _ => Ok(()),
        }
    }

    /// Whether a usable connection is held.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.state().is_open())
            .unwrap_or(false)
    }

    /// Server state of the current connection.
    pub fn state(&self) -> ServerState {
        self.connection
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ServerState::Disconnected)
    }

    /// Open transaction scopes.
    pub fn tx_depth(&self) -> usize {
        self.connection.as_ref().map(|c| c.tx_depth()).unwrap_or(0)
    }

    /// Server agent reported by the server, once connected.
    pub fn server_agent(&self) -> Option<&str> {
        self.connection.as_ref().and_then(|c| c.server_agent())
    }

    /// Connection id reported by the server, once connected.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection.as_ref().and_then(|c| c.connection_id())
    }

    /// Block until the server answers a trivial query.
    ///
    /// Retries with delays of 1s, 2s, ... and returns the last error once
    /// `attempts` tries have failed.
    pub fn wait_for_server(&mut self, attempts: u32) -> DriverResult<()> {
        self.wait_for_server_with_delay(attempts, Duration::from_secs(1))
    }

    /// [`Client::wait_for_server`] with a custom delay step.
    pub fn wait_for_server_with_delay(&mut self, attempts: u32, step: Duration) -> DriverResult<()> {
        if attempts == 0 {
            return Err(DriverError::configuration("wait_for_server needs at least one attempt"));
        }
        let mut delay = step;
        for attempt in 1..=attempts {
            match self.query(PING_QUERY, ()) {
                Ok(_) => return Ok(()),
                Err(e) if attempt == attempts => return Err(e),
                Err(e) => {
                    warn!(
                        "Server not ready ({}), waiting {:?} before attempt {}",
                        e,
                        delay,
                        attempt + 1
                    );
                    thread::sleep(delay);
                    delay += step;
                }
            }
        }
        Ok(())
    }

    /// The live connection, opening or rebuilding it as needed.
    ///
    /// A connection opened by another process or thread is discarded without
    /// writing to it. A defunct connection is rebuilt outside transactions;
    /// inside one the transaction is lost and an error is returned.
    pub(crate) fn ensure_connection(&mut self) -> DriverResult<&mut BoltConnection<C::Stream>> {
        let identity = OwnerIdentity::current();
        let conn = match self.connection.take() {
            Some(conn) if conn.owner() != identity => {
                debug!(
                    "Connection owned by {:?}, reconnecting from {:?}",
                    conn.owner(),
                    identity
                );
                drop(conn);
                self.open()?
            }
            Some(conn) if conn.state().is_open() => conn,
            Some(conn) if conn.tx_depth() > 0 => {
                self.connection = Some(conn);
                return Err(DriverError::connection("Connection lost inside a transaction"));
            }
            _ => self.open()?,
        };
        Ok(self.connection.insert(conn))
    }

    fn open(&self) -> DriverResult<BoltConnection<C::Stream>> {
        let address = &self.config.address;
        debug!("Connecting to {}", address);
        let stream = self
            .connector
            .connect(address)
            .map_err(|e| DriverError::connection(format!("Failed to connect to {}: {}", address, e)))?;
        BoltConnection::open(stream, &self.config)
    }
}

impl<C: Connector> Drop for Client<C> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!("GOODBYE on drop failed: {}", e);
        }
    }
}

impl<C: Connector> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.config.address)
            .field("connection", &self.connection)
            .finish()
    }
}
