//! Socket transport.
//!
//! The client never opens sockets itself; it asks a [`Connector`] for a
//! byte stream. [`TcpConnector`] is the default, tests plug in scripted
//! in-memory streams, and a TLS-capable connector can wrap any stream type.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::config::{ClientConfig, ServerAddress};

/// Opens byte streams to a server.
pub trait Connector {
    /// Stream type handed to the connection.
    type Stream: Read + Write;

    /// Open a stream to `address`.
    fn connect(&self, address: &ServerAddress) -> io::Result<Self::Stream>;
}

/// Plain TCP connector with `TCP_NODELAY` and optional timeouts.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    /// Connector without timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector using the timeouts from `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, address: &ServerAddress) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in address.to_socket_addr().to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(last_err.unwrap_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::NotFound,
                                format!("No addresses resolved for {}", address),
                            )
                        }))
                    }
                }
            }
            None => TcpStream::connect(address.to_socket_addr())?,
        };

        // Lower latency for small request/response messages
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        Ok(stream)
    }
}

/// Process and thread that created a connection.
///
/// A socket inherited across `fork` or moved to another thread must not be
/// reused; the client compares this against [`OwnerIdentity::current`]
/// before every transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerIdentity {
    /// Operating system process id
    pub process: u32,
    /// Thread id within the process
    pub thread: ThreadId,
}

impl OwnerIdentity {
    /// Identity of the calling thread.
    pub fn current() -> Self {
        Self {
            process: std::process::id(),
            thread: thread::current().id(),
        }
    }
}
