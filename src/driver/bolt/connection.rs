//! Bolt protocol connection for client-side use.
//!
//! Handles handshake, session bootstrap, message framing and the server
//! state mirror over any blocking `Read + Write` stream.

use std::io::{Read, Write};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::bolt::codec::{hex_dump, ChunkCodec, InboundMessage};
use crate::bolt::handshake::{Handshake, HANDSHAKE_RESPONSE_SIZE};
use crate::bolt::message::{
    BoltRequest, BoltResponse, HelloMessage, LogonMessage, PullMessage, SuccessMessage,
};
use crate::bolt::packstream::{PackStreamDecoder, PackStreamEncoder, PackStreamValue};
use crate::bolt::{BoltError, BoltVersion, RequestKind, ServerFailure, ServerState};
use crate::driver::config::ClientConfig;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::transport::OwnerIdentity;

const READ_BUFFER_SIZE: usize = 8192;

/// Outcome of reading one message while a result is streaming.
#[derive(Debug)]
pub enum PullEvent {
    /// A RECORD with its raw field values
    Record(Vec<PackStreamValue>),
    /// The stream summary
    Summary(SuccessMessage),
}

/// Client-side Bolt connection.
///
/// Owns the stream, the server state mirror and the transaction bookkeeping
/// of one session. Every FAILURE is answered with an automatic RESET before
/// the error is returned, so the connection is never left in FAILED.
pub struct BoltConnection<S> {
    stream: S,
    codec: ChunkCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    encoder: PackStreamEncoder,
    version: BoltVersion,
    state: ServerState,
    verbosity: u8,
    owner: OwnerIdentity,
    server_agent: Option<String>,
    connection_id: Option<String>,
    tx_depth: usize,
    tx_failed: bool,
}

impl<S: Read + Write> BoltConnection<S> {
    /// Negotiate a version over `stream` and bootstrap the session.
    ///
    /// Sends HELLO, and LOGON when the negotiated version needs it. On
    /// success the connection is READY.
    pub fn open(mut stream: S, config: &ClientConfig) -> DriverResult<Self> {
        let handshake = config.handshake()?;
        let version = perform_handshake(&mut stream, &handshake)?;
        debug!("Negotiated Bolt {} with {}", version, config.address);

        let mut conn = Self {
            stream,
            codec: ChunkCodec::with_max_size(config.max_message_size),
            read_buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            write_buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            encoder: PackStreamEncoder::with_capacity(1024),
            version,
            state: ServerState::Connected,
            verbosity: config.verbosity,
            owner: OwnerIdentity::current(),
            server_agent: None,
            connection_id: None,
            tx_depth: 0,
            tx_failed: false,
        };

        let hello = HelloMessage::new(version, &config.user_agent, config.auth.clone())
            .with_bolt_agent(&config.user_agent);
        let success = conn.request(BoltRequest::Hello(hello))?;
        conn.server_agent = success.server().map(str::to_string);
        conn.connection_id = success.connection_id().map(str::to_string);

        if conn.state == ServerState::Authenticating {
            conn.request(BoltRequest::Logon(LogonMessage::new(config.auth.clone())))?;
        }

        debug!(
            "Session ready (server: {}, connection: {})",
            conn.server_agent.as_deref().unwrap_or("unknown"),
            conn.connection_id.as_deref().unwrap_or("unknown")
        );
        Ok(conn)
    }

    /// Send a request and read its summary.
    ///
    /// Must not be used for PULL, whose records are read with
    /// [`BoltConnection::next_pull_event`].
    pub fn request(&mut self, request: BoltRequest) -> DriverResult<SuccessMessage> {
        let kind = request.kind();
        self.send(&request)?;
        self.read_summary(kind)
    }

    /// Send PULL for all remaining records.
    pub fn pull_all(&mut self) -> DriverResult<()> {
        self.send(&BoltRequest::Pull(PullMessage::all()))
    }

    /// Read the next RECORD or the closing summary of a PULL.
    pub fn next_pull_event(&mut self) -> DriverResult<PullEvent> {
        match self.recv()? {
            BoltResponse::Record(record) if self.state.is_streaming() => {
                Ok(PullEvent::Record(record.fields))
            }
            BoltResponse::Success(success) => {
                self.transition(self.state.on_success(RequestKind::Pull, success.has_more()));
                Ok(PullEvent::Summary(success))
            }
            BoltResponse::Failure(failure) => Err(self.handle_failure(RequestKind::Pull, failure.into())),
            other => Err(self.unexpected(&other)),
        }
    }

    /// Read and drop the rest of a streaming result.
    pub fn discard_stream(&mut self) -> DriverResult<()> {
        while self.state.is_streaming() {
            if let PullEvent::Summary(summary) = self.next_pull_event()? {
                if summary.has_more() {
                    self.pull_all()?;
                }
            }
        }
        Ok(())
    }

    /// Encode, frame and write one request.
    ///
    /// Illegal requests for the current state fail with `InvalidState`
    /// without touching the socket.
    pub fn send(&mut self, request: &BoltRequest) -> DriverResult<()> {
        let kind = request.kind();
        if !self.state.can_send(kind) {
            return Err(BoltError::InvalidState {
                request: kind.name(),
                state: self.state,
            }
            .into());
        }

        let start = self.encoder.len();
        if let Err(e) = self
            .encoder
            .encode(&PackStreamValue::Structure(request.to_structure()))
        {
            self.encoder.truncate(start);
            return Err(e.into());
        }
        let payload = self.encoder.split();

        self.write_buffer.clear();
        self.codec.encode(&payload[..], &mut self.write_buffer)?;

        if self.verbosity >= 2 {
            trace!("C: {} ({} bytes) in {}", request.name(), payload.len(), self.state);
        }

        let written = self
            .stream
            .write_all(&self.write_buffer)
            .and_then(|_| self.stream.flush());
        if let Err(e) = written {
            self.state = ServerState::Defunct;
            return Err(DriverError::connection(format!("Send failed: {}", e)));
        }

        if !kind.expects_response() {
            self.transition(self.state.on_success(kind, false));
        }
        Ok(())
    }

    /// Read and decode one response message.
    pub fn recv(&mut self) -> DriverResult<BoltResponse> {
        let message = self.read_message()?;

        if self.verbosity >= 3 {
            trace!("S: {} bytes\n{}", message.payload.len(), hex_dump(&message.payload, message.offset));
        }

        let mut decoder = PackStreamDecoder::with_offset(&message.payload, message.offset);
        let decoded = decoder.decode().and_then(BoltResponse::from_value);
        let response = match decoded {
            Ok(response) => response,
            Err(e) => {
                self.state = ServerState::Defunct;
                return Err(e.into());
            }
        };
        if !decoder.is_empty() {
            self.state = ServerState::Defunct;
            return Err(DriverError::Protocol {
                message: format!("{} trailing bytes after {}", decoder.remaining(), response.name()),
                offset: Some(decoder.offset()),
            });
        }

        if self.verbosity >= 2 {
            trace!("S: {}", response.name());
        }
        Ok(response)
    }

    /// Reassemble the next inbound message from the stream.
    pub fn read_message(&mut self) -> DriverResult<InboundMessage> {
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(message)) => return Ok(message),
                Ok(None) => {}
                Err(e) => {
                    self.state = ServerState::Defunct;
                    return Err(e.into());
                }
            }

            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state = ServerState::Defunct;
                    return Err(DriverError::connection(format!("Read failed: {}", e)));
                }
            };

            if n == 0 {
                self.state = ServerState::Defunct;
                return match self.codec.decode_eof(&mut self.read_buffer) {
                    Ok(Some(message)) => Ok(message),
                    Ok(None) | Err(_) => Err(BoltError::ConnectionClosed.into()),
                };
            }
            self.read_buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Send RESET and require SUCCESS, returning the connection to READY.
    pub fn reset(&mut self) -> DriverResult<()> {
        self.request(BoltRequest::Reset).map(|_| ())
    }

    /// Send GOODBYE and mark the connection defunct.
    pub fn goodbye(&mut self) -> DriverResult<()> {
        if !self.state.is_open() {
            return Ok(());
        }
        let result = self.send(&BoltRequest::Goodbye);
        self.state = ServerState::Defunct;
        result
    }

    fn read_summary(&mut self, kind: RequestKind) -> DriverResult<SuccessMessage> {
        match self.recv()? {
            BoltResponse::Success(success) => {
                self.transition(self.state.on_success(kind, success.has_more()));
                Ok(success)
            }
            BoltResponse::Failure(failure) => Err(self.handle_failure(kind, failure.into())),
            other => Err(self.unexpected(&other)),
        }
    }

    /// FAILURE handling: FAILED, then RESET back to READY, then the error.
    fn handle_failure(&mut self, kind: RequestKind, failure: ServerFailure) -> DriverError {
        let next = self.state.on_failure(kind);
        self.transition(next);
        if self.tx_depth > 0 {
            self.tx_failed = true;
        }
        if self.verbosity >= 1 {
            debug!("Server failure: {}", failure);
        }

        if next == ServerState::Failed {
            if let Err(e) = self.reset() {
                warn!("Automatic RESET after failure did not succeed: {}", e);
                self.state = ServerState::Defunct;
            }
        }
        DriverError::from(BoltError::Failure(failure))
    }

    fn unexpected(&mut self, response: &BoltResponse) -> DriverError {
        let err = DriverError::UnexpectedServerResponse {
            response: response.name().to_string(),
            state: self.state,
        };
        self.state = ServerState::Defunct;
        err
    }

    fn transition(&mut self, next: ServerState) {
        if self.verbosity >= 2 && next != self.state {
            trace!("State {} -> {}", self.state, next);
        }
        self.state = next;
    }

    /// Mark the connection unusable after a fatal error.
    pub fn mark_defunct(&mut self) {
        self.state = ServerState::Defunct;
    }

    /// Current server state.
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// Server agent reported in the HELLO summary.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Connection id reported in the HELLO summary.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Process and thread that opened this connection.
    pub fn owner(&self) -> OwnerIdentity {
        self.owner
    }

    /// Logging verbosity.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Open transaction scopes.
    pub fn tx_depth(&self) -> usize {
        self.tx_depth
    }

    /// Whether the current transaction has seen an error.
    pub fn tx_failed(&self) -> bool {
        self.tx_failed
    }

    pub(crate) fn enter_transaction(&mut self) -> usize {
        self.tx_depth += 1;
        self.tx_depth
    }

    /// Leave one scope; returns the remaining depth.
    pub(crate) fn leave_transaction(&mut self) -> usize {
        self.tx_depth = self.tx_depth.saturating_sub(1);
        self.tx_depth
    }

    pub(crate) fn set_tx_failed(&mut self, failed: bool) {
        self.tx_failed = failed;
    }
}

impl<S> std::fmt::Debug for BoltConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltConnection")
            .field("version", &self.version)
            .field("state", &self.state)
            .field("tx_depth", &self.tx_depth)
            .field("tx_failed", &self.tx_failed)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

fn perform_handshake<S: Read + Write>(stream: &mut S, handshake: &Handshake) -> DriverResult<BoltVersion> {
    stream
        .write_all(&handshake.request_bytes())
        .and_then(|_| stream.flush())
        .map_err(|e| DriverError::connection(format!("Handshake write failed: {}", e)))?;

    let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
    stream
        .read_exact(&mut response)
        .map_err(|e| DriverError::connection(format!("Handshake read failed: {}", e)))?;

    Ok(handshake.parse_response(response).map_err(BoltError::from)?)
}
