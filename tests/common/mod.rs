//! Scripted in-memory server for integration tests.
//!
//! Each connection replays a [`ServerScript`]: the handshake answer followed
//! by pre-encoded responses. Everything the client writes is captured so
//! tests can decode the requests that reached the "server".

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use bolt_client::bolt::message::{tag, FailureMessage, RecordMessage, SuccessMessage};
use bolt_client::bolt::packstream::{decode, encode, PackStreamMap, PackStreamValue};
use bolt_client::bolt::{BoltResponse, BoltVersion, ChunkCodec};
use bolt_client::driver::{AuthToken, Client, ClientConfig, Connector, ServerAddress};
use bytes::BytesMut;
use parking_lot::Mutex;
use tokio_util::codec::{Decoder, Encoder};

/// Size of the client handshake: magic plus four version proposals.
const HANDSHAKE_SIZE: usize = 20;

/// Bytes one scripted connection will answer with.
#[derive(Debug, Clone, Default)]
pub struct ServerScript {
    bytes: Vec<u8>,
}

impl ServerScript {
    /// Answer the handshake with `version` and nothing else.
    pub fn handshake(version: BoltVersion) -> Self {
        Self {
            bytes: version.to_bytes().to_vec(),
        }
    }

    /// Bolt 5.4 handshake, HELLO and LOGON successes.
    pub fn bootstrap() -> Self {
        Self::handshake(BoltVersion::V5_4)
            .success_with(
                SuccessMessage::new()
                    .with("server", "Neo4j/5.20.0")
                    .with("connection_id", "bolt-1"),
            )
            .success()
    }

    pub fn response(mut self, response: BoltResponse) -> Self {
        let payload = encode(&PackStreamValue::Structure(response.to_structure())).unwrap();
        let mut out = BytesMut::new();
        ChunkCodec::new().encode(&payload[..], &mut out).unwrap();
        self.bytes.extend_from_slice(&out);
        self
    }

    pub fn success(self) -> Self {
        self.success_with(SuccessMessage::new())
    }

    pub fn success_with(self, message: SuccessMessage) -> Self {
        self.response(BoltResponse::Success(message))
    }

    pub fn failure(self, code: &str, message: &str) -> Self {
        self.response(BoltResponse::Failure(FailureMessage::new(code, message)))
    }

    pub fn record(self, fields: Vec<PackStreamValue>) -> Self {
        self.response(BoltResponse::Record(RecordMessage::new(fields)))
    }

    /// Raw bytes appended as-is.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// BEGIN success.
    pub fn begin(self) -> Self {
        self.success()
    }

    /// COMMIT success.
    pub fn commit(self) -> Self {
        self.success_with(SuccessMessage::new().with("bookmark", "bm:1"))
    }

    /// RUN success, the rows, then the final PULL success.
    pub fn result(self, fields: &[&str], rows: Vec<Vec<PackStreamValue>>) -> Self {
        let mut script = self.success_with(SuccessMessage::run_success(fields));
        for row in rows {
            script = script.record(row);
        }
        script.success()
    }

    /// BEGIN, one result, COMMIT.
    pub fn auto_commit(self, fields: &[&str], rows: Vec<Vec<PackStreamValue>>) -> Self {
        self.begin().result(fields, rows).commit()
    }
}

/// Stream handed to the client.
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Connector handing out one scripted stream per connect.
#[derive(Clone, Default)]
pub struct MockConnector {
    scripts: Arc<Mutex<VecDeque<ServerScript>>>,
    written: Arc<Mutex<Vec<Arc<Mutex<Vec<u8>>>>>>,
}

impl MockConnector {
    pub fn new(scripts: Vec<ServerScript>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            written: Arc::default(),
        }
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> usize {
        self.written.lock().len()
    }

    /// Raw bytes the client wrote on connection `index`.
    pub fn written(&self, index: usize) -> Vec<u8> {
        self.written.lock()[index].lock().clone()
    }

    /// Requests the client sent on connection `index`.
    pub fn requests(&self, index: usize) -> Vec<SentRequest> {
        decode_requests(&self.written(index))
    }

    /// Request names sent on connection `index`.
    pub fn request_names(&self, index: usize) -> Vec<&'static str> {
        self.requests(index).iter().map(|r| r.name).collect()
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(&self, _address: &ServerAddress) -> io::Result<MockStream> {
        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no scripted server"))?;
        let output = Arc::new(Mutex::new(Vec::new()));
        self.written.lock().push(Arc::clone(&output));
        Ok(MockStream {
            input: Cursor::new(script.bytes),
            output,
        })
    }
}

/// A decoded client request.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub name: &'static str,
    pub fields: Vec<PackStreamValue>,
}

impl SentRequest {
    /// Query text of a RUN.
    pub fn query(&self) -> Option<&str> {
        match self.name {
            "RUN" => self.fields.first().and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// Parameters of a RUN.
    pub fn parameters(&self) -> Option<&PackStreamMap> {
        match self.name {
            "RUN" => self.fields.get(1).and_then(|v| v.as_map()),
            _ => None,
        }
    }
}

fn request_name(tag: u8) -> &'static str {
    match tag {
        tag::HELLO => "HELLO",
        tag::LOGON => "LOGON",
        tag::BEGIN => "BEGIN",
        tag::RUN => "RUN",
        tag::PULL => "PULL",
        tag::COMMIT => "COMMIT",
        tag::ROLLBACK => "ROLLBACK",
        tag::RESET => "RESET",
        tag::GOODBYE => "GOODBYE",
        _ => "UNKNOWN",
    }
}

pub fn decode_requests(bytes: &[u8]) -> Vec<SentRequest> {
    let mut src = BytesMut::from(&bytes[HANDSHAKE_SIZE.min(bytes.len())..]);
    let mut codec = ChunkCodec::new();
    let mut requests = Vec::new();
    while let Some(message) = codec.decode(&mut src).unwrap() {
        match decode(&message.payload).unwrap() {
            PackStreamValue::Structure(s) => requests.push(SentRequest {
                name: request_name(s.tag),
                fields: s.fields,
            }),
            other => panic!("client sent a non-structure: {:?}", other),
        }
    }
    requests
}

/// Client over `scripts`, one script per connection it will open.
pub fn client(scripts: Vec<ServerScript>) -> (Client<MockConnector>, MockConnector) {
    let connector = MockConnector::new(scripts);
    let config = ClientConfig::builder("bolt://db.test:7687", AuthToken::basic("neo4j", "secret"))
        .unwrap()
        .build()
        .unwrap();
    (Client::with_connector(config, connector.clone()), connector)
}

pub fn int(v: i64) -> PackStreamValue {
    PackStreamValue::Integer(v)
}

pub fn text(v: &str) -> PackStreamValue {
    PackStreamValue::from(v)
}
