//! # Bolt Protocol Implementation
//!
//! Low-level Bolt protocol pieces, independent of any socket:
//!
//! - [`packstream`] - Binary serialization/deserialization
//! - [`codec`] - Chunked message framing
//! - [`message`] - Bolt message types (HELLO, RUN, PULL, etc.)
//! - [`handshake`] - Version negotiation
//! - [`state`] - Server state tracking
//! - [`error`] - Protocol error types
//!
//! Most users should use [`crate::driver::Client`] instead of interacting
//! with the protocol directly.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;
pub mod state;

pub use codec::{ChunkCodec, InboundMessage};
pub use error::{BoltError, BoltErrorCode, BoltResult, HandshakeError, ServerFailure};
pub use handshake::{BoltVersion, Handshake, BOLT_MAGIC};
pub use message::{
    AuthToken, BeginMessage, BoltRequest, BoltResponse, FailureMessage, HelloMessage,
    LogonMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage,
};
pub use packstream::{
    PackStreamDecoder, PackStreamEncoder, PackStreamError, PackStreamMap, PackStreamNode,
    PackStreamRelationship, PackStreamStructure, PackStreamValue,
};
pub use state::{RequestKind, ServerState};
