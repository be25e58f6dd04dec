//! Blocking Bolt connection used by the client.
//!
//! ```text
//! Client
//!   └── BoltConnection (stream + framing + state mirror)
//!         ├── ChunkCodec (bolt::codec)
//!         ├── Handshake (bolt::handshake)
//!         └── Message Types (bolt::message)
//! ```

pub mod connection;

pub use connection::{BoltConnection, PullEvent};
