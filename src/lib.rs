//! # Bolt Client
//!
//! A blocking client for graph databases speaking the Bolt protocol.
//!
//! ## Features
//!
//! - **Bolt Protocol 4.4 / 5.x** - handshake, HELLO/LOGON bootstrap, chunked framing
//! - **PackStream** - full value codec with serde-based parameter conversion
//! - **Transactions** - nested scopes share one server transaction
//! - **Streaming** - rows are handed to a callback as they arrive
//! - **Dump/restore** - line-oriented JSON export and batched import
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bolt_client::{AuthToken, Client, ClientConfig, DriverError};
//! use serde_json::json;
//!
//! fn main() -> Result<(), DriverError> {
//!     let config = ClientConfig::new("bolt://localhost:7687", AuthToken::basic("neo4j", "password"))?;
//!     let mut client = Client::new(config);
//!
//!     client.run_query(
//!         "MATCH (n:Person) WHERE n.age > $age RETURN n.name AS name",
//!         json!({"age": 30}),
//!         |row| {
//!             println!("{}", row.get_string("name")?);
//!             Ok::<_, DriverError>(())
//!         },
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! Everything inside the outermost [`Client::transaction`] commits together.
//! An error or panic escaping any scope rolls the whole transaction back.
//!
//! ```rust,no_run
//! # use bolt_client::{AuthToken, Client, ClientConfig, DriverError};
//! # use serde_json::json;
//! # fn example(client: &mut Client) -> Result<(), DriverError> {
//! client.transaction(|tx| {
//!     tx.query("CREATE (:Node {id: $id})", json!({"id": 1}))?;
//!     tx.transaction(|inner| inner.query("CREATE (:Node {id: 2})", ()))?;
//!     Ok::<_, DriverError>(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Client, transactions, queries, dump/restore
//! - [`bolt`] - Low-level Bolt protocol implementation
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use driver::{
    AuthToken, Client, ClientConfig, ClientConfigBuilder, Connector, DriverError, DriverResult,
    LoadSummary, Node, PropertyMap, Record, Relationship, ServerAddress, TcpConnector, Value,
};

pub use bolt::{BoltError, BoltVersion, PackStreamValue};
