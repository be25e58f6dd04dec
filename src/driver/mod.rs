//! Driver Module
//!
//! Blocking client for a Bolt graph database server.
//!
//! - [`Client`] - one lazily opened connection per handle
//! - [`Client::transaction`] - re-entrant transaction scopes
//! - [`Client::run_query`] / [`Client::query`] / [`Client::expect_one`] - query execution
//! - [`Client::dump_database`] / [`Client::load_database_dump`] - dump and restore
//! - [`Client::setup_constraints_and_indexes`] - schema reconciliation
//!
//! # Example
//!
//! ```ignore
//! use bolt_client::driver::{AuthToken, Client, ClientConfig};
//! use serde_json::json;
//!
//! let config = ClientConfig::builder("bolt://localhost:7687", AuthToken::basic("neo4j", "password"))?
//!     .with_verbosity(1)
//!     .build()?;
//! let mut client = Client::new(config);
//!
//! client.transaction(|tx| {
//!     tx.query("CREATE (n:Person {name: $name})", json!({"name": "Alice"}))?;
//!     let row = tx.expect_one("MATCH (n:Person) RETURN count(n) AS count", ())?;
//!     println!("{}", row.get_int("count")?);
//!     Ok::<_, bolt_client::driver::DriverError>(())
//! })?;
//! ```

pub mod bolt;
mod client;
mod config;
mod dump;
mod error;
mod query;
mod record;
mod schema;
mod transaction;
mod transport;
mod types;

// Re-exports
pub use client::Client;
pub use config::{AuthToken, ClientConfig, ClientConfigBuilder, ServerAddress, DEFAULT_PORT, DEFAULT_USER_AGENT};
pub use dump::LoadSummary;
pub use error::{DriverError, DriverResult};
pub use record::Record;
pub use schema::SCHEMA_PREFIX;
pub use transport::{Connector, OwnerIdentity, TcpConnector};
pub use types::{Node, PropertyMap, Relationship, Value};

/// Build a parameter map.
///
/// ```ignore
/// let rows = client.query("MATCH (n) WHERE n.age > $age RETURN n", params! {"age" => 30})?;
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::driver::PropertyMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::driver::PropertyMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::driver::Value::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_macro() {
        let empty: PropertyMap = params!();
        assert!(empty.is_empty());

        let map = params! {"name" => "Alice", "age" => 30i64};
        assert_eq!(map.keys().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(map["name"], Value::String("Alice".into()));
        assert_eq!(map["age"], Value::Integer(30));
    }
}
