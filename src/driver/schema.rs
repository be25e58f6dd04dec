//! Constraint and index reconciliation.
//!
//! Managed schema objects carry the [`SCHEMA_PREFIX`] in their name. Those
//! are created when wanted and dropped when no longer listed; anything else
//! on the server is left alone.

use std::collections::HashSet;

use tracing::info;

use super::client::Client;
use super::error::{DriverError, DriverResult};
use super::transport::Connector;

/// Name prefix of constraints and indexes this client manages.
pub const SCHEMA_PREFIX: &str = "bolt_client_";

/// A `Label/property` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SchemaEntry<'a> {
    label: &'a str,
    property: &'a str,
}

impl<'a> SchemaEntry<'a> {
    fn parse(entry: &'a str) -> DriverResult<Self> {
        let malformed = || {
            DriverError::configuration(format!(
                "Invalid schema entry '{}', expected Label/property",
                entry
            ))
        };
        let (label, property) = entry.split_once('/').ok_or_else(malformed)?;
        if !is_word(label) || !is_word(property) {
            return Err(malformed());
        }
        Ok(Self { label, property })
    }

    fn name(&self) -> String {
        format!("{}{}_{}", SCHEMA_PREFIX, self.label, self.property)
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl<C: Connector> Client<C> {
    /// Make the managed uniqueness constraints and indexes match the lists.
    ///
    /// Each entry is `Label/property`. Malformed entries are rejected before
    /// any query runs.
    pub fn setup_constraints_and_indexes(&mut self, constraints: &[&str], indexes: &[&str]) -> DriverResult<()> {
        let constraints = constraints
            .iter()
            .map(|c| SchemaEntry::parse(c))
            .collect::<DriverResult<Vec<_>>>()?;
        let indexes = indexes
            .iter()
            .map(|i| SchemaEntry::parse(i))
            .collect::<DriverResult<Vec<_>>>()?;

        let wanted_constraints: HashSet<String> = constraints.iter().map(SchemaEntry::name).collect();
        let wanted_indexes: HashSet<String> = indexes.iter().map(SchemaEntry::name).collect();

        for entry in &constraints {
            self.query(
                &format!(
                    "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                    entry.name(),
                    entry.label,
                    entry.property
                ),
                (),
            )?;
        }
        for entry in &indexes {
            self.query(
                &format!(
                    "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{})",
                    entry.name(),
                    entry.label,
                    entry.property
                ),
                (),
            )?;
        }

        for row in self.query("SHOW ALL CONSTRAINTS", ())? {
            let name = row.get_string("name")?;
            if name.starts_with(SCHEMA_PREFIX) && !wanted_constraints.contains(&name) {
                info!("Dropping constraint {}", name);
                self.query(&format!("DROP CONSTRAINT {}", name), ())?;
            }
        }

        // Uniqueness constraints are backed by an index of the same name.
        for row in self.query("SHOW ALL INDEXES", ())? {
            let name = row.get_string("name")?;
            if name.starts_with(SCHEMA_PREFIX)
                && !wanted_indexes.contains(&name)
                && !wanted_constraints.contains(&name)
            {
                info!("Dropping index {}", name);
                self.query(&format!("DROP INDEX {}", name), ())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name() {
        let entry = SchemaEntry::parse("Person/email").unwrap();
        assert_eq!(entry.label, "Person");
        assert_eq!(entry.property, "email");
        assert_eq!(entry.name(), "bolt_client_Person_email");
    }

    #[test]
    fn test_malformed_entries() {
        for bad in ["Person", "Person/", "/email", "Per son/email", "A/b/c", ""] {
            let err = SchemaEntry::parse(bad).unwrap_err();
            assert!(matches!(err, DriverError::Configuration(_)), "{}", bad);
        }
    }
}
