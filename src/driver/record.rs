//! Query result record.

use std::fmt;
use std::sync::Arc;

use super::error::{DriverError, DriverResult};
use super::types::{Node, PropertyMap, Relationship, Value};

// ============================================================================
// Record
// ============================================================================

/// One result row: the query's field names zipped with the row values.
///
/// Field names are shared by every row of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record.
    pub fn new(keys: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// Field names
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Values in field order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by field name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys
            .iter()
            .position(|k| k == key)
            .and_then(|i| self.values.get(i))
    }

    /// Get a value by position.
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by field name, converted.
    pub fn get_as<T>(&self, key: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        self.get(key)
            .cloned()
            .ok_or_else(|| DriverError::type_conversion(format!("Key '{}' not found", key)))
            .and_then(T::try_from)
    }

    pub fn get_int(&self, key: &str) -> DriverResult<i64> {
        self.get_as::<i64>(key)
    }

    pub fn get_string(&self, key: &str) -> DriverResult<String> {
        self.get_as::<String>(key)
    }

    pub fn get_node(&self, key: &str) -> DriverResult<Node> {
        self.get_as::<Node>(key)
    }

    pub fn get_relationship(&self, key: &str) -> DriverResult<Relationship> {
        self.get_as::<Relationship>(key)
    }

    /// Field names mapped to values, in field order.
    pub fn to_map(&self) -> PropertyMap {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }

    /// Take the value at `index`, leaving null behind.
    pub fn take(&mut self, index: usize) -> Option<Value> {
        self.values.get_mut(index).map(std::mem::take)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl IntoIterator for Record {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}
