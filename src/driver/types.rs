//! Driver Types
//!
//! Caller-facing values produced from decoded records. Nodes and
//! relationships are resolved from their PackStream structures before a row
//! reaches the caller.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use super::error::{DriverError, DriverResult};
use crate::bolt::packstream::marker::{NODE_TAG, RELATIONSHIP_TAG};
use crate::bolt::packstream::{
    PackStreamError, PackStreamMap, PackStreamNode, PackStreamRelationship, PackStreamValue,
};

/// Ordered property map
pub type PropertyMap = IndexMap<String, Value>;

// ============================================================================
// Value
// ============================================================================

/// Graph value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Null
    #[default]
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// List
    List(Vec<Value>),
    /// Map, in the order the server sent it
    Map(PropertyMap),
    /// Node
    Node(Node),
    /// Relationship
    Relationship(Relationship),
}

impl Value {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as map.
    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get as node.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Get as relationship.
    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Value::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Node(_) => "Node",
            Value::Relationship(_) => "Relationship",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(l) => write!(f, "[{} items]", l.len()),
            Value::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Value::Node(n) => write!(f, "{}", n),
            Value::Relationship(r) => write!(f, "{}", r),
        }
    }
}

/// Serializes as plain JSON-like data; nodes and relationships become maps.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Node(n) => n.serialize(serializer),
            Value::Relationship(r) => r.serialize(serializer),
        }
    }
}

impl TryFrom<PackStreamValue> for Value {
    type Error = PackStreamError;

    /// Resolve graph structures; any other structure tag is a decode error.
    fn try_from(value: PackStreamValue) -> Result<Self, Self::Error> {
        Ok(match value {
            PackStreamValue::Null => Value::Null,
            PackStreamValue::Boolean(b) => Value::Boolean(b),
            PackStreamValue::Integer(i) => Value::Integer(i),
            PackStreamValue::Float(f) => Value::Float(f),
            PackStreamValue::String(s) => Value::String(s),
            PackStreamValue::List(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            PackStreamValue::Map(map) => Value::Map(convert_map(map)?),
            PackStreamValue::Structure(s) => match s.tag {
                NODE_TAG => Value::Node(Node::try_from(PackStreamNode::from_structure(s)?)?),
                RELATIONSHIP_TAG => Value::Relationship(Relationship::try_from(
                    PackStreamRelationship::from_structure(s)?,
                )?),
                tag => {
                    return Err(PackStreamError::InvalidStructure(format!(
                        "Unsupported structure tag 0x{:02X} in record",
                        tag
                    )))
                }
            },
        })
    }
}

fn convert_map(map: PackStreamMap) -> Result<PropertyMap, PackStreamError> {
    map.into_iter()
        .map(|(k, v)| Ok((k, Value::try_from(v)?)))
        .collect()
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<PropertyMap> for Value {
    fn from(v: PropertyMap) -> Self {
        Value::Map(v)
    }
}

// ============================================================================
// Node
// ============================================================================

/// Graph node.
///
/// Identity is the server-assigned `id`: two nodes with the same id compare
/// equal regardless of labels or properties.
#[derive(Debug, Clone)]
pub struct Node {
    id: i64,
    labels: Vec<String>,
    properties: PropertyMap,
    element_id: Option<String>,
}

impl Node {
    /// Create a node.
    pub fn new(id: i64, labels: Vec<String>, properties: PropertyMap) -> Self {
        Self {
            id,
            labels,
            properties,
            element_id: None,
        }
    }

    /// Server-assigned id
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Labels in server order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Properties in server order
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Element id (Bolt 5.x)
    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// Whether the node carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Get a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl TryFrom<PackStreamNode> for Node {
    type Error = PackStreamError;

    fn try_from(node: PackStreamNode) -> Result<Self, Self::Error> {
        Ok(Self {
            id: node.id,
            labels: node.labels,
            properties: convert_map(node.properties)?,
            element_id: node.element_id,
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Node", 3)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("labels", &self.labels)?;
        s.serialize_field("properties", &self.properties)?;
        s.end()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.id, labels)
    }
}

// ============================================================================
// Relationship
// ============================================================================

/// Graph relationship, identified by `id` like [`Node`].
#[derive(Debug, Clone)]
pub struct Relationship {
    id: i64,
    start_node_id: i64,
    end_node_id: i64,
    rel_type: String,
    properties: PropertyMap,
    element_id: Option<String>,
}

impl Relationship {
    /// Create a relationship.
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            id,
            start_node_id,
            end_node_id,
            rel_type: rel_type.into(),
            properties,
            element_id: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn start_node_id(&self) -> i64 {
        self.start_node_id
    }

    pub fn end_node_id(&self) -> i64 {
        self.end_node_id
    }

    /// Relationship type
    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Element id (Bolt 5.x)
    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// Get a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl TryFrom<PackStreamRelationship> for Relationship {
    type Error = PackStreamError;

    fn try_from(rel: PackStreamRelationship) -> Result<Self, Self::Error> {
        Ok(Self {
            id: rel.id,
            start_node_id: rel.start_node_id,
            end_node_id: rel.end_node_id,
            rel_type: rel.rel_type,
            properties: convert_map(rel.properties)?,
            element_id: rel.element_id,
        })
    }
}

impl Serialize for Relationship {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Relationship", 5)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("start", &self.start_node_id)?;
        s.serialize_field("end", &self.end_node_id)?;
        s.serialize_field("type", &self.rel_type)?;
        s.serialize_field("properties", &self.properties)?;
        s.end()
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})  [id: {}]",
            self.start_node_id, self.rel_type, self.end_node_id, self.id
        )
    }
}

// ============================================================================
// TryFrom implementations
// ============================================================================

fn mismatch(expected: &str, value: &Value) -> DriverError {
    DriverError::type_conversion(format!("Expected {}, got {}", expected, value.type_name()))
}

impl TryFrom<Value> for bool {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("Boolean", &value))
    }
}

impl TryFrom<Value> for i64 {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value.as_int().ok_or_else(|| mismatch("Integer", &value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        value.as_float().ok_or_else(|| mismatch("Float", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl TryFrom<Value> for Node {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        match value {
            Value::Node(n) => Ok(n),
            other => Err(mismatch("Node", &other)),
        }
    }
}

impl TryFrom<Value> for Relationship {
    type Error = DriverError;

    fn try_from(value: Value) -> DriverResult<Self> {
        match value {
            Value::Relationship(r) => Ok(r),
            other => Err(mismatch("Relationship", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::PackStreamStructure;
    use std::collections::HashSet;

    fn props(pairs: &[(&str, PackStreamValue)]) -> PackStreamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_node_from_structure() {
        let raw = PackStreamNode::new(
            7,
            vec!["Person".into(), "Admin".into()],
            props(&[("name", "Alice".into()), ("age", 30i64.into())]),
        )
        .with_element_id("4:abc:7");

        let value = Value::try_from(raw.to_value()).unwrap();
        let node = value.as_node().unwrap();
        assert_eq!(node.id(), 7);
        assert_eq!(node.labels(), ["Person", "Admin"]);
        assert!(node.has_label("Admin"));
        assert_eq!(node.get("name"), Some(&Value::from("Alice")));
        assert_eq!(node.properties().keys().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(node.element_id(), Some("4:abc:7"));
    }

    #[test]
    fn test_relationship_from_structure() {
        let raw = PackStreamRelationship::new(3, 1, 2, "KNOWS", props(&[("since", 2020i64.into())]));
        let value = Value::try_from(raw.to_value()).unwrap();
        let rel = value.as_relationship().unwrap();
        assert_eq!((rel.id(), rel.start_node_id(), rel.end_node_id()), (3, 1, 2));
        assert_eq!(rel.rel_type(), "KNOWS");
        assert_eq!(rel.get("since"), Some(&Value::Integer(2020)));
        assert_eq!(rel.to_string(), "(1)-[:KNOWS]->(2)  [id: 3]");
    }

    #[test]
    fn test_nested_structures_resolved() {
        let node = PackStreamNode::new(1, vec![], PackStreamMap::new()).to_value();
        let list = PackStreamValue::List(vec![node.clone(), PackStreamValue::Null]);
        let value = Value::try_from(list).unwrap();
        assert!(value.as_list().unwrap()[0].as_node().is_some());
    }

    #[test]
    fn test_unknown_structure_rejected() {
        let s = PackStreamValue::Structure(PackStreamStructure::new(0x58, vec![]));
        assert!(matches!(
            Value::try_from(s),
            Err(PackStreamError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_identity_by_id() {
        let a = Node::new(1, vec!["A".into()], PropertyMap::new());
        let b = Node::new(1, vec!["B".into()], PropertyMap::new());
        let c = Node::new(2, vec!["A".into()], PropertyMap::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<Node> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let mut properties = PropertyMap::new();
        properties.insert("z".into(), Value::Integer(1));
        properties.insert("a".into(), Value::List(vec![Value::Null, Value::Boolean(true)]));
        let node = Node::new(5, vec!["L".into()], properties);
        assert_eq!(
            serde_json::to_string(&Value::Node(node)).unwrap(),
            r#"{"id":5,"labels":["L"],"properties":{"z":1,"a":[null,true]}}"#
        );
    }

    #[test]
    fn test_try_from_value() {
        assert_eq!(i64::try_from(Value::Integer(3)).unwrap(), 3);
        assert_eq!(f64::try_from(Value::Integer(3)).unwrap(), 3.0);
        assert!(matches!(
            String::try_from(Value::Integer(3)),
            Err(DriverError::TypeConversion(_))
        ));
        assert!(Node::try_from(Value::Null).is_err());
    }
}
