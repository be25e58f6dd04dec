//! Graph entity structures carried inside RECORD values.

use super::marker::*;
use super::types::{PackStreamMap, PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// A Node structure in PackStream format.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamNode {
    /// Node ID
    pub id: i64,
    /// Node labels
    pub labels: Vec<String>,
    /// Node properties
    pub properties: PackStreamMap,
    /// Element ID (Bolt 5.x)
    pub element_id: Option<String>,
}

impl PackStreamNode {
    /// Create a new node.
    pub fn new(id: i64, labels: Vec<String>, properties: PackStreamMap) -> Self {
        Self {
            id,
            labels,
            properties,
            element_id: None,
        }
    }

    /// Set the element ID.
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    /// Convert to PackStreamValue.
    pub fn to_value(&self) -> PackStreamValue {
        let mut fields = vec![
            PackStreamValue::Integer(self.id),
            PackStreamValue::List(self.labels.iter().map(|s| PackStreamValue::from(s.as_str())).collect()),
            PackStreamValue::Map(self.properties.clone()),
        ];
        if let Some(element_id) = &self.element_id {
            fields.push(PackStreamValue::from(element_id.as_str()));
        }
        PackStreamValue::Structure(PackStreamStructure::new(NODE_TAG, fields))
    }

    /// Build from a decoded structure, taking ownership of its fields.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.tag != NODE_TAG {
            return Err(invalid(format!(
                "expected Node tag 0x{:02X}, got 0x{:02X}",
                NODE_TAG, s.tag
            )));
        }
        if s.fields.len() < 3 {
            return Err(invalid("Node requires at least 3 fields"));
        }

        let mut fields = s.fields.into_iter();
        let id = take_int(fields.next(), "Node id")?;
        let labels = match fields.next() {
            Some(PackStreamValue::List(items)) => items
                .into_iter()
                .map(|v| match v {
                    PackStreamValue::String(s) => Ok(s),
                    _ => Err(invalid("Label must be string")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(invalid("Node labels must be list")),
        };
        let properties = take_map(fields.next(), "Node properties")?;
        let element_id = take_opt_string(fields.next());

        Ok(Self {
            id,
            labels,
            properties,
            element_id,
        })
    }
}

/// A Relationship structure in PackStream format.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamRelationship {
    /// Relationship ID
    pub id: i64,
    /// Start node ID
    pub start_node_id: i64,
    /// End node ID
    pub end_node_id: i64,
    /// Relationship type
    pub rel_type: String,
    /// Relationship properties
    pub properties: PackStreamMap,
    /// Element ID (Bolt 5.x)
    pub element_id: Option<String>,
    /// Start node element ID (Bolt 5.x)
    pub start_node_element_id: Option<String>,
    /// End node element ID (Bolt 5.x)
    pub end_node_element_id: Option<String>,
}

impl PackStreamRelationship {
    /// Create a new relationship.
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        properties: PackStreamMap,
    ) -> Self {
        Self {
            id,
            start_node_id,
            end_node_id,
            rel_type: rel_type.into(),
            properties,
            element_id: None,
            start_node_element_id: None,
            end_node_element_id: None,
        }
    }

    /// Convert to PackStreamValue.
    pub fn to_value(&self) -> PackStreamValue {
        let mut fields = vec![
            PackStreamValue::Integer(self.id),
            PackStreamValue::Integer(self.start_node_id),
            PackStreamValue::Integer(self.end_node_id),
            PackStreamValue::from(self.rel_type.as_str()),
            PackStreamValue::Map(self.properties.clone()),
        ];
        if let Some(element_id) = &self.element_id {
            let text = |v: &Option<String>| PackStreamValue::from(v.as_deref().unwrap_or_default());
            fields.push(PackStreamValue::from(element_id.as_str()));
            fields.push(text(&self.start_node_element_id));
            fields.push(text(&self.end_node_element_id));
        }
        PackStreamValue::Structure(PackStreamStructure::new(RELATIONSHIP_TAG, fields))
    }

    /// Build from a decoded structure, taking ownership of its fields.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.tag != RELATIONSHIP_TAG {
            return Err(invalid(format!(
                "expected Relationship tag 0x{:02X}, got 0x{:02X}",
                RELATIONSHIP_TAG, s.tag
            )));
        }
        if s.fields.len() < 5 {
            return Err(invalid("Relationship requires at least 5 fields"));
        }

        let mut fields = s.fields.into_iter();
        let id = take_int(fields.next(), "Relationship id")?;
        let start_node_id = take_int(fields.next(), "Relationship start id")?;
        let end_node_id = take_int(fields.next(), "Relationship end id")?;
        let rel_type = match fields.next() {
            Some(PackStreamValue::String(s)) => s,
            _ => return Err(invalid("Relationship type must be string")),
        };
        let properties = take_map(fields.next(), "Relationship properties")?;

        Ok(Self {
            id,
            start_node_id,
            end_node_id,
            rel_type,
            properties,
            element_id: take_opt_string(fields.next()),
            start_node_element_id: take_opt_string(fields.next()),
            end_node_element_id: take_opt_string(fields.next()),
        })
    }
}

fn invalid(msg: impl Into<String>) -> PackStreamError {
    PackStreamError::InvalidStructure(msg.into())
}

fn take_int(value: Option<PackStreamValue>, what: &str) -> Result<i64, PackStreamError> {
    match value {
        Some(PackStreamValue::Integer(i)) => Ok(i),
        _ => Err(invalid(format!("{} must be integer", what))),
    }
}

fn take_map(value: Option<PackStreamValue>, what: &str) -> Result<PackStreamMap, PackStreamError> {
    match value {
        Some(PackStreamValue::Map(m)) => Ok(m),
        _ => Err(invalid(format!("{} must be map", what))),
    }
}

fn take_opt_string(value: Option<PackStreamValue>) -> Option<String> {
    match value {
        Some(PackStreamValue::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> PackStreamMap {
        let mut props = PackStreamMap::new();
        props.insert("name".to_string(), PackStreamValue::from("Alice"));
        props
    }

    #[test]
    fn test_node_from_v4_structure() {
        let node = PackStreamNode::new(7, vec!["Person".into()], props());
        let PackStreamValue::Structure(s) = node.to_value() else {
            panic!("expected structure");
        };
        assert_eq!(s.fields.len(), 3);
        let parsed = PackStreamNode::from_structure(s).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_node_with_element_id() {
        let node = PackStreamNode::new(7, vec![], PackStreamMap::new()).with_element_id("4:abc:7");
        let PackStreamValue::Structure(s) = node.to_value() else {
            panic!("expected structure");
        };
        let parsed = PackStreamNode::from_structure(s).unwrap();
        assert_eq!(parsed.element_id.as_deref(), Some("4:abc:7"));
    }

    #[test]
    fn test_relationship_from_structure() {
        let rel = PackStreamRelationship::new(3, 1, 2, "KNOWS", props());
        let PackStreamValue::Structure(s) = rel.to_value() else {
            panic!("expected structure");
        };
        let parsed = PackStreamRelationship::from_structure(s).unwrap();
        assert_eq!(parsed.rel_type, "KNOWS");
        assert_eq!(parsed.start_node_id, 1);
        assert_eq!(parsed.end_node_id, 2);
        assert_eq!(parsed.element_id, None);
    }

    #[test]
    fn test_malformed_node() {
        let s = PackStreamStructure::new(
            NODE_TAG,
            vec![
                PackStreamValue::from("not an id"),
                PackStreamValue::List(vec![]),
                PackStreamValue::Map(PackStreamMap::new()),
            ],
        );
        assert!(matches!(
            PackStreamNode::from_structure(s),
            Err(PackStreamError::InvalidStructure(_))
        ));
    }
}
