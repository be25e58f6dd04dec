//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client. The builders
//! on each message exist so tests can script a server conversation.

use super::tag;
use crate::bolt::error::ServerFailure;
use crate::bolt::packstream::{PackStreamError, PackStreamMap, PackStreamStructure, PackStreamValue};

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Operation completed successfully
    Success(SuccessMessage),
    /// RECORD - Query result record
    Record(RecordMessage),
    /// FAILURE - Operation failed
    Failure(FailureMessage),
    /// IGNORED - Message was ignored (connection in FAILED state)
    Ignored,
}

impl BoltResponse {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltResponse::Success(_) => tag::SUCCESS,
            BoltResponse::Record(_) => tag::RECORD,
            BoltResponse::Failure(_) => tag::FAILURE,
            BoltResponse::Ignored => tag::IGNORED,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(msg) => msg.to_structure(),
            BoltResponse::Record(msg) => msg.to_structure(),
            BoltResponse::Failure(msg) => msg.to_structure(),
            BoltResponse::Ignored => PackStreamStructure::new(tag::IGNORED, vec![]),
        }
    }

    /// Interpret a decoded top-level value.
    pub fn from_value(value: PackStreamValue) -> Result<Self, PackStreamError> {
        match value {
            PackStreamValue::Structure(s) => Self::from_structure(s),
            other => Err(PackStreamError::InvalidStructure(format!(
                "expected response structure, got {}",
                other.type_name()
            ))),
        }
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.tag {
            tag::SUCCESS => Ok(BoltResponse::Success(SuccessMessage::from_structure(s)?)),
            tag::RECORD => Ok(BoltResponse::Record(RecordMessage::from_structure(s)?)),
            tag::FAILURE => Ok(BoltResponse::Failure(FailureMessage::from_structure(s)?)),
            tag::IGNORED => Ok(BoltResponse::Ignored),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "Unknown response message tag: 0x{:02X}",
                s.tag
            ))),
        }
    }
}

/// SUCCESS message - Operation completed successfully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: PackStreamMap,
}

impl SuccessMessage {
    /// Create a new SUCCESS message with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add metadata entry.
    pub fn with(mut self, key: &str, value: impl Into<PackStreamValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    /// Get server agent.
    pub fn server(&self) -> Option<&str> {
        self.get("server").and_then(|v| v.as_str())
    }

    /// Get connection ID.
    pub fn connection_id(&self) -> Option<&str> {
        self.get("connection_id").and_then(|v| v.as_str())
    }

    /// Take the field names from a RUN success.
    pub fn take_fields(&mut self) -> Option<Vec<String>> {
        match self.metadata.shift_remove("fields")? {
            PackStreamValue::List(list) => Some(
                list.into_iter()
                    .filter_map(|item| match item {
                        PackStreamValue::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Check if there are more results.
    pub fn has_more(&self) -> bool {
        self.get("has_more").and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Create a RUN success response.
    pub fn run_success(fields: &[&str]) -> Self {
        let list = fields.iter().map(|f| PackStreamValue::from(*f)).collect::<Vec<_>>();
        Self::new().with("fields", list)
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::SUCCESS, vec![PackStreamValue::Map(self.metadata.clone())])
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.fields.into_iter().next() {
            Some(PackStreamValue::Map(metadata)) => Ok(Self { metadata }),
            None => Ok(Self::new()),
            Some(_) => Err(PackStreamError::InvalidStructure(
                "SUCCESS metadata must be map".to_string(),
            )),
        }
    }
}

/// RECORD message - Query result record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMessage {
    /// Field values
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a new RECORD message.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }

    /// Get field count.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if record is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::RECORD, vec![PackStreamValue::List(self.fields.clone())])
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.fields.into_iter().next() {
            Some(PackStreamValue::List(fields)) => Ok(Self { fields }),
            None => Ok(Self { fields: Vec::new() }),
            Some(_) => Err(PackStreamError::InvalidStructure(
                "RECORD fields must be list".to_string(),
            )),
        }
    }
}

/// FAILURE message - Operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Server error code
    pub code: String,
    /// Error message
    pub message: String,
}

impl FailureMessage {
    /// Create a new FAILURE message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Check if this is a client error.
    pub fn is_client_error(&self) -> bool {
        self.code.contains("ClientError")
    }

    /// Check if this is a transient error.
    pub fn is_transient(&self) -> bool {
        self.code.contains("TransientError")
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut metadata = PackStreamMap::new();
        metadata.insert("code".to_string(), PackStreamValue::from(self.code.as_str()));
        metadata.insert("message".to_string(), PackStreamValue::from(self.message.as_str()));
        PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Map(metadata)])
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        let metadata = match s.fields.into_iter().next() {
            Some(PackStreamValue::Map(m)) => m,
            _ => {
                return Err(PackStreamError::InvalidStructure(
                    "FAILURE requires metadata map".to_string(),
                ))
            }
        };
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| PackStreamError::InvalidStructure(format!("FAILURE requires {}", key)))
        };
        Ok(Self {
            code: text("code")?,
            message: text("message")?,
        })
    }
}

impl From<FailureMessage> for ServerFailure {
    fn from(msg: FailureMessage) -> Self {
        ServerFailure {
            code: msg.code,
            message: msg.message,
        }
    }
}

impl std::fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::{decode, encode};

    fn reparse(response: &BoltResponse) -> BoltResponse {
        let bytes = encode(&PackStreamValue::Structure(response.to_structure())).unwrap();
        BoltResponse::from_value(decode(&bytes).unwrap()).unwrap()
    }

    #[test]
    fn test_success_metadata() {
        let msg = SuccessMessage::new()
            .with("server", "Neo4j/5.20.0")
            .with("connection_id", "bolt-123");
        let BoltResponse::Success(parsed) = reparse(&BoltResponse::Success(msg)) else {
            panic!("expected success");
        };
        assert_eq!(parsed.server(), Some("Neo4j/5.20.0"));
        assert_eq!(parsed.connection_id(), Some("bolt-123"));
        assert!(!parsed.has_more());
    }

    #[test]
    fn test_take_fields() {
        let mut msg = SuccessMessage::run_success(&["name", "age"]).with("t_first", 3i64);
        assert_eq!(msg.take_fields().unwrap(), vec!["name", "age"]);
        assert!(msg.get("fields").is_none());
        assert!(msg.take_fields().is_none());
    }

    #[test]
    fn test_record_and_failure() {
        let record = BoltResponse::Record(RecordMessage::new(vec![PackStreamValue::from("Alice")]));
        assert_eq!(reparse(&record), record);

        let failure = BoltResponse::Failure(FailureMessage::new(
            "Neo.ClientError.Statement.SyntaxError",
            "Invalid input",
        ));
        assert_eq!(reparse(&failure), failure);
        assert_eq!(reparse(&BoltResponse::Ignored), BoltResponse::Ignored);
    }

    #[test]
    fn test_unknown_tag() {
        let s = PackStreamStructure::new(0x4E, vec![]);
        assert!(matches!(
            BoltResponse::from_structure(s),
            Err(PackStreamError::InvalidStructure(_))
        ));
        assert!(BoltResponse::from_value(PackStreamValue::Integer(1)).is_err());
    }

    #[test]
    fn test_failure_classification() {
        let msg = FailureMessage::new("Neo.TransientError.Transaction.DeadlockDetected", "x");
        assert!(msg.is_transient());
        assert!(!msg.is_client_error());
        let failure: ServerFailure = msg.into();
        assert_eq!(failure.code, "Neo.TransientError.Transaction.DeadlockDetected");
    }

    #[test]
    fn test_failure_without_code() {
        let mut metadata = PackStreamMap::new();
        metadata.insert("message".to_string(), PackStreamValue::from("x"));
        let s = PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Map(metadata)]);
        assert!(FailureMessage::from_structure(s).is_err());
    }
}
