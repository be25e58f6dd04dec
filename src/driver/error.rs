//! Client error types.

use std::io;
use thiserror::Error;

use crate::bolt::error::{BoltErrorCode, ServerFailure};
use crate::bolt::packstream::PackStreamError;
use crate::bolt::{BoltError, ServerState};

// ============================================================================
// DriverError
// ============================================================================

/// Errors returned by [`Client`](super::Client) operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Socket could not be opened, version negotiation failed, or the
    /// peer went away
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error on an established socket
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed data from the server
    #[error("Protocol error{}: {message}", at_offset(.offset))]
    Protocol { message: String, offset: Option<usize> },

    /// The server answered with a message the current state does not allow
    #[error("Unexpected {response} response in state {state}")]
    UnexpectedServerResponse { response: String, state: ServerState },

    /// The client tried to send a message the current state does not allow
    #[error("Cannot send {request} in state {state}")]
    InvalidState { request: String, state: ServerState },

    /// Query text rejected by the server's parser
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A schema constraint rejected the write
    #[error("Constraint validation failed: {0}")]
    ConstraintValidationFailed(String),

    /// Any other FAILURE from the server
    #[error("Server error: {code} - {message}")]
    Server { code: String, message: String },

    /// Parameter integer outside the signed 64-bit range
    #[error("Integer out of range: {0}")]
    IntegerOutOfRange(String),

    /// The transaction body finished but an earlier failure inside it had
    /// already unwound the server transaction
    #[error("Transaction rolled back after an earlier failure")]
    RolledBack,

    /// `expect_one` saw a different number of rows
    #[error("Expected one result, but got {count}.")]
    ExpectedOneResult { count: usize },

    /// Parameters that cannot be sent
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Malformed dump input
    #[error("Invalid dump: {0}")]
    InvalidDump(String),

    /// Bad client configuration or arguments
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A row value had a different type than requested
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl DriverError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error without an offset.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
            offset: None,
        }
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid dump error.
    pub fn invalid_dump(msg: impl Into<String>) -> Self {
        Self::InvalidDump(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// Classify a FAILURE by its code.
    pub fn from_failure(failure: ServerFailure) -> Self {
        match failure.code.as_str() {
            BoltErrorCode::SYNTAX_ERROR => Self::Syntax(failure.message),
            BoltErrorCode::CONSTRAINT_VIOLATION => Self::ConstraintValidationFailed(failure.message),
            _ => Self::Server {
                code: failure.code,
                message: failure.message,
            },
        }
    }

    /// Whether the error came from a server FAILURE response.
    pub fn is_server_failure(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_) | Self::ConstraintValidationFailed(_) | Self::Server { .. }
        )
    }

    /// Whether the connection must be rebuilt after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Io(_) | Self::Protocol { .. } | Self::UnexpectedServerResponse { .. }
        )
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Io(e) => DriverError::Io(e),
            BoltError::Handshake(e) => DriverError::Connection(e.to_string()),
            BoltError::PackStream(e) => e.into(),
            BoltError::Protocol { message, offset } => DriverError::Protocol { message, offset },
            BoltError::UnexpectedResponse { response, state } => {
                DriverError::UnexpectedServerResponse { response, state }
            }
            BoltError::InvalidState { request, state } => DriverError::InvalidState {
                request: request.to_string(),
                state,
            },
            BoltError::Failure(failure) => DriverError::from_failure(failure),
            e @ BoltError::MessageTooLarge { .. } => DriverError::protocol(e.to_string()),
            BoltError::ConnectionClosed => DriverError::connection("Connection closed by server"),
        }
    }
}

impl From<PackStreamError> for DriverError {
    fn from(err: PackStreamError) -> Self {
        match err {
            PackStreamError::IntegerOutOfRange(v) => DriverError::IntegerOutOfRange(v),
            PackStreamError::Serialization(msg) => DriverError::InvalidParameters(msg),
            e @ PackStreamError::ValueTooLarge(..) => DriverError::InvalidParameters(e.to_string()),
            e => {
                let offset = e.offset();
                DriverError::Protocol {
                    message: e.to_string(),
                    offset,
                }
            }
        }
    }
}

fn at_offset(offset: &Option<usize>) -> String {
    match offset {
        Some(o) => format!(" at offset {}", o),
        None => String::new(),
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Result type for client operations.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: &str) -> DriverError {
        DriverError::from(BoltError::Failure(ServerFailure {
            code: code.to_string(),
            message: "boom".to_string(),
        }))
    }

    #[test]
    fn test_failure_classification() {
        assert!(matches!(
            failure("Neo.ClientError.Statement.SyntaxError"),
            DriverError::Syntax(ref m) if m == "boom"
        ));
        assert!(matches!(
            failure("Neo.ClientError.Schema.ConstraintValidationFailed"),
            DriverError::ConstraintValidationFailed(_)
        ));
        assert!(matches!(
            failure("Neo.DatabaseError.General.UnknownError"),
            DriverError::Server { ref code, .. } if code == "Neo.DatabaseError.General.UnknownError"
        ));
        assert!(failure("X").is_server_failure());
        assert!(!failure("X").is_fatal());
    }

    #[test]
    fn test_packstream_errors() {
        let err: DriverError = PackStreamError::IntegerOutOfRange("18446744073709551615".into()).into();
        assert!(matches!(err, DriverError::IntegerOutOfRange(_)));

        let err: DriverError = BoltError::PackStream(PackStreamError::UnknownMarker {
            marker: 0xCC,
            offset: 17,
        })
        .into();
        assert!(matches!(err, DriverError::Protocol { offset: Some(17), .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DriverError::ExpectedOneResult { count: 2 }.to_string(),
            "Expected one result, but got 2."
        );
        assert_eq!(
            DriverError::Protocol { message: "bad".into(), offset: Some(3) }.to_string(),
            "Protocol error at offset 3: bad"
        );
        assert_eq!(DriverError::protocol("bad").to_string(), "Protocol error: bad");
        let err = DriverError::InvalidState {
            request: "ROLLBACK".into(),
            state: ServerState::Ready,
        };
        assert_eq!(err.to_string(), "Cannot send ROLLBACK in state READY");
    }

    #[test]
    fn test_connection_closed() {
        let err: DriverError = BoltError::ConnectionClosed.into();
        assert!(matches!(err, DriverError::Connection(_)));
        assert!(err.is_fatal());
    }
}
