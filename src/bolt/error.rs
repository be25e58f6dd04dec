//! Bolt protocol error types.

use std::fmt;
use std::io;

use super::packstream::PackStreamError;
use super::state::ServerState;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Bolt protocol errors.
#[derive(Debug)]
pub enum BoltError {
    /// I/O error
    Io(io::Error),

    /// Handshake error
    Handshake(HandshakeError),

    /// PackStream serialization error
    PackStream(PackStreamError),

    /// Malformed message, with the inbound offset when known
    Protocol { message: String, offset: Option<usize> },

    /// A response the current state does not allow
    UnexpectedResponse { response: String, state: ServerState },

    /// A request the current state does not allow
    InvalidState { request: &'static str, state: ServerState },

    /// The server answered with FAILURE
    Failure(ServerFailure),

    /// Message too large
    MessageTooLarge { size: usize, max: usize },

    /// Connection closed
    ConnectionClosed,
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Io(e) => write!(f, "I/O error: {}", e),
            BoltError::Handshake(e) => write!(f, "Handshake error: {}", e),
            BoltError::PackStream(e) => write!(f, "PackStream error: {}", e),
            BoltError::Protocol { message, offset: Some(offset) } => {
                write!(f, "Protocol error at offset {}: {}", offset, message)
            }
            BoltError::Protocol { message, offset: None } => write!(f, "Protocol error: {}", message),
            BoltError::UnexpectedResponse { response, state } => {
                write!(f, "Unexpected {} response in state {}", response, state)
            }
            BoltError::InvalidState { request, state } => {
                write!(f, "Cannot send {} in state {}", request, state)
            }
            BoltError::Failure(failure) => write!(f, "{}", failure),
            BoltError::MessageTooLarge { size, max } => {
                write!(f, "Message too large: {} bytes (max: {})", size, max)
            }
            BoltError::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl BoltError {
    /// Whether the connection can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BoltError::Failure(_) | BoltError::InvalidState { .. }
        )
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Io(e) => Some(e),
            BoltError::Handshake(e) => Some(e),
            BoltError::PackStream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Io(err)
    }
}

impl From<HandshakeError> for BoltError {
    fn from(err: HandshakeError) -> Self {
        BoltError::Handshake(err)
    }
}

impl From<PackStreamError> for BoltError {
    fn from(err: PackStreamError) -> Self {
        BoltError::PackStream(err)
    }
}

/// Code and message of a FAILURE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub code: String,
    pub message: String,
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Handshake-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The server accepted none of the proposed versions
    NoCompatibleVersion,

    /// The server picked a version that was not proposed or is unknown
    UnsupportedVersion([u8; 4]),

    /// More than four versions were proposed
    TooManyProposals(usize),

    /// Connection closed during handshake
    ConnectionClosed,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::NoCompatibleVersion => {
                write!(f, "No compatible protocol version found")
            }
            HandshakeError::UnsupportedVersion(raw) => {
                write!(f, "Server selected unsupported version {:02X?}", raw)
            }
            HandshakeError::TooManyProposals(n) => {
                write!(f, "At most 4 versions can be proposed, got {}", n)
            }
            HandshakeError::ConnectionClosed => {
                write!(f, "Connection closed during handshake")
            }
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Server error codes the client gives special meaning to.
pub struct BoltErrorCode;

impl BoltErrorCode {
    pub const SYNTAX_ERROR: &'static str = "Neo.ClientError.Statement.SyntaxError";
    pub const CONSTRAINT_VIOLATION: &'static str =
        "Neo.ClientError.Schema.ConstraintValidationFailed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_error_display() {
        let err = HandshakeError::NoCompatibleVersion;
        assert!(err.to_string().contains("No compatible"));
        let err = HandshakeError::UnsupportedVersion([0, 0, 9, 9]);
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_bolt_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let bolt_err: BoltError = io_err.into();
        assert!(matches!(bolt_err, BoltError::Io(_)));
        assert!(bolt_err.is_fatal());
    }

    #[test]
    fn test_failure_is_recoverable() {
        let err = BoltError::Failure(ServerFailure {
            code: BoltErrorCode::SYNTAX_ERROR.into(),
            message: "Invalid input".into(),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Neo.ClientError.Statement.SyntaxError: Invalid input");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = BoltError::Protocol {
            message: "unknown tag 0x99".into(),
            offset: Some(42),
        };
        assert_eq!(err.to_string(), "Protocol error at offset 42: unknown tag 0x99");
    }
}
