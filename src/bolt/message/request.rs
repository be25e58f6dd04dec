//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server.

use super::tag;
use crate::bolt::handshake::BoltVersion;
use crate::bolt::packstream::{PackStreamMap, PackStreamStructure, PackStreamValue};
use crate::bolt::state::RequestKind;

/// Authentication token carried by HELLO or LOGON.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    /// Authentication scheme (e.g., "basic", "bearer")
    pub scheme: String,
    /// Principal (username)
    pub principal: Option<String>,
    /// Credentials (password or token)
    pub credentials: Option<String>,
    /// Realm
    pub realm: Option<String>,
}

impl AuthToken {
    /// Create a basic auth token.
    pub fn basic(principal: &str, credentials: &str) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: Some(principal.to_string()),
            credentials: Some(credentials.to_string()),
            realm: None,
        }
    }

    /// Create a bearer (SSO) token.
    pub fn bearer(token: &str) -> Self {
        Self {
            scheme: "bearer".to_string(),
            principal: None,
            credentials: Some(token.to_string()),
            realm: None,
        }
    }

    /// Create an anonymous auth token (no auth).
    pub fn none() -> Self {
        Self {
            scheme: "none".to_string(),
            principal: None,
            credentials: None,
            realm: None,
        }
    }

    /// Set the realm.
    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = Some(realm.to_string());
        self
    }

    /// Write the token entries into `map`.
    pub fn write_into(&self, map: &mut PackStreamMap) {
        map.insert("scheme".to_string(), PackStreamValue::from(self.scheme.as_str()));
        if let Some(ref p) = self.principal {
            map.insert("principal".to_string(), PackStreamValue::from(p.as_str()));
        }
        if let Some(ref c) = self.credentials {
            map.insert("credentials".to_string(), PackStreamValue::from(c.as_str()));
        }
        if let Some(ref r) = self.realm {
            map.insert("realm".to_string(), PackStreamValue::from(r.as_str()));
        }
    }
}

impl Default for AuthToken {
    fn default() -> Self {
        Self::none()
    }
}

/// The Bolt request messages this client sends.
#[derive(Debug, Clone)]
pub enum BoltRequest {
    /// HELLO - Initialize connection
    Hello(HelloMessage),
    /// LOGON - Authenticate (Bolt 5.1+)
    Logon(LogonMessage),
    /// BEGIN - Start transaction
    Begin(BeginMessage),
    /// RUN - Execute a query
    Run(RunMessage),
    /// PULL - Pull results
    Pull(PullMessage),
    /// COMMIT - Commit transaction
    Commit,
    /// ROLLBACK - Rollback transaction
    Rollback,
    /// RESET - Return the connection to READY
    Reset,
    /// GOODBYE - Close connection gracefully
    Goodbye,
}

impl BoltRequest {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Hello(_) => tag::HELLO,
            BoltRequest::Logon(_) => tag::LOGON,
            BoltRequest::Begin(_) => tag::BEGIN,
            BoltRequest::Run(_) => tag::RUN,
            BoltRequest::Pull(_) => tag::PULL,
            BoltRequest::Commit => tag::COMMIT,
            BoltRequest::Rollback => tag::ROLLBACK,
            BoltRequest::Reset => tag::RESET,
            BoltRequest::Goodbye => tag::GOODBYE,
        }
    }

    /// Kind used for state tracking.
    pub fn kind(&self) -> RequestKind {
        match self {
            BoltRequest::Hello(msg) => RequestKind::Hello {
                requires_logon: msg.version.requires_logon(),
            },
            BoltRequest::Logon(_) => RequestKind::Logon,
            BoltRequest::Begin(_) => RequestKind::Begin,
            BoltRequest::Run(_) => RequestKind::Run,
            BoltRequest::Pull(_) => RequestKind::Pull,
            BoltRequest::Commit => RequestKind::Commit,
            BoltRequest::Rollback => RequestKind::Rollback,
            BoltRequest::Reset => RequestKind::Reset,
            BoltRequest::Goodbye => RequestKind::Goodbye,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltRequest::Hello(msg) => msg.to_structure(),
            BoltRequest::Logon(msg) => msg.to_structure(),
            BoltRequest::Begin(msg) => msg.to_structure(),
            BoltRequest::Run(msg) => msg.to_structure(),
            BoltRequest::Pull(msg) => msg.to_structure(),
            BoltRequest::Commit | BoltRequest::Rollback | BoltRequest::Reset | BoltRequest::Goodbye => {
                PackStreamStructure::new(self.tag(), vec![])
            }
        }
    }
}

/// HELLO message - Initialize connection.
#[derive(Debug, Clone)]
pub struct HelloMessage {
    /// Negotiated version; decides where authentication goes
    pub version: BoltVersion,
    /// User agent string
    pub user_agent: String,
    /// Product reported in `bolt_agent` (Bolt 5.3+)
    pub bolt_agent: Option<String>,
    /// Authentication token, sent here only before Bolt 5.1
    pub auth: AuthToken,
}

impl HelloMessage {
    /// Create a new HELLO message.
    pub fn new(version: BoltVersion, user_agent: &str, auth: AuthToken) -> Self {
        Self {
            version,
            user_agent: user_agent.to_string(),
            bolt_agent: None,
            auth,
        }
    }

    /// Set the `bolt_agent` product string.
    pub fn with_bolt_agent(mut self, product: &str) -> Self {
        self.bolt_agent = Some(product.to_string());
        self
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = PackStreamMap::new();
        extra.insert("routing".to_string(), PackStreamValue::Null);
        extra.insert("user_agent".to_string(), PackStreamValue::from(self.user_agent.as_str()));
        if self.version.supports_bolt_agent() {
            if let Some(ref product) = self.bolt_agent {
                let mut agent = PackStreamMap::new();
                agent.insert("product".to_string(), PackStreamValue::from(product.as_str()));
                extra.insert("bolt_agent".to_string(), PackStreamValue::Map(agent));
            }
        }
        if !self.version.requires_logon() {
            self.auth.write_into(&mut extra);
        }

        PackStreamStructure::new(tag::HELLO, vec![PackStreamValue::Map(extra)])
    }
}

/// LOGON message - Authenticate (Bolt 5.1+).
#[derive(Debug, Clone)]
pub struct LogonMessage {
    /// Authentication token
    pub auth: AuthToken,
}

impl LogonMessage {
    /// Create a LOGON message.
    pub fn new(auth: AuthToken) -> Self {
        Self { auth }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut map = PackStreamMap::new();
        self.auth.write_into(&mut map);
        PackStreamStructure::new(tag::LOGON, vec![PackStreamValue::Map(map)])
    }
}

/// RUN message - Execute a query.
#[derive(Debug, Clone)]
pub struct RunMessage {
    /// Query string
    pub query: String,
    /// Query parameters
    pub parameters: PackStreamMap,
    /// Extra metadata
    pub extra: PackStreamMap,
}

impl RunMessage {
    /// Create a new RUN message.
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            parameters: PackStreamMap::new(),
            extra: PackStreamMap::new(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, params: PackStreamMap) -> Self {
        self.parameters = params;
        self
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::RUN,
            vec![
                PackStreamValue::from(self.query.as_str()),
                PackStreamValue::Map(self.parameters.clone()),
                PackStreamValue::Map(self.extra.clone()),
            ],
        )
    }
}

/// BEGIN message - Start transaction.
#[derive(Debug, Clone, Default)]
pub struct BeginMessage {
    /// Extra metadata
    pub extra: PackStreamMap,
}

impl BeginMessage {
    /// Create a BEGIN message with no extra metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::BEGIN, vec![PackStreamValue::Map(self.extra.clone())])
    }
}

/// PULL message - Pull query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullMessage {
    /// Number of records to pull (-1 for all)
    pub n: i64,
}

impl PullMessage {
    /// Create a PULL ALL message.
    pub fn all() -> Self {
        Self { n: -1 }
    }

    /// Create a PULL with specific count.
    pub fn with_n(n: i64) -> Self {
        Self { n }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut extra = PackStreamMap::new();
        extra.insert("n".to_string(), PackStreamValue::Integer(self.n));
        PackStreamStructure::new(tag::PULL, vec![PackStreamValue::Map(extra)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::encode;

    fn extra_keys(s: &PackStreamStructure) -> Vec<String> {
        s.fields[0].as_map().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_hello_before_logon_versions_carries_auth() {
        let hello = HelloMessage::new(BoltVersion::V4_4, "bolt-client/0.1", AuthToken::basic("neo4j", "secret"));
        let s = hello.to_structure();
        assert_eq!(s.tag, tag::HELLO);
        assert_eq!(
            extra_keys(&s),
            ["routing", "user_agent", "scheme", "principal", "credentials"]
        );
        assert!(s.fields[0].as_map().unwrap()["routing"].is_null());
    }

    #[test]
    fn test_hello_with_logon_omits_auth() {
        let hello = HelloMessage::new(BoltVersion::V5_4, "bolt-client/0.1", AuthToken::basic("neo4j", "x"))
            .with_bolt_agent("bolt-client/0.1");
        let s = hello.to_structure();
        assert_eq!(extra_keys(&s), ["routing", "user_agent", "bolt_agent"]);
        assert_eq!(
            BoltRequest::Hello(hello).kind(),
            RequestKind::Hello { requires_logon: true }
        );
    }

    #[test]
    fn test_logon_wire_bytes() {
        let bytes = encode(&PackStreamValue::Structure(LogonMessage::new(AuthToken::none()).to_structure())).unwrap();
        assert_eq!(&bytes[..], b"\xB1\x6A\xA1\x86scheme\x84none");
    }

    #[test]
    fn test_pull_all_wire_bytes() {
        let bytes = encode(&PackStreamValue::Structure(PullMessage::all().to_structure())).unwrap();
        assert_eq!(&bytes[..], &[0xB1, 0x3F, 0xA1, 0x81, b'n', 0xFF]);
    }

    #[test]
    fn test_run_fields() {
        let mut params = PackStreamMap::new();
        params.insert("x".to_string(), PackStreamValue::Integer(1));
        let s = RunMessage::new("RETURN $x").with_parameters(params).to_structure();
        assert_eq!(s.tag, tag::RUN);
        assert_eq!(s.fields.len(), 3);
        assert_eq!(s.fields[0].as_str(), Some("RETURN $x"));
    }

    #[test]
    fn test_empty_requests() {
        for (req, tag) in [
            (BoltRequest::Commit, 0x12),
            (BoltRequest::Rollback, 0x13),
            (BoltRequest::Reset, 0x0F),
            (BoltRequest::Goodbye, 0x02),
        ] {
            let s = req.to_structure();
            assert_eq!(s.tag, tag);
            assert!(s.is_empty());
        }
        assert_eq!(BoltRequest::Begin(BeginMessage::new()).to_structure().fields.len(), 1);
    }
}
