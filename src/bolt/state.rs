//! Server connection state machine.
//!
//! The client mirrors the server's view of the connection. Every request
//! has a fixed set of states it may be sent in, and every response moves
//! the mirror deterministically. [`ServerState`] never changes except as
//! the effect of a request/response pair.

use std::fmt;

/// Connection state as seen by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerState {
    /// No socket yet
    Disconnected,
    /// Version negotiated, HELLO not yet acknowledged
    Connected,
    /// HELLO acknowledged, LOGON required
    Authenticating,
    /// Idle, no transaction open
    Ready,
    /// Auto-commit result pending
    Streaming,
    /// Explicit transaction open and idle
    TxReady,
    /// Explicit transaction with a result pending
    TxStreaming,
    /// Last request failed; only RESET (or COMMIT, to surface the error) moves on
    Failed,
    /// Interrupted by RESET while work was pending
    Interrupted,
    /// Unusable; a new connection is required
    Defunct,
}

impl ServerState {
    /// Protocol-style upper case name.
    pub fn name(self) -> &'static str {
        match self {
            ServerState::Disconnected => "DISCONNECTED",
            ServerState::Connected => "CONNECTED",
            ServerState::Authenticating => "AUTHENTICATING",
            ServerState::Ready => "READY",
            ServerState::Streaming => "STREAMING",
            ServerState::TxReady => "TX_READY",
            ServerState::TxStreaming => "TX_STREAMING",
            ServerState::Failed => "FAILED",
            ServerState::Interrupted => "INTERRUPTED",
            ServerState::Defunct => "DEFUNCT",
        }
    }

    /// Whether a socket is attached and usable.
    pub fn is_open(self) -> bool {
        !matches!(self, ServerState::Disconnected | ServerState::Defunct)
    }

    /// Whether an explicit transaction is open on the server.
    pub fn in_transaction(self) -> bool {
        matches!(self, ServerState::TxReady | ServerState::TxStreaming)
    }

    /// Whether a result stream is pending.
    pub fn is_streaming(self) -> bool {
        matches!(self, ServerState::Streaming | ServerState::TxStreaming)
    }

    /// Whether `request` may be sent in this state.
    pub fn can_send(self, request: RequestKind) -> bool {
        use ServerState::*;
        match request {
            RequestKind::Hello { .. } => self == Connected,
            RequestKind::Logon => self == Authenticating,
            RequestKind::Begin => self == Ready,
            RequestKind::Run => matches!(self, Ready | TxReady),
            RequestKind::Pull => matches!(self, Streaming | TxStreaming),
            RequestKind::Commit => matches!(self, TxReady | TxStreaming | Failed),
            RequestKind::Rollback => self == TxReady,
            RequestKind::Reset => matches!(
                self,
                Ready | Streaming | TxReady | TxStreaming | Failed | Interrupted
            ),
            RequestKind::Goodbye => self.is_open(),
        }
    }

    /// State after a SUCCESS answering `request`. `has_more` is the PULL
    /// summary flag saying more records remain.
    pub fn on_success(self, request: RequestKind, has_more: bool) -> ServerState {
        use ServerState::*;
        match request {
            RequestKind::Hello { requires_logon: true } => Authenticating,
            RequestKind::Hello { requires_logon: false } => Ready,
            RequestKind::Logon => Ready,
            RequestKind::Begin => TxReady,
            RequestKind::Run => match self {
                TxReady => TxStreaming,
                _ => Streaming,
            },
            RequestKind::Pull if has_more => self,
            RequestKind::Pull => match self {
                TxStreaming => TxReady,
                _ => Ready,
            },
            RequestKind::Commit | RequestKind::Rollback | RequestKind::Reset => Ready,
            RequestKind::Goodbye => Defunct,
        }
    }

    /// State after a FAILURE answering `request`.
    pub fn on_failure(self, request: RequestKind) -> ServerState {
        match request {
            RequestKind::Hello { .. } | RequestKind::Logon | RequestKind::Reset => {
                ServerState::Defunct
            }
            _ => ServerState::Failed,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of an outbound request, as far as state tracking cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Hello { requires_logon: bool },
    Logon,
    Begin,
    Run,
    Pull,
    Commit,
    Rollback,
    Reset,
    Goodbye,
}

impl RequestKind {
    /// Protocol message name.
    pub fn name(self) -> &'static str {
        match self {
            RequestKind::Hello { .. } => "HELLO",
            RequestKind::Logon => "LOGON",
            RequestKind::Begin => "BEGIN",
            RequestKind::Run => "RUN",
            RequestKind::Pull => "PULL",
            RequestKind::Commit => "COMMIT",
            RequestKind::Rollback => "ROLLBACK",
            RequestKind::Reset => "RESET",
            RequestKind::Goodbye => "GOODBYE",
        }
    }

    /// Whether the server answers this request at all.
    pub fn expects_response(self) -> bool {
        self != RequestKind::Goodbye
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ServerState::*;

    const ALL_STATES: [ServerState; 10] = [
        Disconnected,
        Connected,
        Authenticating,
        Ready,
        Streaming,
        TxReady,
        TxStreaming,
        Failed,
        Interrupted,
        Defunct,
    ];

    fn legal_states(request: RequestKind) -> Vec<ServerState> {
        ALL_STATES.into_iter().filter(|s| s.can_send(request)).collect()
    }

    #[test]
    fn test_legal_states_per_request() {
        assert_eq!(legal_states(RequestKind::Hello { requires_logon: false }), [Connected]);
        assert_eq!(legal_states(RequestKind::Logon), [Authenticating]);
        assert_eq!(legal_states(RequestKind::Begin), [Ready]);
        assert_eq!(legal_states(RequestKind::Run), [Ready, TxReady]);
        assert_eq!(legal_states(RequestKind::Pull), [Streaming, TxStreaming]);
        assert_eq!(legal_states(RequestKind::Commit), [TxReady, TxStreaming, Failed]);
        assert_eq!(legal_states(RequestKind::Rollback), [TxReady]);
        assert_eq!(
            legal_states(RequestKind::Reset),
            [Ready, Streaming, TxReady, TxStreaming, Failed, Interrupted]
        );
        assert!(!Defunct.can_send(RequestKind::Goodbye));
        assert!(!Disconnected.can_send(RequestKind::Goodbye));
    }

    #[test]
    fn test_bootstrap_transitions() {
        assert_eq!(Connected.on_success(RequestKind::Hello { requires_logon: false }, false), Ready);
        assert_eq!(
            Connected.on_success(RequestKind::Hello { requires_logon: true }, false),
            Authenticating
        );
        assert_eq!(Authenticating.on_success(RequestKind::Logon, false), Ready);
        assert_eq!(Connected.on_failure(RequestKind::Hello { requires_logon: true }), Defunct);
        assert_eq!(Authenticating.on_failure(RequestKind::Logon), Defunct);
    }

    #[test]
    fn test_transaction_cycle() {
        let s = Ready.on_success(RequestKind::Begin, false);
        assert_eq!(s, TxReady);
        let s = s.on_success(RequestKind::Run, false);
        assert_eq!(s, TxStreaming);
        assert_eq!(s.on_success(RequestKind::Pull, true), TxStreaming);
        let s = s.on_success(RequestKind::Pull, false);
        assert_eq!(s, TxReady);
        assert_eq!(s.on_success(RequestKind::Commit, false), Ready);
    }

    #[test]
    fn test_auto_commit_cycle() {
        let s = Ready.on_success(RequestKind::Run, false);
        assert_eq!(s, Streaming);
        assert_eq!(s.on_success(RequestKind::Pull, false), Ready);
    }

    #[test]
    fn test_failures() {
        assert_eq!(TxStreaming.on_failure(RequestKind::Pull), Failed);
        assert_eq!(TxReady.on_failure(RequestKind::Run), Failed);
        assert_eq!(Failed.on_failure(RequestKind::Reset), Defunct);
        assert_eq!(Failed.on_success(RequestKind::Reset, false), Ready);
    }

    #[test]
    fn test_display() {
        assert_eq!(TxStreaming.to_string(), "TX_STREAMING");
        assert_eq!(RequestKind::Rollback.name(), "ROLLBACK");
    }
}
