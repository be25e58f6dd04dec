//! Re-entrant transactions.
//!
//! Nested [`Client::transaction`] calls share one server transaction: BEGIN
//! is sent when the outermost scope opens and COMMIT or ROLLBACK when it
//! closes. Any error or panic escaping any scope marks the whole
//! transaction failed.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::client::Client;
use super::error::{DriverError, DriverResult};
use super::transport::Connector;
use crate::bolt::message::{BeginMessage, BoltRequest};
use crate::bolt::ServerState;

impl<C: Connector> Client<C> {
    /// Run `body` inside a transaction.
    ///
    /// The outermost scope commits when every scope returned `Ok` and no
    /// server failure was seen, and rolls back otherwise. A panic in `body`
    /// rolls back and is then resumed. If the rollback itself fails the
    /// body's error is returned and the rollback error is logged.
    ///
    /// ```ignore
    /// client.transaction(|tx| {
    ///     tx.query("CREATE (:Person {name: $name})", json!({"name": "Alice"}))?;
    ///     tx.expect_one("MATCH (p:Person) RETURN count(p) AS n", ())
    /// })?;
    /// ```
    pub fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        E: From<DriverError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.begin_scope()?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *self)));
        let body_failed = !matches!(outcome, Ok(Ok(_)));
        let closed = self.end_scope(body_failed);

        match outcome {
            Ok(Ok(value)) => closed.map(|_| value).map_err(E::from),
            Ok(Err(e)) => {
                if let Err(cleanup) = closed {
                    warn!("Rollback after failed transaction did not succeed: {}", cleanup);
                }
                Err(e)
            }
            Err(payload) => {
                if let Err(cleanup) = closed {
                    warn!("Rollback after panic did not succeed: {}", cleanup);
                }
                panic::resume_unwind(payload)
            }
        }
    }

    fn begin_scope(&mut self) -> DriverResult<()> {
        let conn = self.ensure_connection()?;
        if conn.tx_depth() == 0 {
            conn.set_tx_failed(false);
            conn.request(BoltRequest::Begin(BeginMessage::new()))?;
        }
        conn.enter_transaction();
        Ok(())
    }

    fn end_scope(&mut self, body_failed: bool) -> DriverResult<()> {
        let conn = match self.connection.as_mut() {
            Some(conn) => conn,
            None => return Ok(()),
        };
        if body_failed {
            conn.set_tx_failed(true);
        }
        if conn.leave_transaction() > 0 {
            return Ok(());
        }

        let failed = conn.tx_failed();
        conn.set_tx_failed(false);

        if !failed {
            conn.request(BoltRequest::Commit)?;
            return Ok(());
        }

        // A panic in a row callback can leave a result half read.
        if conn.state().is_streaming() {
            debug!("Discarding unread result before rollback");
            conn.discard_stream()?;
        }

        match conn.state() {
            ServerState::TxReady => {
                debug!("Rolling back transaction");
                conn.request(BoltRequest::Rollback)?;
            }
            ServerState::Failed => conn.reset()?,
            state => debug!("Transaction already unwound in state {}", state),
        }

        if body_failed {
            Ok(())
        } else {
            Err(DriverError::RolledBack)
        }
    }
}
