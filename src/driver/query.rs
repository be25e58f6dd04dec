//! Query execution.
//!
//! Every query runs inside a transaction scope, opening an implicit one when
//! none is active. Rows are streamed to the caller one RECORD at a time.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::bolt::PullEvent;
use super::client::Client;
use super::error::{DriverError, DriverResult};
use super::record::Record;
use super::transport::Connector;
use super::types::Value;
use crate::bolt::message::{BoltRequest, RunMessage};
use crate::bolt::packstream::{to_parameters, PackStreamMap, PackStreamValue};
use crate::bolt::ServerState;

impl<C: Connector> Client<C> {
    /// Run `query` and hand each row to `on_row` as it arrives.
    ///
    /// `params` is anything that serializes to a map (or `()` for none).
    /// Parameters are converted before anything is sent, so values the wire
    /// format cannot carry, such as integers beyond the signed 64-bit range,
    /// fail without a RUN reaching the server; an enclosing transaction is
    /// still marked failed. If `on_row` fails, the rest of the result is read
    /// and discarded before its error is returned.
    pub fn run_query<P, E, F>(&mut self, query: &str, params: P, mut on_row: F) -> Result<(), E>
    where
        P: Serialize,
        E: From<DriverError>,
        F: FnMut(Record) -> Result<(), E>,
    {
        let parameters = match to_parameters(&params) {
            Ok(parameters) => parameters,
            Err(e) => {
                // Nothing was sent, but an enclosing transaction must not commit.
                if let Some(conn) = self.connection.as_mut().filter(|c| c.tx_depth() > 0) {
                    conn.set_tx_failed(true);
                }
                return Err(DriverError::from(e).into());
            }
        };

        if self.config().verbosity >= 1 {
            debug!("{}", query);
            debug!("{}", serde_json::to_string(&params).unwrap_or_default());
        }

        self.transaction(|client| client.stream_rows(query, parameters, &mut on_row))
    }

    /// Run `query` and collect every row.
    pub fn query<P: Serialize>(&mut self, query: &str, params: P) -> DriverResult<Vec<Record>> {
        let mut rows = Vec::new();
        self.run_query(query, params, |row| {
            rows.push(row);
            Ok::<(), DriverError>(())
        })?;
        Ok(rows)
    }

    /// Run `query` and require exactly one row.
    pub fn expect_one<P: Serialize>(&mut self, query: &str, params: P) -> DriverResult<Record> {
        self.transaction(|client| {
            let mut rows = client.query(query, params)?;
            match rows.len() {
                1 => Ok(rows.remove(0)),
                count => Err(DriverError::ExpectedOneResult { count }),
            }
        })
    }

    fn stream_rows<E, F>(&mut self, query: &str, parameters: PackStreamMap, on_row: &mut F) -> Result<(), E>
    where
        E: From<DriverError>,
        F: FnMut(Record) -> Result<(), E>,
    {
        let conn = self.ensure_connection()?;
        let verbosity = conn.verbosity();

        // An earlier failure in this transaction already reset the server;
        // running now would silently auto-commit.
        if conn.state() != ServerState::TxReady {
            return Err(DriverError::InvalidState {
                request: "RUN".to_string(),
                state: conn.state(),
            }
            .into());
        }

        let run = RunMessage::new(query).with_parameters(parameters);
        let mut summary = conn.request(BoltRequest::Run(run))?;
        let keys: Arc<[String]> = summary.take_fields().unwrap_or_default().into();

        conn.pull_all()?;

        let mut pending: Option<E> = None;
        loop {
            match conn.next_pull_event()? {
                PullEvent::Record(_) if pending.is_some() => {}
                PullEvent::Record(fields) => {
                    let row = match resolve_row(&keys, fields) {
                        Ok(row) => row,
                        Err(e) => {
                            conn.mark_defunct();
                            return Err(e.into());
                        }
                    };
                    if verbosity >= 1 {
                        debug!(">>> {}", serde_json::to_string(&row.to_map()).unwrap_or_default());
                    }
                    if let Err(e) = on_row(row) {
                        pending = Some(e);
                    }
                }
                PullEvent::Summary(s) if s.has_more() => conn.pull_all()?,
                PullEvent::Summary(_) => break,
            }
        }

        match pending {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Zip field names with record values, resolving graph structures.
fn resolve_row(keys: &Arc<[String]>, fields: Vec<PackStreamValue>) -> DriverResult<Record> {
    if fields.len() != keys.len() {
        return Err(DriverError::protocol(format!(
            "RECORD has {} values for {} fields",
            fields.len(),
            keys.len()
        )));
    }
    let values = fields
        .into_iter()
        .map(Value::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::new(Arc::clone(keys), values))
}
