//! The connection shim: adapts the embedded engine's connection to the
//! host-facing driver contract.
//!
//! SQL forwards straight through to the engine. The one non-SQL operation,
//! [`Connection::dump`], is a typed method rather than a magic statement.
//! Transactions borrow the connection mutably, so the borrow checker is
//! the InTx state machine: while a transaction guard lives, nothing else
//! can touch the connection. `close` is idempotent once the engine has
//! been released.

use std::path::Path;

use rusqlite::TransactionBehavior;

use crate::dump::{self, DumpOptions};
use crate::error::{Error, Result};

/// Optional engine contracts probed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Transactions with caller-supplied options.
    BeginTx,
    /// Statement preparation under a host-supplied context.
    PrepareContext,
    /// Statement execution under a host-supplied context.
    StmtExecContext,
}

/// Isolation level requested through [`Connection::begin_tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum IsolationLevel {
    /// The only level the embedded engine provides.
    #[default]
    Serializable,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Snapshot,
}

/// Options for [`Connection::begin_tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// A live database of loaded tables.
pub struct Connection {
    engine: Option<rusqlite::Connection>,
}

impl Connection {
    pub(crate) fn new(engine: rusqlite::Connection) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    fn engine(&self) -> Result<&rusqlite::Connection> {
        self.engine.as_ref().ok_or(Error::ConnectionClosed)
    }

    fn engine_mut(&mut self) -> Result<&mut rusqlite::Connection> {
        self.engine.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Executes a single statement, returning the affected row count.
    pub fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.engine()?.execute(sql, params)?)
    }

    /// Executes a batch of semicolon-separated statements.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.engine()?.execute_batch(sql)?)
    }

    /// Prepares a statement against the embedded engine.
    pub fn prepare(&self, sql: &str) -> Result<rusqlite::Statement<'_>> {
        Ok(self.engine()?.prepare(sql)?)
    }

    /// Runs a query expected to yield one row.
    pub fn query_row<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<T>
    where
        P: rusqlite::Params,
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.engine()?.query_row(sql, params, map)?)
    }

    /// Begins a deferred transaction.
    pub fn begin(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.engine_mut()?.transaction()?)
    }

    /// Begins a transaction with explicit options. The embedded engine only
    /// does serializable isolation; anything else is a capability miss.
    pub fn begin_tx(&mut self, options: TxOptions) -> Result<rusqlite::Transaction<'_>> {
        if options.isolation != IsolationLevel::Serializable {
            return Err(Error::BeginTxNotSupported);
        }
        let behavior = if options.read_only {
            TransactionBehavior::Deferred
        } else {
            TransactionBehavior::Immediate
        };
        Ok(self.engine_mut()?.transaction_with_behavior(behavior)?)
    }

    /// True when the engine currently provides the optional contract.
    pub fn supports(&self, capability: Capability) -> bool {
        if self.engine.is_none() {
            return false;
        }
        match capability {
            // The bundled engine implements all three optional contracts.
            Capability::BeginTx | Capability::PrepareContext | Capability::StmtExecContext => true,
        }
    }

    /// Probes for an optional contract, mapping absence onto the stable
    /// `*NotSupported` error for that capability.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            return Ok(());
        }
        Err(match capability {
            Capability::BeginTx => Error::BeginTxNotSupported,
            Capability::PrepareContext => Error::PrepareContextNotSupported,
            Capability::StmtExecContext => Error::StmtExecContextNotSupported,
        })
    }

    /// Handle the host can use to interrupt a long-running query from
    /// another thread.
    pub fn interrupt_handle(&self) -> Result<rusqlite::InterruptHandle> {
        Ok(self.engine()?.get_interrupt_handle())
    }

    /// Exports every loaded (and since mutated) table to `out_dir`.
    pub fn dump(&self, out_dir: impl AsRef<Path>, options: DumpOptions) -> Result<()> {
        dump::dump_database(self.engine()?, out_dir.as_ref(), options)
    }

    /// Closes the connection. Closing an already-closed connection is a
    /// no-op; an engine-side close failure restores the connection.
    pub fn close(&mut self) -> Result<()> {
        match self.engine.take() {
            None => Ok(()),
            Some(engine) => engine.close().map_err(|(engine, err)| {
                self.engine = Some(engine);
                Error::Engine(err)
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish()
    }
}
