//! Error taxonomy shared across the crate.
//!
//! Every failure that can cross the API boundary is a distinct variant so
//! callers can match on the kind instead of scraping messages. Causes from
//! the embedded engine and the operating system are wrapped, not flattened.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The data source name was empty after trimming.
    #[error("no paths provided in data source name")]
    NoPathsProvided,

    /// No supported file produced a table, or every file in directory mode
    /// failed to load. The last per-file failure is kept for diagnostics.
    #[error("no supported files were loaded")]
    NoFilesLoaded {
        #[source]
        source: Option<Box<Error>>,
    },

    /// A header row contained the same column name twice.
    #[error("duplicate column name '{name}'")]
    DuplicateColumnName { name: String },

    /// Two chosen paths map to the same table name.
    #[error("table name '{name}' is claimed by both '{first}' and '{second}'")]
    DuplicateTableName {
        name: String,
        first: String,
        second: String,
    },

    /// A path failed validation before any filesystem access.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// A directory contained more processable files than the configured cap.
    #[error("directory '{dir}' exceeds the limit of {limit} files")]
    TooManyFiles { dir: String, limit: usize },

    /// A header declared more columns than the configured cap.
    #[error("'{name}' exceeds the limit of {limit} columns")]
    TooManyColumns { name: String, limit: usize },

    /// A file exceeded the size cap.
    #[error("file '{path}' exceeds the size limit of {limit} bytes")]
    FileTooLarge { path: String, limit: u64 },

    /// The extension matrix did not recognize the file.
    #[error("unsupported file format for '{path}'")]
    UnsupportedFormat { path: String },

    /// The file had no logical rows at all.
    #[error("file '{name}' contains no rows")]
    EmptyFile { name: String },

    /// Malformed CSV/TSV/LTSV content, or a corrupt compressed stream.
    #[error("failed to parse '{name}': {source}")]
    ParseError {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// bzip2 is supported for reading only.
    #[error("bzip2 compression is not supported for writing")]
    UnsupportedCompressionWrite,

    /// The dump escape hatch was handed a connection this crate did not open.
    #[error("connection is not a filesql connection")]
    NotFilesqlConnection,

    /// The embedded engine cannot begin a transaction with the requested
    /// options.
    #[error("the embedded engine does not support BeginTx")]
    BeginTxNotSupported,

    /// The embedded engine cannot prepare statements under a host context.
    #[error("the embedded engine does not support context-aware prepare")]
    PrepareContextNotSupported,

    /// The embedded engine cannot execute statements under a host context.
    #[error("the embedded engine does not support context-aware execution")]
    StmtExecContextNotSupported,

    /// An operation was invoked after [`Connection::close`] succeeded.
    ///
    /// [`Connection::close`]: crate::Connection::close
    #[error("connection is closed")]
    ConnectionClosed,

    /// No driver was registered under the requested name.
    #[error("no driver registered under '{name}'")]
    UnknownDriver { name: String },

    /// Pass-through from the embedded engine.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),

    /// Pass-through from the operating system.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps any parse-stage cause with the table or file it came from.
    pub(crate) fn parse<E>(name: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::ParseError {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}
