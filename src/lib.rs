//! SQL over flat files.
//!
//! `filesql` materializes CSV, TSV, and LTSV files — optionally wrapped in
//! a gzip, bzip2, xz, or zstd envelope — as tables in an embedded SQLite
//! database, lets the caller run arbitrary SQL against them, and can dump
//! the (possibly mutated) database back to disk in any supported
//! format/compression combination.
//!
//! A data source name is a semicolon-separated list of file or directory
//! paths. Each file becomes one table, named after the file with its
//! compression and format extensions stripped: `logs/access.csv.gz` loads
//! as the table `access`.
//!
//! ```no_run
//! use filesql::{CompressionKind, DumpOptions, OutputFormat};
//!
//! fn main() -> filesql::Result<()> {
//!     let mut db = filesql::open("data/users.csv;data/orders.tsv.gz")?;
//!
//!     let count: i64 = db.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
//!     println!("{count} users");
//!
//!     let options = DumpOptions::new()
//!         .format(OutputFormat::Tsv)
//!         .compression(CompressionKind::Zstd);
//!     db.dump("export", options)?;
//!     db.close()
//! }
//! ```
//!
//! Loading is load-mutate-dump: the files on disk are never written back
//! implicitly, and tables live only inside the in-memory engine.

pub mod codec;
pub mod connection;
pub mod driver;
pub mod dump;
pub mod error;
pub mod loader;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod table;
pub mod validate;

pub use codec::CompressionKind;
pub use connection::{Capability, Connection, IsolationLevel, TxOptions};
pub use driver::{
    Connector, DRIVER_NAME, Driver, FilesqlDriver, dump_connection, open_with_driver,
    register_driver,
};
pub use dump::DumpOptions;
pub use error::{Error, Result};
pub use record::OutputFormat;
pub use schema::{ColumnInfo, ColumnType};
pub use table::Table;

/// Opens a data source name through the built-in driver and returns a
/// connection with every resolved file loaded as a table.
pub fn open(dsn: &str) -> Result<Connection> {
    use driver::Driver as _;
    driver::FilesqlDriver.open(dsn)
}

/// Validates and resolves a data source name once; the returned connector
/// mints an independent connection (with its own engine) per call.
pub fn open_connector(dsn: &str) -> Result<Connector> {
    use driver::Driver as _;
    driver::FilesqlDriver.open_connector(dsn)
}
