//! Driver registration and the open path.
//!
//! A process-wide registry maps driver names to factories, seeded with this
//! crate's own driver at first use. A [`Connector`] is a validated DSN:
//! the path plan is resolved once and every `connect` call builds a fresh,
//! independent engine from it, which is what makes parallel connects safe.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use log::debug;

use crate::connection::Connection;
use crate::dump::DumpOptions;
use crate::error::{Error, Result};
use crate::loader;
use crate::resolve::{self, PathPlan};

/// Name under which this crate registers itself.
pub const DRIVER_NAME: &str = "filesql";

/// A database driver: turns DSN strings into live connections.
pub trait Driver: Send + Sync {
    fn open(&self, dsn: &str) -> Result<Connection>;

    fn open_connector(&self, dsn: &str) -> Result<Connector>;
}

/// The built-in driver backed by the embedded engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesqlDriver;

impl Driver for FilesqlDriver {
    fn open(&self, dsn: &str) -> Result<Connection> {
        self.open_connector(dsn)?.connect()
    }

    fn open_connector(&self, dsn: &str) -> Result<Connector> {
        let plan = resolve::build_plan(dsn)?;
        Ok(Connector { plan })
    }
}

/// A resolved DSN that can mint independent connections.
#[derive(Debug, Clone)]
pub struct Connector {
    plan: PathPlan,
}

impl Connector {
    /// Builds a fresh in-memory engine and loads the plan into it. Each
    /// call yields its own engine; on failure the engine is released
    /// before the error surfaces.
    pub fn connect(&self) -> Result<Connection> {
        let mut engine = rusqlite::Connection::open_in_memory()?;
        match loader::load_plan(&mut engine, &self.plan) {
            Ok(()) => {
                debug!("connected with {} table(s)", self.plan.len());
                Ok(Connection::new(engine))
            }
            Err(err) => {
                drop(engine);
                Err(err)
            }
        }
    }

    pub fn plan(&self) -> &PathPlan {
        &self.plan
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<dyn Driver>>>> = LazyLock::new(|| {
    let mut drivers: HashMap<String, Arc<dyn Driver>> = HashMap::new();
    drivers.insert(DRIVER_NAME.to_string(), Arc::new(FilesqlDriver));
    RwLock::new(drivers)
});

/// Registers a driver under `name`, replacing any previous entry.
pub fn register_driver(name: impl Into<String>, driver: Arc<dyn Driver>) {
    let mut registry = match REGISTRY.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    registry.insert(name.into(), driver);
}

/// Looks up a registered driver by name.
pub fn registered_driver(name: &str) -> Option<Arc<dyn Driver>> {
    let registry = match REGISTRY.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    registry.get(name).cloned()
}

/// Opens `dsn` through the driver registered under `name`.
pub fn open_with_driver(name: &str, dsn: &str) -> Result<Connection> {
    let driver = registered_driver(name).ok_or_else(|| Error::UnknownDriver {
        name: name.to_string(),
    })?;
    driver.open(dsn)
}

/// The raw-connection escape hatch for hosts that only hold a type-erased
/// connection: downcasts and dumps, or reports that the connection belongs
/// to some other driver.
pub fn dump_connection(
    connection: &dyn Any,
    out_dir: impl AsRef<Path>,
    options: DumpOptions,
) -> Result<()> {
    let connection = connection
        .downcast_ref::<Connection>()
        .ok_or(Error::NotFilesqlConnection)?;
    connection.dump(out_dir, options)
}
