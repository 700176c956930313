//! Materializes planned files as tables in the embedded engine.
//!
//! Identifiers are sanitized and bracket-quoted before they touch DDL;
//! field values are capped and bound through prepared statements. Each
//! file's rows go in under one transaction, so a file either loads whole
//! or not at all.

use std::fs::File;

use itertools::Itertools;
use log::{debug, warn};
use rusqlite::params_from_iter;

use crate::codec;
use crate::error::{Error, Result};
use crate::record;
use crate::resolve::{PathPlan, PlanEntry};
use crate::table::Table;
use crate::validate::{
    sanitize_column_name, sanitize_for_log, sanitize_table_name, validate_field_value,
};

/// Loads every planned file. Explicitly listed files abort on failure;
/// directory-discovered files are logged and skipped. Zero successes is
/// [`Error::NoFilesLoaded`] carrying the last per-file failure.
pub fn load_plan(engine: &mut rusqlite::Connection, plan: &PathPlan) -> Result<()> {
    let mut loaded = 0usize;
    let mut last_error: Option<Error> = None;

    for entry in plan.entries() {
        match load_entry(engine, entry) {
            Ok(rows) => {
                loaded += 1;
                debug!("loaded {rows} row(s) into table '{}'", entry.table_name());
            }
            Err(err) if entry.from_directory() => {
                warn!(
                    "skipping '{}': {err}",
                    sanitize_for_log(&entry.file().path().display().to_string())
                );
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    if loaded == 0 {
        return Err(Error::NoFilesLoaded {
            source: last_error.map(Box::new),
        });
    }
    Ok(())
}

fn load_entry(engine: &mut rusqlite::Connection, entry: &PlanEntry) -> Result<usize> {
    let handle = File::open(entry.file().path())?;
    let reader = codec::open_reader(handle, entry.file().compression())?;
    let table = record::parse(reader, entry.table_name(), entry.file().format())?;
    load_table(engine, &table)
}

/// Creates the table if needed and inserts every record, returning the
/// inserted row count.
pub fn load_table(engine: &mut rusqlite::Connection, table: &Table) -> Result<usize> {
    let table_ident = sanitize_table_name(table.name());
    let column_definitions = table
        .columns()
        .iter()
        .map(|column| {
            format!(
                "[{}] {}",
                sanitize_column_name(&column.name),
                column.column_type.sql_type()
            )
        })
        .join(", ");
    engine.execute(
        &format!("CREATE TABLE IF NOT EXISTS [{table_ident}] ({column_definitions})"),
        [],
    )?;

    let placeholders = vec!["?"; table.header().len()].join(", ");
    let insert_sql = format!("INSERT INTO [{table_ident}] VALUES ({placeholders})");

    let tx = engine.transaction()?;
    let mut inserted = 0usize;
    {
        let mut statement = tx.prepare(&insert_sql)?;
        for record in table.records() {
            let values: Vec<_> = record
                .iter()
                .map(|field| validate_field_value(field))
                .collect();
            statement.execute(params_from_iter(values.iter().map(|value| value.as_ref())))?;
            inserted += 1;
        }
    }
    tx.commit()?;
    Ok(inserted)
}
