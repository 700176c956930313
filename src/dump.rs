//! Exports every user table back to disk in a chosen format and
//! compression envelope.
//!
//! Each output file moves through a fixed sequence: create, wrap in the
//! codec writer, stream rows, close the codec, flip the complete flag.
//! A drop guard removes the partial file on any earlier exit, panics
//! included, so a failed dump never leaves half a table behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rusqlite::types::ValueRef;

use crate::codec::{CodecWriter, CompressionKind};
use crate::error::Result;
use crate::record::{OutputFormat, RecordWriter};
use crate::validate::{is_valid_sql_identifier, sanitize_for_log, sanitize_table_name};

#[cfg(unix)]
const OUTPUT_DIR_MODE: u32 = 0o750;

/// Output format and compression for a dump. The builder returns a new
/// value each time; the original stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpOptions {
    format: OutputFormat,
    compression: CompressionKind,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    pub fn compression_kind(&self) -> CompressionKind {
        self.compression
    }

    /// Combined file extension, e.g. `.tsv.zst`.
    pub fn extension(&self) -> String {
        format!(
            "{}{}",
            self.format.extension(),
            self.compression.extension()
        )
    }
}

/// Dumps every user table of `engine` into `out_dir`, one file per table.
pub fn dump_database(
    engine: &rusqlite::Connection,
    out_dir: &Path,
    options: DumpOptions,
) -> Result<()> {
    create_output_dir(out_dir)?;
    let tables = user_tables(engine)?;
    info!(
        "dumping {} table(s) to '{}'",
        tables.len(),
        sanitize_for_log(&out_dir.display().to_string())
    );
    for table in &tables {
        dump_table(engine, table, out_dir, options)?;
    }
    Ok(())
}

fn create_output_dir(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(out_dir, fs::Permissions::from_mode(OUTPUT_DIR_MODE))?;
    }
    Ok(())
}

/// User table names, excluding the engine's own `sqlite_*` bookkeeping.
fn user_tables(engine: &rusqlite::Connection) -> Result<Vec<String>> {
    let mut statement = engine.prepare(
        "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE ?2 ORDER BY name",
    )?;
    let names = statement
        .query_map(rusqlite::params!["table", "sqlite_%"], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn dump_table(
    engine: &rusqlite::Connection,
    name: &str,
    out_dir: &Path,
    options: DumpOptions,
) -> Result<()> {
    let ident = sanitize_table_name(name);
    if !is_valid_sql_identifier(&ident) {
        warn!(
            "skipping table with unusable name '{}'",
            sanitize_for_log(name)
        );
        return Ok(());
    }
    let header = table_columns(engine, &ident)?;
    if header.is_empty() {
        warn!(
            "skipping table '{}': no columns visible under its sanitized name",
            sanitize_for_log(name)
        );
        return Ok(());
    }

    let path = out_dir.join(format!("{ident}{}", options.extension()));
    let handle = File::create(&path)?;
    let mut guard = PartialFileGuard::new(path);

    let mut statement = engine.prepare(&format!("SELECT * FROM [{ident}]"))?;
    let mut rows = statement.query([])?;
    write_rows(handle, &header, &mut rows, options)?;

    guard.mark_complete();
    debug!("dumped table '{ident}'");
    Ok(())
}

fn table_columns(engine: &rusqlite::Connection, ident: &str) -> Result<Vec<String>> {
    let mut statement = engine.prepare(&format!("PRAGMA table_info([{ident}])"))?;
    let names = statement
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn write_rows(
    handle: File,
    header: &[String],
    rows: &mut rusqlite::Rows<'_>,
    options: DumpOptions,
) -> Result<()> {
    let codec = CodecWriter::new(BufWriter::new(handle), options.compression)?;
    let mut writer = RecordWriter::new(codec, header, options.format)?;

    let width = header.len();
    let mut fields: Vec<String> = Vec::with_capacity(width);
    while let Some(row) = rows.next()? {
        fields.clear();
        for column in 0..width {
            fields.push(render_value(row.get_ref(column)?));
        }
        writer.write_record(&fields)?;
    }

    let codec = writer.finish()?;
    let mut inner = codec.finish()?;
    inner.flush()?;
    Ok(())
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Removes the output file on drop unless the write completed.
struct PartialFileGuard {
    path: PathBuf,
    complete: bool,
}

impl PartialFileGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            complete: false,
        }
    }

    fn mark_complete(&mut self) {
        self.complete = true;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if self.complete {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(
                "could not remove partial file '{}': {err}",
                sanitize_for_log(&self.path.display().to_string())
            );
        }
    }
}
