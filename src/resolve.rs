//! Path resolution: a data source name becomes a validated, de-duplicated
//! plan of loadable files with stable table names.
//!
//! The plan's order is deterministic: paths in DSN order, directory entries
//! sorted by file name. Duplicate table names are resolved per one rule
//! set — collisions across directories or across base formats fail, while
//! a compressed variant sitting next to its plain sibling quietly loses.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::codec::{self, CompressionKind};
use crate::error::{Error, Result};
use crate::record::{self, OutputFormat};
use crate::validate::{
    MAX_FILE_SIZE, MAX_FILES_PER_DIR, is_valid_filename, sanitize_for_log, validate_path,
};

/// A single source file with its decoded format and compression envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    path: PathBuf,
    format: OutputFormat,
    compression: CompressionKind,
}

impl FileDescriptor {
    /// Classifies a path by stripping at most one compression extension and
    /// then reading the preceding format extension. `None` means the file
    /// is not in the supported matrix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let compression = CompressionKind::detect(path);
        let format = match compression {
            CompressionKind::None => OutputFormat::detect(path)?,
            _ => OutputFormat::detect(Path::new(path.file_stem()?))?,
        };
        Some(Self {
            path: path.to_path_buf(),
            format,
            compression,
        })
    }

    /// Like [`FileDescriptor::from_path`], but reports the rejection as
    /// [`Error::UnsupportedFormat`] instead of `None`.
    pub fn try_from_path(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
            path: sanitize_for_log(&path.display().to_string()),
        })
    }

    /// Table name: base name with the compression extension stripped, then
    /// the format extension stripped.
    pub fn table_name(&self) -> String {
        let mut base = PathBuf::from(self.path.file_name().unwrap_or_default());
        if self.compression != CompressionKind::None {
            base = PathBuf::from(base.file_stem().unwrap_or_default());
        }
        base.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn compression(&self) -> CompressionKind {
        self.compression
    }
}

/// True when the path's extensions place it inside the supported matrix.
pub fn is_supported_file(path: &Path) -> bool {
    FileDescriptor::from_path(path).is_some()
}

/// One planned table load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    table_name: String,
    file: FileDescriptor,
    from_directory: bool,
}

impl PlanEntry {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    /// Directory-discovered entries fail soft during load; explicitly
    /// listed ones abort the whole open.
    pub fn from_directory(&self) -> bool {
        self.from_directory
    }
}

/// Ordered load plan for one open call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathPlan {
    entries: Vec<PlanEntry>,
}

impl PathPlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Path chosen for a table name, if the plan contains it.
    pub fn chosen_path(&self, table_name: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.table_name == table_name)
            .map(|entry| entry.file.path())
    }
}

/// Splits a DSN on `;`, validates every path, and expands it into a plan.
pub fn build_plan(dsn: &str) -> Result<PathPlan> {
    let paths: Vec<&str> = dsn
        .split(';')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .collect();
    if paths.is_empty() {
        return Err(Error::NoPathsProvided);
    }

    let mut entries: Vec<PlanEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for raw in paths {
        validate_path(raw)?;
        add_path(Path::new(raw), &mut entries, &mut index, false)?;
    }

    if entries.is_empty() {
        return Err(Error::NoFilesLoaded { source: None });
    }
    debug!("resolved {} table(s) from data source", entries.len());
    Ok(PathPlan { entries })
}

fn add_path(
    path: &Path,
    entries: &mut Vec<PlanEntry>,
    index: &mut HashMap<String, usize>,
    followed_link: bool,
) -> Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        if followed_link {
            warn!(
                "not chasing second-level symlink '{}'",
                sanitize_for_log(&path.display().to_string())
            );
            return Ok(());
        }
        let resolved = fs::canonicalize(path)?;
        validate_path(&resolved.to_string_lossy())?;
        return add_path(&resolved, entries, index, true);
    }
    if metadata.is_dir() {
        add_directory(path, entries, index)
    } else {
        add_explicit_file(path, metadata.len(), entries, index)
    }
}

fn add_explicit_file(
    path: &Path,
    size: u64,
    entries: &mut Vec<PlanEntry>,
    index: &mut HashMap<String, usize>,
) -> Result<()> {
    let Some(file) = FileDescriptor::from_path(path) else {
        debug!(
            "skipping unsupported file '{}'",
            sanitize_for_log(&path.display().to_string())
        );
        return Ok(());
    };
    check_file_size(path, size, MAX_FILE_SIZE)?;
    insert_entry(file, false, entries, index)
}

fn check_file_size(path: &Path, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(Error::FileTooLarge {
            path: sanitize_for_log(&path.display().to_string()),
            limit,
        });
    }
    Ok(())
}

fn add_directory(
    dir: &Path,
    entries: &mut Vec<PlanEntry>,
    index: &mut HashMap<String, usize>,
) -> Result<()> {
    let mut children: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    children.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

    let mut processed = 0usize;
    for child in children {
        let metadata = match fs::metadata(&child) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    "skipping unreadable entry '{}': {err}",
                    sanitize_for_log(&child.display().to_string())
                );
                continue;
            }
        };
        if metadata.is_dir() {
            continue;
        }
        let name = child
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_valid_filename(&name) {
            debug!("skipping invalid file name '{}'", sanitize_for_log(&name));
            continue;
        }
        let Some(file) = FileDescriptor::from_path(&child) else {
            continue;
        };
        if metadata.len() > MAX_FILE_SIZE {
            warn!("skipping oversized file '{}'", sanitize_for_log(&name));
            continue;
        }
        if let Err(err) = dry_run(&file) {
            warn!("skipping unparseable file '{}': {err}", sanitize_for_log(&name));
            continue;
        }
        processed += 1;
        if processed > MAX_FILES_PER_DIR {
            return Err(Error::TooManyFiles {
                dir: sanitize_for_log(&dir.display().to_string()),
                limit: MAX_FILES_PER_DIR,
            });
        }
        insert_entry(file, true, entries, index)?;
    }
    Ok(())
}

/// Opens the file through its codec and checks that a header region parses.
fn dry_run(file: &FileDescriptor) -> Result<()> {
    let handle = fs::File::open(file.path())?;
    let reader = codec::open_reader(handle, file.compression())?;
    record::probe(reader, &file.table_name(), file.format())
}

fn insert_entry(
    file: FileDescriptor,
    from_directory: bool,
    entries: &mut Vec<PlanEntry>,
    index: &mut HashMap<String, usize>,
) -> Result<()> {
    let table_name = file.table_name();
    match index.get(&table_name) {
        None => {
            index.insert(table_name.clone(), entries.len());
            entries.push(PlanEntry {
                table_name,
                file,
                from_directory,
            });
        }
        Some(&slot) => {
            let existing = &entries[slot].file;
            let same_directory = existing.path().parent() == file.path().parent();
            if !same_directory || existing.format() != file.format() {
                return Err(Error::DuplicateTableName {
                    name: table_name,
                    first: sanitize_for_log(&existing.path().display().to_string()),
                    second: sanitize_for_log(&file.path().display().to_string()),
                });
            }
            // Same directory, same base format: the less-compressed variant
            // wins; ties keep the first one seen.
            if compression_weight(file.compression()) < compression_weight(existing.compression())
            {
                entries[slot].file = file;
            }
        }
    }
    Ok(())
}

fn compression_weight(kind: CompressionKind) -> u8 {
    match kind {
        CompressionKind::None => 0,
        _ => 1,
    }
}
