#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use filesql::CompressionKind;
use filesql::codec::CodecWriter;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes `contents` through the given compression codec.
    pub fn write_compressed(&self, name: &str, contents: &str, kind: CompressionKind) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        let file = File::create(&path).expect("create temp file");
        let mut writer = CodecWriter::new(file, kind).expect("codec writer");
        writer
            .write_all(contents.as_bytes())
            .expect("write compressed contents");
        writer.finish().expect("finish codec");
        path
    }

    /// Writes `contents` as bzip2, which the crate reads but never writes.
    pub fn write_bz2(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let file = File::create(&path).expect("create temp file");
        let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
        encoder
            .write_all(contents.as_bytes())
            .expect("write bz2 contents");
        encoder.finish().expect("finish bz2");
        path
    }

    /// DSN string for a set of workspace-relative names.
    pub fn dsn(&self, names: &[&str]) -> String {
        names
            .iter()
            .map(|name| self.temp_dir.path().join(name).display().to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Sample CSV used by several suites.
pub const USERS_CSV: &str = "name,age,city\nJohn,25,Tokyo\nAlice,30,Osaka\nBob,35,Kyoto\n";
