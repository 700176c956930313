//! Compression codecs wrapped around the raw byte streams.
//!
//! One layer of compression is recognized per file; the kind is detected
//! from the single trailing extension. Readers are boxed chains that own
//! the underlying file, so dropping the reader releases codec state and
//! the file handle on every exit path. Writers are an enum with an explicit
//! [`CodecWriter::finish`] because the dumper's atomic-write contract needs
//! close errors surfaced rather than swallowed on drop.

use std::ffi::OsStr;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use crate::error::{Error, Result};

const XZ_LEVEL: u32 = 6;
const ZSTD_LEVEL: i32 = 0;

/// Compression envelope around a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionKind {
    /// Plain, uncompressed bytes.
    #[default]
    None,
    /// gzip (`*.gz`).
    Gz,
    /// bzip2 (`*.bz2`), read-only.
    Bz2,
    /// xz / LZMA2 (`*.xz`).
    Xz,
    /// Zstandard (`*.zst`).
    Zstd,
}

impl CompressionKind {
    /// File extension for this kind, leading dot included; empty for
    /// [`CompressionKind::None`].
    pub fn extension(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gz => ".gz",
            Self::Bz2 => ".bz2",
            Self::Xz => ".xz",
            Self::Zstd => ".zst",
        }
    }

    /// Detects the kind from the single trailing extension, case-insensitively.
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("gz") => Self::Gz,
            Some("bz2") => Self::Bz2,
            Some("xz") => Self::Xz,
            Some("zst") => Self::Zstd,
            _ => Self::None,
        }
    }

    /// Whether [`CodecWriter::new`] will accept this kind.
    pub fn supports_write(self) -> bool {
        !matches!(self, Self::Bz2)
    }
}

/// Wraps `inner` in a decompressor for `kind`. The returned reader owns the
/// whole chain.
pub fn open_reader<R>(inner: R, kind: CompressionKind) -> io::Result<Box<dyn Read>>
where
    R: Read + 'static,
{
    let buffered = BufReader::new(inner);
    Ok(match kind {
        CompressionKind::None => Box::new(buffered),
        CompressionKind::Gz => Box::new(MultiGzDecoder::new(buffered)),
        CompressionKind::Bz2 => Box::new(MultiBzDecoder::new(buffered)),
        CompressionKind::Xz => Box::new(XzDecoder::new(buffered)),
        CompressionKind::Zstd => Box::new(zstd::Decoder::with_buffer(buffered)?),
    })
}

/// A compressing writer with an explicit close step.
pub enum CodecWriter<W: Write> {
    Plain(W),
    Gz(GzEncoder<W>),
    Xz(XzEncoder<W>),
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> CodecWriter<W> {
    /// Wraps `inner` in a compressor for `kind`. bzip2 output is rejected
    /// here, at first-write setup, not at option construction.
    pub fn new(inner: W, kind: CompressionKind) -> Result<Self> {
        Ok(match kind {
            CompressionKind::None => Self::Plain(inner),
            CompressionKind::Gz => Self::Gz(GzEncoder::new(inner, flate2::Compression::default())),
            CompressionKind::Bz2 => return Err(Error::UnsupportedCompressionWrite),
            CompressionKind::Xz => Self::Xz(XzEncoder::new(inner, XZ_LEVEL)),
            CompressionKind::Zstd => {
                Self::Zstd(zstd::Encoder::new(inner, ZSTD_LEVEL).map_err(Error::Io)?)
            }
        })
    }

    /// Flushes trailing codec frames and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Plain(inner) => Ok(inner),
            Self::Gz(encoder) => encoder.finish(),
            Self::Xz(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for CodecWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(inner) => inner.write(buf),
            Self::Gz(encoder) => encoder.write(buf),
            Self::Xz(encoder) => encoder.write(buf),
            Self::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(inner) => inner.flush(),
            Self::Gz(encoder) => encoder.flush(),
            Self::Xz(encoder) => encoder.flush(),
            Self::Zstd(encoder) => encoder.flush(),
        }
    }
}
