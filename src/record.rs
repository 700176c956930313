//! Record sources: CSV, TSV, and LTSV parsing and writing.
//!
//! The three parsers share one contract: consume a decompressed byte
//! stream, produce a [`Table`]. CSV and TSV ride on the `csv` crate with
//! RFC-4180 double-quote escaping and strict field counts, so a ragged row
//! surfaces as a parse error instead of a silently padded record. LTSV is
//! line-oriented `key:value` pairs; its header is the set of keys observed
//! across the whole file, in first-seen order.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use csv::QuoteStyle;
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::table::Table;
use crate::validate::MAX_COLUMNS;

/// Text format of a source or dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Ltsv,
}

impl OutputFormat {
    /// File extension for this format, leading dot included.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => ".csv",
            Self::Tsv => ".tsv",
            Self::Ltsv => ".ltsv",
        }
    }

    /// Maps a bare extension (no dot) onto a format, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "ltsv" => Some(Self::Ltsv),
            _ => None,
        }
    }

    /// Detects the format from a path's extension.
    pub fn detect(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    fn delimiter(self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Ltsv => None,
        }
    }
}

/// Parses a full stream into a table named `name`.
pub fn parse<R: Read>(reader: R, name: &str, format: OutputFormat) -> Result<Table> {
    match format.delimiter() {
        Some(delimiter) => parse_delimited(reader, name, delimiter),
        None => parse_ltsv(reader, name),
    }
}

/// Cheap validity probe used by directory scans: reads just far enough to
/// prove the file has a parseable header region.
pub fn probe<R: Read>(reader: R, name: &str, format: OutputFormat) -> Result<()> {
    match format.delimiter() {
        Some(delimiter) => {
            let mut rows = delimited_reader(reader, delimiter).into_records();
            match rows.next() {
                Some(Ok(header)) => check_width(name, header.len()),
                Some(Err(err)) => Err(Error::parse(name, err)),
                None => Err(Error::EmptyFile {
                    name: name.to_string(),
                }),
            }
        }
        None => {
            for line in BufReader::new(reader).lines() {
                let line = line.map_err(|err| Error::parse(name, err))?;
                if !ltsv_pairs(&line).is_empty() {
                    return Ok(());
                }
            }
            Err(Error::EmptyFile {
                name: name.to_string(),
            })
        }
    }
}

fn delimited_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader)
}

fn parse_delimited<R: Read>(reader: R, name: &str, delimiter: u8) -> Result<Table> {
    let mut rows = delimited_reader(reader, delimiter).into_records();

    let header_row = match rows.next() {
        Some(Ok(row)) => row,
        Some(Err(err)) => return Err(Error::parse(name, err)),
        None => {
            return Err(Error::EmptyFile {
                name: name.to_string(),
            });
        }
    };
    let header: Vec<String> = header_row.iter().map(str::to_string).collect();
    check_width(name, header.len())?;
    if let Some(duplicate) = header.iter().duplicates().next() {
        return Err(Error::DuplicateColumnName {
            name: duplicate.clone(),
        });
    }

    let mut records = Vec::new();
    for row in rows {
        let row = row.map_err(|err| Error::parse(name, err))?;
        records.push(row.iter().map(str::to_string).collect());
    }
    Table::new(name, header, records)
}

fn parse_ltsv<R: Read>(reader: R, name: &str) -> Result<Table> {
    let mut header: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<(String, String)>> = Vec::new();

    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|err| Error::parse(name, err))?;
        let pairs = ltsv_pairs(&line);
        if pairs.is_empty() {
            continue;
        }
        for (key, _) in &pairs {
            if !header.iter().any(|seen| seen == key) {
                header.push(key.clone());
            }
        }
        rows.push(pairs);
    }

    if rows.is_empty() {
        return Err(Error::EmptyFile {
            name: name.to_string(),
        });
    }
    check_width(name, header.len())?;

    let records = rows
        .into_iter()
        .map(|pairs| {
            let values: HashMap<String, String> = pairs.into_iter().collect();
            header
                .iter()
                .map(|key| values.get(key).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Table::new(name, header, records)
}

/// Splits one LTSV line into trimmed pairs. Only the first `:` of each
/// field separates key from value; fields without a `:` are dropped.
fn ltsv_pairs(line: &str) -> Vec<(String, String)> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Vec::new();
    }
    line.split('\t')
        .filter_map(|field| {
            let (key, value) = field.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn check_width(name: &str, columns: usize) -> Result<()> {
    if columns > MAX_COLUMNS {
        return Err(Error::TooManyColumns {
            name: name.to_string(),
            limit: MAX_COLUMNS,
        });
    }
    Ok(())
}

fn csv_write_error(err: csv::Error) -> Error {
    match err.into_kind() {
        csv::ErrorKind::Io(err) => Error::Io(err),
        other => Error::Io(std::io::Error::other(format!("{other:?}"))),
    }
}

/// Streaming row writer for the dumper. Delimited formats emit the header
/// row up front; LTSV carries its keys inside every record instead.
pub enum RecordWriter<W: Write> {
    Delimited(csv::Writer<W>),
    Ltsv { inner: W, header: Vec<String> },
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, header: &[String], format: OutputFormat) -> Result<Self> {
        match format.delimiter() {
            Some(delimiter) => {
                let mut writer = csv::WriterBuilder::new()
                    .delimiter(delimiter)
                    .quote_style(QuoteStyle::Necessary)
                    .from_writer(inner);
                writer.write_record(header).map_err(csv_write_error)?;
                Ok(Self::Delimited(writer))
            }
            None => Ok(Self::Ltsv {
                inner,
                header: header.to_vec(),
            }),
        }
    }

    pub fn write_record(&mut self, row: &[String]) -> Result<()> {
        match self {
            Self::Delimited(writer) => writer.write_record(row).map_err(csv_write_error)?,
            Self::Ltsv { inner, header } => {
                let line = header
                    .iter()
                    .zip(row)
                    .map(|(key, value)| format!("{key}:{value}"))
                    .join("\t");
                inner.write_all(line.as_bytes())?;
                inner.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Flushes buffered rows and hands back the inner writer so the codec
    /// layer can be closed explicitly.
    pub fn finish(self) -> Result<W> {
        match self {
            Self::Delimited(writer) => writer
                .into_inner()
                .map_err(|err| Error::Io(std::io::Error::other(err.to_string()))),
            Self::Ltsv { mut inner, .. } => {
                inner.flush()?;
                Ok(inner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn parse_str(input: &str, format: OutputFormat) -> Result<Table> {
        parse(input.as_bytes(), "t", format)
    }

    #[test]
    fn csv_parses_header_and_records() {
        let table =
            parse_str("name,age,city\nJohn,25,Tokyo\nAlice,30,Osaka\n", OutputFormat::Csv)
                .expect("table");
        assert_eq!(table.header(), ["name", "age", "city"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0], ["John", "25", "Tokyo"]);
        assert_eq!(table.columns()[1].column_type, ColumnType::Integer);
    }

    #[test]
    fn csv_honors_quoting() {
        let table = parse_str(
            "name,note\n\"Smith, John\",\"said \"\"hi\"\"\"\n",
            OutputFormat::Csv,
        )
        .expect("table");
        assert_eq!(table.records()[0], ["Smith, John", "said \"hi\""]);
    }

    #[test]
    fn csv_rejects_duplicate_columns() {
        let err = parse_str("id,name,id,email\n1,a,2,b\n", OutputFormat::Csv)
            .err()
            .expect("duplicate header must fail");
        match err {
            Error::DuplicateColumnName { name } => assert_eq!(name, "id"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn csv_rejects_oversized_headers() {
        let header = (0..=MAX_COLUMNS).map(|index| format!("c{index}")).join(",");
        let err = parse_str(&format!("{header}\n"), OutputFormat::Csv)
            .err()
            .expect("oversized header must fail");
        match err {
            Error::TooManyColumns { limit, .. } => assert_eq!(limit, MAX_COLUMNS),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn csv_rejects_ragged_rows() {
        let err = parse_str("a,b\n1,2,3\n", OutputFormat::Csv)
            .err()
            .expect("ragged row must fail");
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn empty_input_is_empty_file() {
        assert!(matches!(
            parse_str("", OutputFormat::Csv),
            Err(Error::EmptyFile { .. })
        ));
        assert!(matches!(
            parse_str("\n\n", OutputFormat::Ltsv),
            Err(Error::EmptyFile { .. })
        ));
    }

    #[test]
    fn header_only_csv_is_a_valid_empty_table() {
        let table = parse_str("a,b\n", OutputFormat::Csv).expect("table");
        assert!(table.is_empty());
        assert!(
            table
                .columns()
                .iter()
                .all(|c| c.column_type == ColumnType::Text)
        );
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let table = parse_str("a\tb\n1\t2\n", OutputFormat::Tsv).expect("table");
        assert_eq!(table.header(), ["a", "b"]);
        assert_eq!(table.records()[0], ["1", "2"]);
    }

    #[test]
    fn ltsv_collects_keys_and_projects_records() {
        let table = parse_str(
            "name:Alice\tage:30\tcity:Tokyo\nname:Bob\tage:25\tcity:Osaka\n",
            OutputFormat::Ltsv,
        )
        .expect("table");
        assert_eq!(table.header().len(), 3);
        assert_eq!(table.len(), 2);
        let name_index = table.header().iter().position(|h| h == "name").expect("name");
        let names: Vec<&str> = table
            .records()
            .iter()
            .map(|record| record[name_index].as_str())
            .collect();
        assert_eq!(names, ["Alice", "Bob"]);
    }

    #[test]
    fn ltsv_missing_keys_become_empty_strings() {
        let table = parse_str("a:1\tb:2\nb:3\tc:4\n", OutputFormat::Ltsv).expect("table");
        assert_eq!(table.header().len(), 3);
        let a_index = table.header().iter().position(|h| h == "a").expect("a");
        assert_eq!(table.records()[1][a_index], "");
    }

    #[test]
    fn ltsv_drops_pairless_fields_and_splits_on_first_colon() {
        let table =
            parse_str("url:http://x/y\tjunk\tname:n\n", OutputFormat::Ltsv).expect("table");
        assert_eq!(table.header().len(), 2);
        let url_index = table.header().iter().position(|h| h == "url").expect("url");
        assert_eq!(table.records()[0][url_index], "http://x/y");
    }

    #[test]
    fn writers_escape_like_the_parsers_expect() {
        let header = vec!["name".to_string(), "note".to_string()];
        let mut writer =
            RecordWriter::new(Vec::new(), &header, OutputFormat::Csv).expect("writer");
        writer
            .write_record(&["Smith, John".to_string(), "line\nbreak \"q\"".to_string()])
            .expect("row");
        let bytes = writer.finish().expect("finish");

        let reparsed = parse(bytes.as_slice(), "t", OutputFormat::Csv).expect("reparse");
        assert_eq!(reparsed.header(), ["name", "note"]);
        assert_eq!(reparsed.records()[0], ["Smith, John", "line\nbreak \"q\""]);
    }

    #[test]
    fn ltsv_writer_joins_pairs_in_header_order() {
        let header = vec!["k1".to_string(), "k2".to_string()];
        let mut writer =
            RecordWriter::new(Vec::new(), &header, OutputFormat::Ltsv).expect("writer");
        writer
            .write_record(&["a".to_string(), "b".to_string()])
            .expect("row");
        let bytes = writer.finish().expect("finish");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), "k1:a\tk2:b\n");
    }

    #[test]
    fn probe_accepts_valid_and_rejects_empty() {
        assert!(probe("a,b\n1,2\n".as_bytes(), "t", OutputFormat::Csv).is_ok());
        assert!(probe("k:v\n".as_bytes(), "t", OutputFormat::Ltsv).is_ok());
        assert!(matches!(
            probe("".as_bytes(), "t", OutputFormat::Csv),
            Err(Error::EmptyFile { .. })
        ));
    }
}
