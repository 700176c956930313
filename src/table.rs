//! In-memory table value produced by the record sources.

use crate::error::{Error, Result};
use crate::schema::{ColumnInfo, infer_columns};

/// One parsed file: name, header, records, and inferred column info.
///
/// Construction enforces that every record is exactly as wide as the header
/// and derives the column info from the data, so the two can never drift.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    header: Vec<String>,
    records: Vec<Vec<String>>,
    columns: Vec<ColumnInfo>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        header: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> Result<Self> {
        let name = name.into();
        for record in &records {
            if record.len() != header.len() {
                return Err(Error::ParseError {
                    name: name.clone(),
                    source: format!(
                        "record has {} fields, header has {}",
                        record.len(),
                        header.len()
                    )
                    .into(),
                });
            }
        }
        let columns = infer_columns(&header, &records);
        Ok(Self {
            name,
            header,
            records,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
