//! Column types and the per-column type inference engine.
//!
//! Inference classifies each column from its sample values with a strict
//! priority: TEXT beats DATETIME beats REAL beats INTEGER. A single value
//! that fits none of the typed classes forces the whole column to TEXT,
//! and empty values never influence the outcome.
//!
//! Datetime detection is a fixed, ordered list of (regex, candidate chrono
//! formats) pairs. A value counts as a datetime only when some regex matches
//! *and* at least one of that pattern's formats parses it, which keeps the
//! regexes cheap and the chrono calls rare.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// SQL affinity of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Real,
    /// Stored as TEXT in the engine; kept distinct so callers can tell an
    /// ISO-8601 column from free text.
    Datetime,
}

impl ColumnType {
    /// Rendering used in CREATE TABLE statements.
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text | Self::Datetime => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Datetime => "DATETIME",
        };
        f.write_str(label)
    }
}

/// Name and inferred type of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

struct DatetimePattern {
    regex: Regex,
    parses: fn(&str) -> bool,
}

/// Ordered pattern table. Order matters only for cost; classification is
/// "any pattern matches and parses".
static DATETIME_PATTERNS: LazyLock<Vec<DatetimePattern>> = LazyLock::new(|| {
    fn pattern(regex: &str, parses: fn(&str) -> bool) -> DatetimePattern {
        DatetimePattern {
            regex: Regex::new(regex).expect("static datetime regex"),
            parses,
        }
    }

    vec![
        // ISO-8601 with timezone offset or Z.
        pattern(
            r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$",
            |v| DateTime::parse_from_rfc3339(v).is_ok(),
        ),
        // ISO-8601 without timezone.
        pattern(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?$", |v| {
            NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }),
        // ISO date and time separated by a space.
        pattern(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(\.\d+)?$", |v| {
            NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        }),
        // ISO date only.
        pattern(r"^\d{4}-\d{2}-\d{2}$", |v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()
        }),
        // US slash date, optional time, optional AM/PM.
        pattern(
            r"^\d{1,2}/\d{1,2}/\d{4}( \d{1,2}:\d{2}(:\d{2})?( [AP]M)?)?$",
            |v| {
                const FORMATS: &[&str] = &[
                    "%m/%d/%Y",
                    "%m/%d/%Y %H:%M:%S",
                    "%m/%d/%Y %H:%M",
                    "%m/%d/%Y %I:%M:%S %p",
                    "%m/%d/%Y %I:%M %p",
                ];
                FORMATS.iter().any(|fmt| {
                    NaiveDate::parse_from_str(v, fmt).is_ok()
                        || NaiveDateTime::parse_from_str(v, fmt).is_ok()
                })
            },
        ),
        // European dot date, optional time.
        pattern(r"^\d{1,2}\.\d{1,2}\.\d{4}( \d{1,2}:\d{2}:\d{2})?$", |v| {
            NaiveDate::parse_from_str(v, "%d.%m.%Y").is_ok()
                || NaiveDateTime::parse_from_str(v, "%d.%m.%Y %H:%M:%S").is_ok()
        }),
        // Time of day.
        pattern(r"^\d{2}:\d{2}(:\d{2}(\.\d+)?)?$", |v| {
            NaiveTime::parse_from_str(v, "%H:%M:%S%.f").is_ok()
                || NaiveTime::parse_from_str(v, "%H:%M").is_ok()
        }),
    ]
});

/// True when `value` matches one of the datetime patterns and parses under
/// one of its candidate formats.
pub fn is_datetime(value: &str) -> bool {
    DATETIME_PATTERNS
        .iter()
        .any(|pattern| pattern.regex.is_match(value) && (pattern.parses)(value))
}

/// Per-column evidence accumulator.
#[derive(Debug, Clone, Default)]
struct TypeCandidate {
    non_empty: usize,
    datetime_matches: usize,
    integer_matches: usize,
    real_matches: usize,
    unclassified: usize,
}

impl TypeCandidate {
    fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        self.non_empty += 1;
        if is_datetime(trimmed) {
            self.datetime_matches += 1;
        } else if trimmed.parse::<i64>().is_ok() {
            self.integer_matches += 1;
        } else if trimmed.parse::<f64>().is_ok() {
            self.real_matches += 1;
        } else {
            self.unclassified += 1;
        }
    }

    fn decide(&self) -> ColumnType {
        if self.non_empty == 0 || self.unclassified > 0 {
            return ColumnType::Text;
        }
        if self.datetime_matches > 0 {
            return ColumnType::Datetime;
        }
        if self.real_matches > 0 {
            return ColumnType::Real;
        }
        if self.integer_matches > 0 {
            return ColumnType::Integer;
        }
        ColumnType::Text
    }
}

/// Classifies one column from its values.
pub fn infer_column<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::default();
    for value in values {
        candidate.update(value);
    }
    candidate.decide()
}

/// Classifies every column of a header/record block. Records shorter than
/// the header contribute nothing to the missing columns; an empty record
/// set yields all-TEXT.
pub fn infer_columns(header: &[String], records: &[Vec<String>]) -> Vec<ColumnInfo> {
    header
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let column_type = infer_column(
                records
                    .iter()
                    .filter_map(|record| record.get(index))
                    .map(String::as_str),
            );
            ColumnInfo::new(name.clone(), column_type)
        })
        .collect()
}
