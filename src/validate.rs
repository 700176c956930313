//! Resource limits, path vetting, and identifier/log sanitization.
//!
//! Table and column names are interpolated into bracket-quoted DDL, so the
//! sanitizers here are deliberately destructive: anything that could escape
//! the brackets or smuggle a second statement is dropped or rewritten. The
//! same rules keep dump output file names safe on every platform.

use std::borrow::Cow;

/// Largest input file accepted for loading (1 GiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
/// Most files processed out of a single directory path.
pub const MAX_FILES_PER_DIR: usize = 1000;
/// Most columns accepted in a single header.
pub const MAX_COLUMNS: usize = 2000;
/// Longest field value retained, in bytes.
pub const MAX_VALUE_LEN: usize = 65_536;

const MAX_TABLE_NAME_CHARS: usize = 200;
const MAX_COLUMN_NAME_CHARS: usize = 100;
const LOG_CLIP_CHARS: usize = 200;
const MAX_PARENT_SEGMENTS: usize = 3;

/// Path prefixes that are never valid data sources, compared lower-cased.
const SYSTEM_PREFIXES: &[&str] = &[
    "/etc/",
    "/proc/",
    "/sys/",
    "/dev/",
    "/root/",
    "/boot/",
    "c:\\windows\\",
    "c:/windows/",
    "c:\\program files",
    "c:/program files",
    "c:\\users\\administrator",
    "c:/users/administrator",
    "\\\\?\\",
    "\\\\",
];

/// Tokens that mark a string as too sensitive to log verbatim.
const SECRET_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "key",
    "token",
    "credential",
    "auth",
    "private",
    "ssh",
    "rsa",
];

/// SQL verbs that must not survive as bare column names.
const RESERVED_COLUMN_VERBS: &[&str] = &[
    "drop", "delete", "insert", "update", "alter", "create", "exec", "execute",
];

/// Characters never allowed through identifier sanitization. Covers path
/// separators, shell/SQL quoting, statement separators, and the characters
/// Windows rejects in file names.
const IDENTIFIER_REJECTS: &[char] = &[
    '/', '\\', '<', '>', ':', '"', '\'', '`', '|', '?', '*', ';', '[', ']',
];

use crate::error::{Error, Result};

/// Vets a caller-supplied path before any filesystem access.
pub fn validate_path(path: &str) -> Result<()> {
    let reject = |reason: &'static str| Error::InvalidPath {
        path: sanitize_for_log(path),
        reason,
    };

    if path.trim().is_empty() {
        return Err(reject("empty path"));
    }
    if path.contains('\0') {
        return Err(reject("contains NUL byte"));
    }

    let parent_segments = path
        .split(['/', '\\'])
        .filter(|segment| *segment == "..")
        .count();
    if parent_segments > MAX_PARENT_SEGMENTS {
        return Err(reject("ascends too many directory levels"));
    }

    let lowered = path.to_lowercase();
    if SYSTEM_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return Err(reject("points into a system directory"));
    }

    if is_reserved_device_name(path) {
        return Err(reject("reserved device name"));
    }

    Ok(())
}

/// True when a directory entry name is eligible for loading.
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('\0')
        && !name.contains(['<', '>', ':', '"', '|', '?', '*'])
}

/// Makes a string safe to embed in log output: secretive content is
/// redacted outright, anything else is clipped.
pub fn sanitize_for_log(value: &str) -> String {
    let lowered = value.to_lowercase();
    if SECRET_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return "[REDACTED]".to_string();
    }
    let clipped: String = value.chars().take(LOG_CLIP_CHARS).collect();
    if clipped.chars().count() < value.chars().count() {
        format!("{clipped}...")
    } else {
        clipped
    }
}

/// Rewrites a table name so it can be interpolated into bracket-quoted DDL.
///
/// The result never contains `<>:"/\|?*` or `[]`, never contains `..` or
/// `--`, is at most 200 characters, and is never empty. The function is
/// idempotent.
pub fn sanitize_table_name(raw: &str) -> String {
    sanitize_identifier(raw, MAX_TABLE_NAME_CHARS, "table")
}

/// Column-name variant of [`sanitize_table_name`]: tighter length cap and
/// bare SQL verbs are mapped to a suffixed form (`DROP` becomes `drop_`).
pub fn sanitize_column_name(raw: &str) -> String {
    let name = sanitize_identifier(raw, MAX_COLUMN_NAME_CHARS, "column");
    if RESERVED_COLUMN_VERBS
        .iter()
        .any(|verb| name.eq_ignore_ascii_case(verb))
    {
        return format!("{}_", name.to_ascii_lowercase());
    }
    name
}

fn sanitize_identifier(raw: &str, max_chars: usize, fallback: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if IDENTIFIER_REJECTS.contains(&c) || c.is_control() {
            continue;
        }
        cleaned.push(c);
    }
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }
    while cleaned.contains("--") {
        cleaned = cleaned.replace("--", "_");
    }
    if let Some(rest) = cleaned.strip_prefix('.') {
        cleaned = format!("_{rest}");
    }
    let clipped: String = cleaned.chars().take(max_chars).collect();
    if clipped.is_empty() {
        fallback.to_string()
    } else {
        clipped
    }
}

/// Caps a field value before it is bound into an INSERT: NUL bytes are
/// stripped and the value is clipped to [`MAX_VALUE_LEN`] bytes on a
/// character boundary.
pub fn validate_field_value(raw: &str) -> Cow<'_, str> {
    let mut value: Cow<'_, str> = if raw.contains('\0') {
        Cow::Owned(raw.replace('\0', ""))
    } else {
        Cow::Borrowed(raw)
    };
    if value.len() > MAX_VALUE_LEN {
        let mut end = MAX_VALUE_LEN;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        value = Cow::Owned(value[..end].to_string());
    }
    value
}

/// Guard applied at every PRAGMA/DDL interpolation site. The bracket quote
/// is only sound when the identifier cannot contain a closing bracket or a
/// statement separator.
pub fn is_valid_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_TABLE_NAME_CHARS
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '[' | ']' | '\'' | '"' | '`' | ';'))
}

fn is_reserved_device_name(path: &str) -> bool {
    let base = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);
    let stem = ["csv", "tsv", "ltsv"]
        .iter()
        .find_map(|ext| {
            let (name, candidate) = base.rsplit_once('.')?;
            candidate.eq_ignore_ascii_case(ext).then_some(name)
        })
        .unwrap_or(base);
    let upper = stem.to_ascii_uppercase();
    match upper.as_str() {
        "CON" | "PRN" | "AUX" | "NUL" => true,
        _ => {
            let digits = upper
                .strip_prefix("COM")
                .or_else(|| upper.strip_prefix("LPT"));
            matches!(digits, Some(digit) if matches!(digit.as_bytes(), [b'1'..=b'9']))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_path_rejects_traversal_and_system_prefixes() {
        assert!(validate_path("../../../../../../../etc/passwd").is_err());
        assert!(validate_path("/etc/hosts").is_err());
        assert!(validate_path("/proc/self/environ").is_err());
        assert!(validate_path("C:\\Windows\\system32\\config").is_err());
        assert!(validate_path("").is_err());
        assert!(validate_path("   ").is_err());
        assert!(validate_path("data\0.csv").is_err());
    }

    #[test]
    fn validate_path_accepts_ordinary_paths() {
        assert!(validate_path("data.csv").is_ok());
        assert!(validate_path("../sibling/data.tsv").is_ok());
        assert!(validate_path("/tmp/load/users.csv.gz").is_ok());
    }

    #[test]
    fn validate_path_rejects_device_names() {
        assert!(validate_path("CON").is_err());
        assert!(validate_path("reports/NUL.csv").is_err());
        assert!(validate_path("com3.tsv").is_err());
        assert!(validate_path("LPT9.ltsv").is_err());
        assert!(validate_path("COM0.csv").is_ok());
        assert!(validate_path("CONSOLE.csv").is_ok());
    }

    #[test]
    fn filename_filter_rejects_hidden_and_special() {
        assert!(is_valid_filename("users.csv"));
        assert!(!is_valid_filename(".hidden.csv"));
        assert!(!is_valid_filename("bad|name.csv"));
        assert!(!is_valid_filename("what?.csv"));
        assert!(!is_valid_filename(""));
    }

    #[test]
    fn log_sanitizer_redacts_and_clips() {
        assert_eq!(sanitize_for_log("db_password=hunter2"), "[REDACTED]");
        assert_eq!(sanitize_for_log("id_rsa.pub"), "[REDACTED]");
        assert_eq!(sanitize_for_log("users.csv"), "users.csv");
        let long = "x".repeat(300);
        let clipped = sanitize_for_log(&long);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.chars().count(), 203);
    }

    #[test]
    fn table_name_sanitizer_neutralizes_hostile_input() {
        assert_eq!(sanitize_table_name("users"), "users");
        assert_eq!(sanitize_table_name("users; DROP TABLE x"), "users DROP TABLE x");
        assert_eq!(sanitize_table_name("a/b\\c"), "abc");
        assert_eq!(sanitize_table_name("..secret"), "_secret");
        assert_eq!(sanitize_table_name(".leading"), "_leading");
        assert_eq!(sanitize_table_name("a--comment"), "a_comment");
        assert_eq!(sanitize_table_name(""), "table");
        assert_eq!(sanitize_table_name("<>:\"|?*"), "table");
        let long = "t".repeat(250);
        assert_eq!(sanitize_table_name(&long).chars().count(), 200);
    }

    #[test]
    fn table_name_sanitizer_is_idempotent() {
        for raw in ["users", "a/b;c", "..x..", "--", "", ".h", "名前"] {
            let once = sanitize_table_name(raw);
            assert_eq!(sanitize_table_name(&once), once);
        }
    }

    #[test]
    fn column_name_sanitizer_maps_reserved_verbs() {
        assert_eq!(sanitize_column_name("DROP"), "drop_");
        assert_eq!(sanitize_column_name("Delete"), "delete_");
        assert_eq!(sanitize_column_name("execute"), "execute_");
        assert_eq!(sanitize_column_name("dropped"), "dropped");
        assert_eq!(sanitize_column_name(""), "column");
        let long = "c".repeat(150);
        assert_eq!(sanitize_column_name(&long).chars().count(), 100);
    }

    #[test]
    fn field_values_lose_nuls_and_overlong_tails() {
        assert_eq!(validate_field_value("plain"), "plain");
        assert_eq!(validate_field_value("nu\0l"), "nul");
        let long = "v".repeat(MAX_VALUE_LEN + 10);
        assert_eq!(validate_field_value(&long).len(), MAX_VALUE_LEN);
        let multibyte = "é".repeat(MAX_VALUE_LEN);
        assert!(validate_field_value(&multibyte).len() <= MAX_VALUE_LEN);
    }

    #[test]
    fn sql_identifier_guard_matches_sanitizer_output() {
        assert!(is_valid_sql_identifier(&sanitize_table_name("users; -- x")));
        assert!(is_valid_sql_identifier("snake_case_2"));
        assert!(!is_valid_sql_identifier("a]b"));
        assert!(!is_valid_sql_identifier("a;b"));
        assert!(!is_valid_sql_identifier(""));
    }
}
