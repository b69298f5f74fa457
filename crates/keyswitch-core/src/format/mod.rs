//! Plain-text formats read and written by KeySwitch.
//!
//! Both files share one shape: one `key=value` record per line, no header,
//! no quoting.
//!
//! ```text
//! devices.txt   <deviceName>=<4-hex-digit layout>     \\?\HID#VID_04F2&PID_0112#...=0407
//! layouts.txt   <hex identifier>=<display name>       0407=German
//! ```
//!
//! Parsing is strict.  A single malformed line fails the whole file with a
//! [`ConfigFormatError`] naming the offending line, and callers apply nothing
//! from a file that failed to parse.

pub mod catalog;
pub mod mapping;

use thiserror::Error;

/// What was wrong with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// The line did not split into exactly two `=`-separated fields.
    FieldCount(usize),
    /// The hexadecimal field could not be parsed as a 16-bit value.
    InvalidHex(String),
    /// The layout field was `0000`, which is reserved for "no layout".
    ReservedLayout,
    /// The key field was empty.
    EmptyKey,
    /// The value field was empty.
    EmptyValue,
}

/// A malformed line in a mapping or catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {}", describe(.kind))]
pub struct ConfigFormatError {
    /// 1-based line number.
    pub line: usize,
    pub kind: FormatErrorKind,
}

fn describe(kind: &FormatErrorKind) -> String {
    match kind {
        FormatErrorKind::FieldCount(n) => {
            format!("expected exactly two '='-separated fields, found {n}")
        }
        FormatErrorKind::InvalidHex(s) => format!("{s:?} is not a hexadecimal layout identifier"),
        FormatErrorKind::ReservedLayout => "layout 0000 is reserved for \"no layout\"".to_string(),
        FormatErrorKind::EmptyKey => "empty key before '='".to_string(),
        FormatErrorKind::EmptyValue => "empty value after '='".to_string(),
    }
}

/// Splits a record line into its two fields.
///
/// Trailing `\r` is tolerated so files edited on either line-ending convention
/// parse the same.
pub(crate) fn split_record(line: &str, line_no: usize) -> Result<(&str, &str), ConfigFormatError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let fields: Vec<&str> = line.split('=').collect();
    match fields.as_slice() {
        [key, value] => Ok((key, value)),
        other => Err(ConfigFormatError {
            line: line_no,
            kind: FormatErrorKind::FieldCount(other.len()),
        }),
    }
}

/// Whether a line carries no record at all.
pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_record_accepts_exactly_two_fields() {
        assert_eq!(split_record("a=b", 1), Ok(("a", "b")));
        assert_eq!(split_record("a=b\r", 1), Ok(("a", "b")));
    }

    #[test]
    fn test_split_record_reports_field_count_and_line() {
        let err = split_record("onlyonefield", 3).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, FormatErrorKind::FieldCount(1));

        let err = split_record("a=b=c", 7).unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::FieldCount(3));
    }

    #[test]
    fn test_empty_value_message_points_after_separator() {
        let err = ConfigFormatError {
            line: 4,
            kind: FormatErrorKind::EmptyValue,
        };
        assert_eq!(err.to_string(), "line 4: empty value after '='");
    }

    #[test]
    fn test_error_message_names_line() {
        let err = ConfigFormatError {
            line: 2,
            kind: FormatErrorKind::InvalidHex("notahex".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "line 2: \"notahex\" is not a hexadecimal layout identifier"
        );
    }
}
