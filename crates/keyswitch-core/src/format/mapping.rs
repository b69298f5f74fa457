//! Codec for the persisted device → layout mapping file.
//!
//! ```text
//! \\?\HID#VID_046D&PID_C31C&MI_00#7&1b4e8f1&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}=0409
//! \\?\HID#VID_04F2&PID_0112&MI_00#7&2a1c39a&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}=0407
//! ```
//!
//! Device names are written verbatim.  A name that itself contains `=` cannot
//! be represented and makes the line unreadable on the next load.

use std::io::{self, Write};

use crate::domain::layout::LayoutId;
use crate::format::{is_blank, split_record, ConfigFormatError, FormatErrorKind};

/// One parsed line of the mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub device_name: String,
    pub layout: LayoutId,
}

/// Parses a whole mapping file.
///
/// Blank lines are skipped.  Entries are returned in file order; when a device
/// name repeats, both entries are returned and the caller's last write wins.
///
/// # Errors
///
/// Returns [`ConfigFormatError`] for the first line with the wrong number of
/// fields, an empty device name, unparsable hex, or the reserved layout `0000`.
pub fn parse_mapping(text: &str) -> Result<Vec<MappingEntry>, ConfigFormatError> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if is_blank(line) {
            continue;
        }
        entries.push(parse_mapping_line(line, line_no)?);
    }
    Ok(entries)
}

/// Parses a single `deviceName=HEXLAYOUT` line.
///
/// # Errors
///
/// See [`parse_mapping`].
pub fn parse_mapping_line(line: &str, line_no: usize) -> Result<MappingEntry, ConfigFormatError> {
    let (name, hex) = split_record(line, line_no)?;
    if name.is_empty() {
        return Err(ConfigFormatError {
            line: line_no,
            kind: FormatErrorKind::EmptyKey,
        });
    }
    let layout: LayoutId = hex.parse().map_err(|_| ConfigFormatError {
        line: line_no,
        kind: FormatErrorKind::InvalidHex(hex.to_string()),
    })?;
    if layout.is_unset() {
        return Err(ConfigFormatError {
            line: line_no,
            kind: FormatErrorKind::ReservedLayout,
        });
    }
    Ok(MappingEntry {
        device_name: name.to_string(),
        layout,
    })
}

/// Formats one line without the trailing newline.
pub fn format_mapping_line(device_name: &str, layout: LayoutId) -> String {
    format!("{device_name}={layout}")
}

/// Writes `entries` to `sink`, one newline-terminated line each.
///
/// Returns the number of lines written.
///
/// # Errors
///
/// Propagates any I/O error from `sink`.
pub fn write_mapping<'a, W, I>(sink: &mut W, entries: I) -> io::Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = (&'a str, LayoutId)>,
{
    let mut written = 0;
    for (name, layout) in entries {
        writeln!(sink, "{}", format_mapping_line(name, layout))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_reads_every_line() {
        // Arrange
        let text = "KBD1=0407\nKBD2=0409\n";

        // Act
        let entries = parse_mapping(text).expect("valid file");

        // Assert
        assert_eq!(
            entries,
            vec![
                MappingEntry { device_name: "KBD1".to_string(), layout: LayoutId(0x0407) },
                MappingEntry { device_name: "KBD2".to_string(), layout: LayoutId(0x0409) },
            ]
        );
    }

    #[test]
    fn test_parse_mapping_accepts_lowercase_hex_and_crlf() {
        let entries = parse_mapping("KBD1=040c\r\nKBD2=0809\r\n").unwrap();
        assert_eq!(entries[0].layout, LayoutId(0x040C));
        assert_eq!(entries[1].device_name, "KBD2");
        assert_eq!(entries[1].layout, LayoutId(0x0809));
    }

    #[test]
    fn test_parse_mapping_skips_blank_lines() {
        let entries = parse_mapping("\nKBD1=0407\n\n   \n").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_parse_mapping_rejects_single_field() {
        let err = parse_mapping("KBD1=0407\nonlyonefield\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, FormatErrorKind::FieldCount(1));
    }

    #[test]
    fn test_parse_mapping_rejects_bad_hex() {
        let err = parse_mapping("dev=notahex").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::InvalidHex("notahex".to_string()));
    }

    #[test]
    fn test_parse_mapping_rejects_name_containing_equals() {
        let err = parse_mapping("weird=name=0407").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::FieldCount(3));
    }

    #[test]
    fn test_parse_mapping_rejects_reserved_layout_and_empty_name() {
        assert_eq!(
            parse_mapping("KBD1=0000").unwrap_err().kind,
            FormatErrorKind::ReservedLayout
        );
        assert_eq!(parse_mapping("=0407").unwrap_err().kind, FormatErrorKind::EmptyKey);
    }

    #[test]
    fn test_write_mapping_uses_four_digit_uppercase_hex() {
        // Arrange
        let mut out = Vec::new();

        // Act
        let written = write_mapping(
            &mut out,
            [("KBD1", LayoutId(0x407)), ("KBD2", LayoutId(0xabc))],
        )
        .unwrap();

        // Assert
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "KBD1=0407\nKBD2=0ABC\n");
    }

    #[test]
    fn test_empty_file_parses_to_no_entries() {
        assert!(parse_mapping("").unwrap().is_empty());
    }
}
