//! Codec for the layout catalog resource (`<hex identifier>=<display name>`).

use crate::domain::layout::{Layout, LayoutId};
use crate::format::{is_blank, split_record, ConfigFormatError, FormatErrorKind};

/// Parses the catalog text into layouts, in file order.
///
/// Surrounding whitespace on each line and around the name is ignored; blank
/// lines are skipped.
///
/// # Errors
///
/// Returns [`ConfigFormatError`] for the first line that does not have exactly
/// two fields, has an unparsable or zero identifier, or an empty name.
pub fn parse_catalog(text: &str) -> Result<Vec<Layout>, ConfigFormatError> {
    let mut layouts = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if is_blank(line) {
            continue;
        }
        let (hex, name) = split_record(line.trim(), line_no)?;
        let id: LayoutId = hex.parse().map_err(|_| ConfigFormatError {
            line: line_no,
            kind: FormatErrorKind::InvalidHex(hex.to_string()),
        })?;
        if id.is_unset() {
            return Err(ConfigFormatError {
                line: line_no,
                kind: FormatErrorKind::ReservedLayout,
            });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigFormatError {
                line: line_no,
                kind: FormatErrorKind::EmptyValue,
            });
        }
        layouts.push(Layout::new(id, name));
    }
    Ok(layouts)
}
