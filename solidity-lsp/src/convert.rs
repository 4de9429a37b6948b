//! Conversions between byte offsets and LSP positions
//!
//! LSP positions are zero-indexed lines and UTF-16 code unit columns. Every range
//! computed by the server goes through [`LineIndex`].

use std::path::{Path, PathBuf};

use solidity_parser::Location;
use tower_lsp::lsp_types::{self, Position, Range, Url};

use crate::model::ParsedDocument;

/// Convert usize to u32 for LSP types, saturating at `u32::MAX`.
pub(crate) fn to_lsp_u32(val: usize) -> u32 {
    val.try_into().unwrap_or(u32::MAX)
}

/// Pre-calculated line start offsets for one text.
///
/// Built once per parse, then used with the same text for O(log n) lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line containing `offset`. Offsets past the end map to the last line.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        }
    }

    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte range of `line` without its line terminator.
    #[must_use]
    pub fn line_range(&self, text: &str, line: usize) -> Option<std::ops::Range<usize>> {
        let start = self.line_start(line)?;
        let mut end = self
            .line_starts
            .get(line + 1)
            .map_or(self.len, |next| next.saturating_sub(1));
        if end > start && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
        Some(start..end.max(start))
    }

    /// Text of `line` without its line terminator.
    #[must_use]
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> Option<&'a str> {
        text.get(self.line_range(text, line)?)
    }

    /// Convert a byte offset into an LSP position.
    #[must_use]
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let start = self.line_start(line).unwrap_or(0);
        let mut end = offset;
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let character = text
            .get(start..end)
            .map_or(0, |prefix| prefix.encode_utf16().count());
        Position {
            line: to_lsp_u32(line),
            character: to_lsp_u32(character),
        }
    }

    /// Convert an LSP position into a byte offset.
    ///
    /// Columns past the end of the line clamp to the end of the line. Returns `None`
    /// when the line does not exist.
    #[must_use]
    pub fn offset(&self, text: &str, position: Position) -> Option<usize> {
        let range = self.line_range(text, position.line as usize)?;
        let line = text.get(range.clone())?;
        let mut units = 0;
        for (index, ch) in line.char_indices() {
            if units >= position.character as usize {
                return Some(range.start + index);
            }
            units += ch.len_utf16();
        }
        Some(range.end)
    }

    /// Convert a parser location into an LSP range.
    #[must_use]
    pub fn range(&self, text: &str, location: &Location) -> Range {
        Range {
            start: self.position(text, location.start),
            end: self.position(text, location.end),
        }
    }
}

/// File path behind a `file://` URI.
///
/// # Errors
/// Returns [`crate::Error::InvalidUri`] for any other scheme.
pub fn url_to_path(url: &Url) -> Result<PathBuf, crate::Error> {
    url.to_file_path()
        .map_err(|()| crate::Error::InvalidUri(url.to_string()))
}

#[must_use]
pub fn path_to_url(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Editor location of a range of `document`.
#[must_use]
pub fn lsp_location(document: &ParsedDocument, location: &Location) -> Option<lsp_types::Location> {
    Some(lsp_types::Location {
        uri: path_to_url(document.path())?,
        range: document.range_of(location),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_position_to_offset_simple() {
        let source = "line 1\nline 2\nline 3";
        let index = LineIndex::new(source);
        let offset = index.offset(source, Position { line: 1, character: 0 });
        assert_eq!(offset, Some(7));
        assert_eq!(index.offset(source, Position { line: 5, character: 0 }), None);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_file_uris() {
        let url = Url::parse("file:///work/src/Token.sol").expect("valid url");
        let path = url_to_path(&url).expect("file url");
        assert_eq!(path, PathBuf::from("/work/src/Token.sol"));
        assert_eq!(path_to_url(&path), Some(url));
        let remote = Url::parse("https://example.com/Token.sol").expect("valid url");
        assert!(matches!(url_to_path(&remote), Err(crate::Error::InvalidUri(_))));
    }

    #[test]
    fn test_utf16_columns() {
        // 'é' is one UTF-16 unit and two bytes, '𝄞' is two UTF-16 units and four bytes
        let source = "é𝄞x\nnext";
        let index = LineIndex::new(source);
        let x = source.find('x').unwrap_or_default();
        assert_eq!(index.position(source, x), Position { line: 0, character: 3 });
        assert_eq!(index.offset(source, Position { line: 0, character: 3 }), Some(x));
    }

    #[test]
    fn test_column_past_end_clamps() {
        let source = "ab\r\ncd";
        let index = LineIndex::new(source);
        assert_eq!(index.offset(source, Position { line: 0, character: 40 }), Some(2));
        assert_eq!(index.line_text(source, 0), Some("ab"));
        assert_eq!(index.line_text(source, 1), Some("cd"));
    }

    #[test]
    fn test_line_of() {
        let source = "a\nbb\n\nccc";
        let index = LineIndex::new(source);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_of(0), 0);
        assert_eq!(index.line_of(2), 1);
        assert_eq!(index.line_of(5), 2);
        assert_eq!(index.line_of(source.len()), 3);
    }

    #[test]
    fn test_range_round_trip() {
        let source = "contract A {\n  uint x;\n}";
        let index = LineIndex::new(source);
        let range = index.range(source, &Location::new(20, 21));
        assert_eq!(range.start, Position { line: 1, character: 7 });
        assert_eq!(index.offset(source, range.start), Some(20));
    }
}
