//! Text scanning around the cursor
//!
//! Completion and signature help run while the line under the cursor is incomplete, so
//! that line is usually blanked out of the parsed document. These helpers recover the
//! member chain or call being typed straight from the text.

use std::sync::LazyLock;

use regex::Regex;

use crate::resolve::Segment;

static IMPORT_PATH: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:\{[^}]*\}\s*from\s+|\*\s+as\s+\w+\s+from\s+)?["']([^"']*)$"#).ok()
});

/// What is being completed at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// A member after `.`, with the chain written before the dot.
    Member { segments: Vec<Segment>, prefix: String },
    /// A name visible in the enclosing scopes.
    Scope { prefix: String },
    /// The path string of an import statement.
    ImportPath { prefix: String },
}

/// A call whose argument list contains the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// The callee chain, `token.transfer` in `token.transfer(to, `.
    pub segments: Vec<Segment>,
    /// Zero-based index of the argument under the cursor.
    pub active_parameter: usize,
    /// Offset of the opening parenthesis.
    pub open_paren: usize,
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

#[must_use]
pub fn completion_context(text: &str, offset: usize) -> CompletionContext {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or_default();
    let line = before.rsplit('\n').next().unwrap_or_default();
    if let Some(regex) = IMPORT_PATH.as_ref()
        && let Some(path) = regex.captures(line).and_then(|c| c.get(1))
    {
        return CompletionContext::ImportPath {
            prefix: path.as_str().to_string(),
        };
    }
    let start = identifier_start(before.as_bytes(), offset);
    let prefix = before.get(start..).unwrap_or_default().to_string();
    let bytes = before.as_bytes();
    let dot = skip_whitespace_back(bytes, start);
    if dot > 0 && bytes.get(dot - 1) == Some(&b'.') {
        return CompletionContext::Member {
            segments: chain_before(text, dot - 1),
            prefix,
        };
    }
    CompletionContext::Scope { prefix }
}

/// The innermost unclosed call around `offset`.
#[must_use]
pub fn find_call_before_cursor(text: &str, offset: usize) -> Option<CallContext> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut commas = 0usize;
    let mut position = offset.min(bytes.len());
    while position > 0 {
        position -= 1;
        match bytes.get(position).copied()? {
            b')' | b']' | b'}' => depth += 1,
            b'(' if depth == 0 => {
                let segments = chain_before(text, position);
                if segments.is_empty() {
                    return None;
                }
                return Some(CallContext {
                    segments,
                    active_parameter: commas,
                    open_paren: position,
                });
            }
            b'[' | b'{' if depth == 0 => return None,
            b'(' | b'[' | b'{' => depth -= 1,
            b',' if depth == 0 => commas += 1,
            b';' if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

/// Parse the member chain that ends right before `end`, such as `a.b(x)[i]`.
#[must_use]
pub fn chain_before(text: &str, end: usize) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut position = end.min(bytes.len());
    let mut segments = Vec::new();
    loop {
        position = skip_whitespace_back(bytes, position);
        let mut segment = Segment::default();
        loop {
            match position.checked_sub(1).and_then(|p| bytes.get(p)) {
                Some(b']') => {
                    let Some(open) = matching_open(bytes, position - 1, b'[', b']') else {
                        return Vec::new();
                    };
                    segment.index_depth += 1;
                    position = skip_whitespace_back(bytes, open);
                }
                Some(b')') => {
                    let Some(open) = matching_open(bytes, position - 1, b'(', b')') else {
                        return Vec::new();
                    };
                    segment.called = true;
                    position = skip_whitespace_back(bytes, open);
                }
                _ => break,
            }
        }
        let start = identifier_start(bytes, position);
        if start == position {
            break;
        }
        segment.name = text.get(start..position).unwrap_or_default().to_string();
        segments.push(segment);
        position = skip_whitespace_back(bytes, start);
        if position > 0 && bytes.get(position - 1) == Some(&b'.') {
            position -= 1;
        } else {
            break;
        }
    }
    segments.reverse();
    segments
}

fn identifier_start(bytes: &[u8], end: usize) -> usize {
    let mut start = end;
    while start > 0 && bytes.get(start - 1).copied().is_some_and(is_identifier_byte) {
        start -= 1;
    }
    start
}

fn skip_whitespace_back(bytes: &[u8], end: usize) -> usize {
    let mut position = end;
    while position > 0 && bytes.get(position - 1).is_some_and(u8::is_ascii_whitespace) {
        position -= 1;
    }
    position
}

/// Offset of the bracket opening the one closed at `close`.
fn matching_open(bytes: &[u8], close: usize, open: u8, closing: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut position = close + 1;
    while position > 0 {
        position -= 1;
        let byte = *bytes.get(position)?;
        if byte == closing {
            depth += 1;
        } else if byte == open {
            depth -= 1;
            if depth == 0 {
                return Some(position);
            }
        }
    }
    None
}
