//! Documentation comments written above declarations

use crate::convert::LineIndex;

/// The comment block immediately above a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Natspec {
    /// Comment lines with the comment markers removed, top to bottom.
    pub lines: Vec<String>,
    /// Target of an `@inheritdoc` tag.
    pub inheritdoc: Option<String>,
}

impl Natspec {
    /// Collect the comment lines directly above the line containing `start`.
    ///
    /// Scanning goes upwards and stops at the first line that is not a comment, so a
    /// blank line separates a comment from the declaration below it.
    #[must_use]
    pub fn above(text: &str, line_index: &LineIndex, start: usize) -> Option<Self> {
        let line = line_index.line_of(start);
        let mut lines = Vec::new();
        let mut in_block = false;
        for current in (0..line).rev() {
            let Some(raw) = line_index.line_text(text, current) else {
                break;
            };
            let trimmed = raw.trim();
            if let Some(rest) = trimmed.strip_prefix("///") {
                if in_block {
                    break;
                }
                lines.push(rest.trim().to_string());
            } else if let Some(rest) = trimmed.strip_prefix("//")
                && !in_block
            {
                lines.push(rest.trim().to_string());
            } else if trimmed.ends_with("*/") {
                in_block = !trimmed.starts_with("/*");
                lines.push(strip_block_markers(trimmed));
            } else if in_block && (trimmed.starts_with('*') || trimmed.is_empty()) {
                lines.push(strip_block_markers(trimmed));
            } else if in_block && trimmed.starts_with("/*") {
                in_block = false;
                lines.push(strip_block_markers(trimmed));
            } else if in_block {
                lines.push(trimmed.to_string());
            } else {
                break;
            }
        }
        if lines.is_empty() || in_block {
            return None;
        }
        lines.reverse();
        while lines.first().is_some_and(String::is_empty) {
            lines.remove(0);
        }
        while lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        let inheritdoc = lines.iter().find_map(|line| {
            line.strip_prefix("@inheritdoc")
                .map(|rest| rest.trim().to_string())
                .filter(|target| !target.is_empty())
        });
        Some(Self { lines, inheritdoc })
    }

    /// Render the comment as markdown, turning the common tags into labels.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = Vec::new();
        for line in &self.lines {
            let rendered = if let Some(rest) = line.strip_prefix("@notice") {
                rest.trim().to_string()
            } else if let Some(rest) = line.strip_prefix("@dev") {
                format!("*@dev* {}", rest.trim())
            } else if let Some(rest) = line.strip_prefix("@param") {
                tagged("@param", rest)
            } else if let Some(rest) = line.strip_prefix("@return") {
                tagged("@return", rest)
            } else if let Some(rest) = line.strip_prefix("@custom:") {
                format!("*@custom:{}*", rest.trim())
            } else if let Some(rest) = line
                .strip_prefix("@title")
                .or_else(|| line.strip_prefix("@author"))
            {
                format!("**{}**", rest.trim())
            } else if line.starts_with("@inheritdoc") {
                continue;
            } else {
                line.clone()
            };
            out.push(rendered);
        }
        out.join("  \n")
    }
}

fn tagged(tag: &str, rest: &str) -> String {
    let rest = rest.trim();
    match rest.split_once(char::is_whitespace) {
        Some((name, description)) => format!("*{tag}* `{name}` {}", description.trim()),
        None => format!("*{tag}* `{rest}`"),
    }
}

fn strip_block_markers(line: &str) -> String {
    let line = line.strip_prefix("/**").or_else(|| line.strip_prefix("/*")).unwrap_or(line);
    let line = line.strip_suffix("*/").unwrap_or(line);
    let line = line.trim();
    line.strip_prefix('*').unwrap_or(line).trim().to_string()
}
