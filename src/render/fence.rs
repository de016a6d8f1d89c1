//! Fenced code block extraction.
//!
//! Splits raw text into prose runs and fenced code blocks before any markdown
//! parsing happens, so code bodies are taken byte-for-byte from the input.
//!
//! ```text
//!   Intro text          ──► Prose("Intro text\n")
//!   ```json             ─┐
//!   {"a":1}              ├► Code { language: "json", code: "{\"a\":1}" }
//!   ```                 ─┘
//!   ```python           ─┐
//!   print("never closed")├► Unterminated("```python\nprint(...)")
//! ```

use crate::render::{CodeBlock, sanitize};

pub const DEFAULT_LANGUAGE: &str = "text";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment<'a> {
    Prose(&'a str),
    Code(CodeBlock),
    /// An opening fence with no closing fence: everything from the fence to
    /// the end of the text.
    Unterminated(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
struct Fence {
    marker: char,
    len: usize,
    language: String,
}

impl Fence {
    /// Parses an opening fence line (without its line terminator).
    fn open(line: &str) -> Option<Fence> {
        let rest = strip_indent(line)?;
        let marker = rest.chars().next()?;
        if marker != '`' && marker != '~' {
            return None;
        }
        let len = rest.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        // Marker characters are ASCII, so `len` is also a byte offset.
        let info = rest[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Fence {
            marker,
            len,
            language: language_tag(info),
        })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let Some(rest) = strip_indent(line) else {
            return false;
        };
        let rest = rest.trim_end();
        !rest.is_empty() && rest.chars().all(|c| c == self.marker) && rest.len() >= self.len
    }
}

/// Up to three leading spaces are allowed before a fence.
fn strip_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        None
    } else {
        Some(rest)
    }
}

/// First token of a fence info string, or `text` when missing or odd.
pub(crate) fn language_tag(info: &str) -> String {
    info.split_whitespace()
        .next()
        .filter(|token| {
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
        })
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

fn strip_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn strip_leading_terminator(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

fn strip_trailing_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Lazy splitter over the input. `Clone` restarts from the current position.
#[derive(Debug, Clone)]
pub(crate) struct Segments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Segments<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// `self.pos` sits at the start of the opening fence `line`.
    fn take_fenced(&mut self, fence: Fence, line: &str) -> Segment<'a> {
        let start = self.pos;
        let interior_start = start + strip_line_end(line).len();
        let mut offset = start + line.len();

        for candidate in self.text[offset..].split_inclusive('\n') {
            if fence.is_closed_by(strip_line_end(candidate)) {
                let interior = &self.text[interior_start..offset];
                let body = strip_trailing_terminator(strip_leading_terminator(interior));
                self.pos = offset + candidate.len();
                return Segment::Code(CodeBlock {
                    language: fence.language,
                    code: sanitize(body),
                });
            }
            offset += candidate.len();
        }

        self.pos = self.text.len();
        Segment::Unterminated(&self.text[start..])
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if let Some(fence) = Fence::open(strip_line_end(line)) {
                if offset > 0 {
                    self.pos += offset;
                    return Some(Segment::Prose(&rest[..offset]));
                }
                return Some(self.take_fenced(fence, line));
            }
            offset += line.len();
        }
        self.pos = self.text.len();
        Some(Segment::Prose(rest))
    }
}
