//! # Content Renderer
//!
//! Turns raw message text into typed, display-safe blocks.
//!
//! ```text
//!   &str ──► fence::Segments ──┬── Prose ──► prose::Writer (pulldown-cmark) ──┐
//!                              ├── Code ──────────────────────────────────────┼──► ContentBlock…
//!                              └── Unterminated ──► Paragraph(literal) ───────┘
//! ```
//!
//! Rendering is pure: no I/O, no state outside the iterator, and the same text
//! always yields the same blocks. [`Blocks`] is lazy and `Clone`, so a render
//! can be restarted from any point.
//!
//! Every string in every block has passed through [`sanitize`]: control
//! characters (except `\n` and `\t`) and bidi controls become U+FFFD and
//! CRLF becomes LF, so terminal escape sequences and reordering marks in a
//! reply can never reach the screen. Links keep their URL only for `http`,
//! `https` and `mailto`.

mod copy;
pub(crate) mod fence;
mod prose;

use std::collections::VecDeque;
use std::iter::FusedIterator;

pub use copy::{COPY_ACK_DURATION, Clipboard, ClipboardError, CopyAck};
pub use fence::DEFAULT_LANGUAGE;

use fence::{Segment, Segments};

/// One inline run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text {
        text: String,
        strong: bool,
        emphasis: bool,
    },
    Code(String),
    Link {
        text: String,
        url: String,
    },
}

impl Inline {
    /// Unstyled text.
    pub fn plain(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            strong: false,
            emphasis: false,
        }
    }

    /// The visible characters of this run.
    pub fn text(&self) -> &str {
        match self {
            Inline::Text { text, .. } | Inline::Code(text) | Inline::Link { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Item number as written (or continued) in the source.
    Ordered(u64),
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Fence info token, `text` when none was given.
    pub language: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph(Vec<Inline>),
    /// Levels 1 to 3 only.
    Heading { level: u8, text: String },
    ListItem {
        kind: ListKind,
        /// 0 for top-level items.
        depth: usize,
        spans: Vec<Inline>,
    },
    CodeBlock(CodeBlock),
    /// A paragraph made of a single code span.
    InlineCode(String),
}

impl ContentBlock {
    /// Visible text without markup, for tests and logs.
    pub fn plain_text(&self) -> String {
        match self {
            ContentBlock::Paragraph(spans) | ContentBlock::ListItem { spans, .. } => {
                spans.iter().map(Inline::text).collect()
            }
            ContentBlock::Heading { text, .. } | ContentBlock::InlineCode(text) => text.clone(),
            ContentBlock::CodeBlock(block) => block.code.clone(),
        }
    }
}

/// Lazy block sequence over one text.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    segments: Segments<'a>,
    queue: VecDeque<ContentBlock>,
}

impl Iterator for Blocks<'_> {
    type Item = ContentBlock;

    fn next(&mut self) -> Option<ContentBlock> {
        loop {
            if let Some(block) = self.queue.pop_front() {
                return Some(block);
            }
            match self.segments.next()? {
                Segment::Prose(text) => self.queue.extend(prose::prose_blocks(text)),
                Segment::Code(block) => return Some(ContentBlock::CodeBlock(block)),
                Segment::Unterminated(literal) => {
                    let literal = literal.trim_end();
                    return Some(ContentBlock::Paragraph(vec![Inline::plain(sanitize(literal))]));
                }
            }
        }
    }
}

impl FusedIterator for Blocks<'_> {}

pub fn render(text: &str) -> Blocks<'_> {
    Blocks {
        segments: Segments::new(text),
        queue: VecDeque::new(),
    }
}

pub fn render_all(text: &str) -> Vec<ContentBlock> {
    render(text).collect()
}

/// Normalizes CRLF to LF and replaces every other control character except
/// `\n` and `\t`, and every bidi control, with U+FFFD.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\t' => out.push(c),
            c if c.is_control() || is_bidi_control(c) => out.push(char::REPLACEMENT_CHARACTER),
            c => out.push(c),
        }
    }
    out
}

/// Directional marks, embeddings, overrides and isolates. They reorder
/// how a terminal displays the surrounding text.
fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{061C}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
    )
}

/// The URL, sanitized, if its scheme is `http`, `https` or `mailto`.
pub(crate) fn safe_url(url: &str) -> Option<String> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme));
    if !allowed || url.chars().any(|c| c.is_control() || is_bidi_control(c)) {
        return None;
    }
    Some(url.to_string())
}
