//! Prose → `ContentBlock`s.
//!
//! Walks `pulldown_cmark` events and keeps only the supported subset.
//! Anything else (block quotes, HTML blocks, rules, deep headings, indented
//! code, images) is emitted as its literal source text, using the event's
//! byte range. Source the parser consumes without any event (link reference
//! definitions) is recovered from the gaps between top-level blocks.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::render::fence::language_tag;
use crate::render::{CodeBlock, ContentBlock, Inline, ListKind, safe_url, sanitize};

pub(crate) fn prose_blocks(source: &str) -> Vec<ContentBlock> {
    let mut w = Writer::new(source);
    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        w.handle(event, range);
    }
    w.finish()
}

/// An unsupported element being passed through as literal text.
struct Skip {
    depth: usize,
    range: Range<usize>,
    inline: bool,
}

struct LinkCapture {
    /// `None` when the scheme is not allowed; only the label survives.
    url: Option<String>,
    /// Index into `spans` where the label starts.
    start: usize,
}

struct Writer<'a> {
    source: &'a str,
    blocks: Vec<ContentBlock>,
    /// Inline content of the block being built.
    spans: Vec<Inline>,
    heading: Option<u8>,
    /// List nesting: None = unordered, Some(n) = next ordered number.
    lists: Vec<Option<u64>>,
    items: Vec<(ListKind, usize)>,
    strong: usize,
    emphasis: usize,
    link: Option<LinkCapture>,
    /// Fenced code nested deeper than the top-level fence scan can see (list items).
    code: Option<CodeBlock>,
    skip: Option<Skip>,
    /// Open tags around the current event.
    depth: usize,
    /// End of the last top-level block seen.
    covered: usize,
}

impl<'a> Writer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            blocks: Vec::new(),
            spans: Vec::new(),
            heading: None,
            lists: Vec::new(),
            items: Vec::new(),
            strong: 0,
            emphasis: 0,
            link: None,
            code: None,
            skip: None,
            depth: 0,
            covered: 0,
        }
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        self.flush();
        self.fill_gap(self.source.len());
        if let Some(block) = self.code.take() {
            self.push_code(block);
        }
        self.blocks
    }

    // ── Event dispatch ──────────────────────────────────────────────────

    fn handle(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.depth == 0 {
            self.fill_gap(range.start);
        }
        match event {
            Event::Start(_) => self.depth += 1,
            Event::End(_) => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        if self.depth == 0 {
            self.covered = self.covered.max(range.end);
        }

        if let Some(skip) = self.skip.as_mut() {
            match event {
                Event::Start(_) => skip.depth += 1,
                Event::End(_) => skip.depth -= 1,
                _ => {}
            }
            if skip.depth == 0 {
                let (range, inline) = (skip.range.clone(), skip.inline);
                self.skip = None;
                self.literal(range, inline);
            }
            return;
        }

        match event {
            Event::Start(tag) => self.open(tag, range),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(&t),
            Event::Code(c) => self.spans.push(Inline::Code(sanitize(&c))),
            Event::Html(h) | Event::InlineHtml(h) => self.text(&h),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.text("\n"),
            Event::Rule => self.literal(range, false),
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>, range: Range<usize>) {
        match tag {
            Tag::Paragraph => {
                // Loose list items wrap each paragraph; keep them in one item.
                if !self.items.is_empty() && !self.spans.is_empty() {
                    self.text(" ");
                }
            }
            Tag::Heading { level, .. } => match heading_level(level) {
                Some(level) => {
                    self.flush();
                    self.heading = Some(level);
                }
                None => self.begin_skip(range, false),
            },
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let kind = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let kind = ListKind::Ordered(*n);
                        *n += 1;
                        kind
                    }
                    _ => ListKind::Unordered,
                };
                self.items.push((kind, depth));
            }
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                self.flush();
                self.code = Some(CodeBlock {
                    language: language_tag(&info),
                    code: String::new(),
                });
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Link { dest_url, .. } => {
                self.link = Some(LinkCapture {
                    url: safe_url(&dest_url),
                    start: self.spans.len(),
                });
            }
            Tag::Image { .. } => self.begin_skip(range, true),
            Tag::BlockQuote(_) | Tag::CodeBlock(CodeBlockKind::Indented) | Tag::HtmlBlock => {
                self.begin_skip(range, false)
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.items.is_empty() {
                    self.flush();
                }
            }
            TagEnd::Heading(_) => self.flush(),
            TagEnd::Item => {
                self.flush();
                self.items.pop();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::CodeBlock => {
                if let Some(block) = self.code.take() {
                    self.push_code(block);
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Link => self.close_link(),
            _ => {}
        }
    }

    // ── Content handlers ────────────────────────────────────────────────

    fn text(&mut self, raw: &str) {
        if let Some(code) = self.code.as_mut() {
            code.code.push_str(raw);
            return;
        }

        let text = sanitize(raw);
        let (strong, emphasis) = (self.strong > 0, self.emphasis > 0);
        // Never merge across the start of a link label.
        let mergeable = self
            .link
            .as_ref()
            .is_none_or(|link| self.spans.len() > link.start);
        if mergeable
            && let Some(Inline::Text {
                text: prev,
                strong: s,
                emphasis: e,
            }) = self.spans.last_mut()
            && *s == strong
            && *e == emphasis
        {
            prev.push_str(&text);
            return;
        }
        self.spans.push(Inline::Text {
            text,
            strong,
            emphasis,
        });
    }

    fn close_link(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        let Some(url) = link.url else {
            return;
        };
        let start = link.start.min(self.spans.len());
        let label: String = self.spans.drain(start..).map(|s| s.text().to_string()).collect();
        let text = if label.is_empty() { url.clone() } else { label };
        self.spans.push(Inline::Link { text, url });
    }

    fn begin_skip(&mut self, range: Range<usize>, inline: bool) {
        self.skip = Some(Skip {
            depth: 1,
            range,
            inline,
        });
    }

    fn literal(&mut self, range: Range<usize>, inline: bool) {
        let source = self.source;
        let Some(raw) = source.get(range) else {
            return;
        };
        if inline {
            self.text(raw);
            return;
        }
        self.flush();
        let raw = raw.trim_end();
        if !raw.is_empty() {
            self.blocks
                .push(ContentBlock::Paragraph(vec![Inline::plain(sanitize(raw))]));
        }
    }

    /// Emit unconsumed source between the last top-level block and `offset`.
    fn fill_gap(&mut self, offset: usize) {
        if offset <= self.covered {
            return;
        }
        let Some(gap) = self.source.get(self.covered..offset) else {
            return;
        };
        let start = self.covered + (gap.len() - gap.trim_start().len());
        self.covered = offset;
        if start < offset {
            self.literal(start..offset, false);
        }
    }

    fn push_code(&mut self, mut block: CodeBlock) {
        if block.code.ends_with('\n') {
            block.code.pop();
        }
        block.code = sanitize(&block.code);
        self.blocks.push(ContentBlock::CodeBlock(block));
    }

    /// Turn the buffered spans into one block.
    fn flush(&mut self) {
        let heading = self.heading.take();
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);

        let block = if let Some(level) = heading {
            ContentBlock::Heading {
                level,
                text: spans.iter().map(Inline::text).collect(),
            }
        } else if let Some(&(kind, depth)) = self.items.last() {
            ContentBlock::ListItem { kind, depth, spans }
        } else if let [Inline::Code(code)] = spans.as_slice() {
            ContentBlock::InlineCode(code.clone())
        } else {
            ContentBlock::Paragraph(spans)
        };
        self.blocks.push(block);
    }
}

fn heading_level(level: HeadingLevel) -> Option<u8> {
    match level {
        HeadingLevel::H1 => Some(1),
        HeadingLevel::H2 => Some(2),
        HeadingLevel::H3 => Some(3),
        _ => None,
    }
}
