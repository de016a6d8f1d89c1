//! `ContentBlock` → ratatui `Text` styling.
//!
//! The parsing and sanitizing happen in [`crate::render`]; this module only
//! decides how each block looks. Headings, bold, italic, inline code, fenced
//! code blocks (with syntect highlighting and a copy label), list items and
//! links.

use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::render::{CodeBlock, ContentBlock, DEFAULT_LANGUAGE, Inline, ListKind};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const THEME: &str = "base16-ocean.dark";

/// Style `blocks` into owned `Text`.
///
/// Code blocks are numbered from 1 in order of appearance; `copied(n)` tells
/// whether block `n` should show its "Copied!" acknowledgment.
pub fn render(blocks: &[ContentBlock], base_fg: Color, copied: impl Fn(usize) -> bool) -> Text<'static> {
    let mut w = Writer::new(base_fg);
    let mut code_index = 0;
    for block in blocks {
        match block {
            ContentBlock::CodeBlock(code) => {
                code_index += 1;
                w.code_block(code, code_index, copied(code_index));
            }
            other => w.block(other),
        }
    }
    w.text
}

/// Number of code blocks in `blocks`, i.e. the highest valid copy index.
pub fn code_block_count(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .filter(|b| matches!(b, ContentBlock::CodeBlock(_)))
        .count()
}

/// The `n`th code block (1-based), if any.
pub fn nth_code_block(blocks: &[ContentBlock], n: usize) -> Option<&CodeBlock> {
    blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::CodeBlock(code) => Some(code),
            _ => None,
        })
        .nth(n.checked_sub(1)?)
}

// ── Writer ──────────────────────────────────────────────────────────────────

struct Writer {
    text: Text<'static>,
    base_fg: Color,
    /// Whether the next block should be preceded by a blank line.
    needs_newline: bool,
    /// True while consecutive list items are being written.
    in_list: bool,
}

impl Writer {
    fn new(base_fg: Color) -> Self {
        Self {
            text: Text::default(),
            base_fg,
            needs_newline: false,
            in_list: false,
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.base_fg)
    }

    fn push_line(&mut self, line: Line<'static>) {
        self.text.lines.push(line);
    }

    /// Append to the last line, starting a new line at every `\n`.
    fn push_span(&mut self, content: &str, style: Style) {
        let content = expand_tabs(content);
        for (i, part) in content.split('\n').enumerate() {
            if i > 0 || self.text.lines.is_empty() {
                self.push_line(Line::default());
            }
            if !part.is_empty()
                && let Some(line) = self.text.lines.last_mut()
            {
                line.push_span(Span::styled(part.to_owned(), style));
            }
        }
    }

    fn start_block(&mut self, list_item: bool) {
        // List items stay together; everything else is separated by a blank line
        let keep_tight = list_item && self.in_list;
        if self.needs_newline && !keep_tight {
            self.push_line(Line::default());
        }
        self.in_list = list_item;
        self.needs_newline = true;
        self.push_line(Line::default());
    }

    fn block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Paragraph(spans) => {
                self.start_block(false);
                self.inlines(spans);
            }
            ContentBlock::Heading { level, text } => {
                self.start_block(false);
                let style = heading_style(self.base_fg, *level);
                self.push_span(&format!("{} ", "#".repeat(usize::from(*level))), style);
                self.push_span(text, style);
            }
            ContentBlock::ListItem { kind, depth, spans } => {
                self.start_block(true);
                let indent = "  ".repeat(*depth);
                let marker = match kind {
                    ListKind::Unordered => format!("{indent}- "),
                    ListKind::Ordered(n) => format!("{indent}{n}. "),
                };
                self.push_span(&marker, Style::default().fg(Color::DarkGray));
                self.inlines(spans);
            }
            ContentBlock::InlineCode(code) => {
                self.start_block(false);
                self.push_span(code, inline_code_style());
            }
            // Numbered by the caller
            ContentBlock::CodeBlock(_) => {}
        }
    }

    fn inlines(&mut self, spans: &[Inline]) {
        for span in spans {
            match span {
                Inline::Text { text, strong, emphasis } => {
                    let mut style = self.base();
                    if *strong {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    if *emphasis {
                        style = style.add_modifier(Modifier::ITALIC);
                    }
                    self.push_span(text, style);
                }
                Inline::Code(code) => self.push_span(code, inline_code_style()),
                Inline::Link { text, url } => {
                    let link = Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED);
                    self.push_span(text, link);
                    self.push_span(" (", self.base());
                    self.push_span(url, link);
                    self.push_span(")", self.base());
                }
            }
        }
    }

    fn code_block(&mut self, code: &CodeBlock, index: usize, copied: bool) {
        self.start_block(false);
        let bs = Style::default().fg(Color::DarkGray);

        // Top border: ╭── lang [n] Copy ──
        let label = if copied {
            Span::styled("Copied!", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::styled("Copy", bs)
        };
        if let Some(top) = self.text.lines.last_mut() {
            *top = Line::from(vec![
                Span::styled("╭── ", bs),
                Span::styled(code.language.clone(), bs.add_modifier(Modifier::BOLD)),
                Span::styled(format!(" [{index}] "), bs),
                label,
                Span::styled(" ──", bs),
            ]);
        }

        let highlighter = (code.language != DEFAULT_LANGUAGE)
            .then(|| SYNTAX_SET.find_syntax_by_token(&code.language))
            .flatten()
            .and_then(|syntax| {
                THEME_SET
                    .themes
                    .get(THEME)
                    .map(|theme| HighlightLines::new(syntax, theme))
            });

        match highlighter {
            Some(mut hl) => {
                for line in LinesWithEndings::from(&code.code) {
                    let mut spans = vec![Span::styled("│ ", bs)];
                    match hl.highlight_line(line, &SYNTAX_SET) {
                        Ok(ranges) => spans.extend(ranges.into_iter().filter_map(|(hl_style, frag)| {
                            let content = expand_tabs(frag.trim_end_matches('\n'));
                            if content.is_empty() {
                                return None;
                            }
                            let fg = Color::Rgb(
                                hl_style.foreground.r,
                                hl_style.foreground.g,
                                hl_style.foreground.b,
                            );
                            Some(Span::styled(content, Style::default().fg(fg)))
                        })),
                        Err(_) => spans.push(Span::styled(
                            expand_tabs(line.trim_end_matches('\n')),
                            Style::default().fg(Color::White),
                        )),
                    }
                    self.push_line(Line::from(spans));
                }
            }
            None => {
                for line in code.code.split('\n') {
                    self.push_line(Line::from(vec![
                        Span::styled("│ ", bs),
                        Span::styled(expand_tabs(line), Style::default().fg(Color::White)),
                    ]));
                }
            }
        }

        self.push_line(Line::from(Span::styled("╰──", bs)));
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Ratatui renders `\t` as zero-width.
fn expand_tabs(s: &str) -> String {
    s.replace('\t', "    ")
}

fn inline_code_style() -> Style {
    Style::default().fg(Color::White).bg(Color::DarkGray)
}

fn heading_style(base_fg: Color, level: u8) -> Style {
    match level {
        1 => Style::default()
            .fg(base_fg)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        2 => Style::default().fg(base_fg).add_modifier(Modifier::BOLD),
        _ => Style::default()
            .fg(base_fg)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_all;

    fn styled(source: &str) -> Text<'static> {
        render(&render_all(source), Color::Blue, |_| false)
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn heading_text_inherits_heading_style() {
        let text = styled("## Hello");
        let line = &text.lines[0];
        assert_eq!(line_text(line), "## Hello");
        for span in &line.spans {
            assert!(span.style.add_modifier.contains(Modifier::BOLD));
            assert_eq!(span.style.fg, Some(Color::Blue));
        }
    }

    #[test]
    fn bold_text_is_bold() {
        let text = styled("Some **bold** text");
        let bold_span = text.lines[0].spans.iter().find(|s| s.content == "bold").unwrap();
        assert!(bold_span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn inline_code_styled() {
        let text = styled("Use `kubectl` here");
        let code_span = text.lines[0].spans.iter().find(|s| s.content == "kubectl").unwrap();
        assert_eq!(code_span.style.fg, Some(Color::White));
        assert_eq!(code_span.style.bg, Some(Color::DarkGray));
    }

    #[test]
    fn link_shows_url() {
        let text = styled("See [the docs](https://www.kubeflow.org/docs/).");
        assert_eq!(
            line_text(&text.lines[0]),
            "See the docs (https://www.kubeflow.org/docs/)."
        );
    }

    #[test]
    fn list_items_are_tight_with_markers() {
        let text = styled("Intro\n\n- one\n- two\n  1. nested");
        let lines: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(lines, vec!["Intro", "", "- one", "- two", "  1. nested"]);
    }

    #[test]
    fn code_block_has_border_structure() {
        let text = styled("```\nline1\n\nline2\n```");
        let all: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(all[0], "╭── text [1] Copy ──");
        assert_eq!(all[1], "│ line1");
        assert_eq!(all[2], "│ ");
        assert_eq!(all[3], "│ line2");
        assert_eq!(all.last().unwrap(), "╰──");
    }

    #[test]
    fn highlighted_code_keeps_characters() {
        let text = styled("```python\nprint('hi')\n```");
        let all: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(all[0], "╭── python [1] Copy ──");
        assert_eq!(all[1], "│ print('hi')");
    }

    #[test]
    fn copied_label_per_block() {
        let blocks = render_all("```\na\n```\n\n```\nb\n```");
        let text = render(&blocks, Color::Blue, |n| n == 2);
        let all: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(all.contains(&"╭── text [1] Copy ──".to_string()));
        assert!(all.contains(&"╭── text [2] Copied! ──".to_string()));
    }

    #[test]
    fn plain_text_uses_base_color() {
        let text = render(&render_all("hello"), Color::Green, |_| false);
        assert_eq!(text.lines[0].spans[0].style.fg, Some(Color::Green));
    }

    #[test]
    fn tabs_expanded_to_spaces() {
        let text = styled("```\n\tindented\n```");
        assert!(text.lines.iter().any(|l| line_text(l) == "│     indented"));
        assert!(!text.lines.iter().any(|l| line_text(l).contains('\t')));
    }

    #[test]
    fn nth_code_block_is_one_based() {
        let blocks = render_all("```sh\nls\n```\ntext\n```yaml\nkind: Pod\n```");
        assert_eq!(code_block_count(&blocks), 2);
        assert_eq!(nth_code_block(&blocks, 1).map(|b| b.code.as_str()), Some("ls"));
        assert_eq!(nth_code_block(&blocks, 2).map(|b| b.language.as_str()), Some("yaml"));
        assert_eq!(nth_code_block(&blocks, 0), None);
        assert_eq!(nth_code_block(&blocks, 3), None);
    }
}
