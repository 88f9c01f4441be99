//! Device bytes → on-screen preview.
//!
//! Decoding is a forward-only fold: a [`Scanner`] turns bytes into [`Op`]s and a
//! [`PreviewBuilder`] accumulates them into [`Block`]s. Style wrappers open and close
//! exactly at the first and last affected character; an alignment change or a cut
//! ends the current line.

use serde::{Deserialize, Serialize};

use crate::charset::CharacterTable;
use crate::command::{Alignment, CutKind, DOUBLE_HEIGHT_BIT, ESC, GS, LF, Op};

const DLE: u8 = 0x10;
const FS: u8 = 0x1C;
const CR: u8 = 0x0D;
const HT: u8 = 0x09;

/// `ESC !` print-mode bits.
const MODE_BOLD: u8 = 0x08;
const MODE_UNDERLINE: u8 = 0x80;

/// Shortest run of one rule character rendered as a divider.
pub const DIVIDER_MIN_RUN: usize = 10;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub underline: bool,
    pub double_height: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

/// One printed line; no spans means a blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub alignment: Alignment,
    pub spans: Vec<Span>,
}

impl Line {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Line(Line),
    Divider(Line),
    Cut { cut: CutKind },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub blocks: Vec<Block>,
}

impl Preview {
    /// Structural blocks an operation sequence is meant to produce.
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Op>) -> Self {
        let mut builder = PreviewBuilder::new();
        for op in ops {
            builder.apply(op);
        }
        builder.finish()
    }

    pub fn cuts(&self) -> Vec<CutKind> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Cut { cut } => Some(*cut),
                _ => None,
            })
            .collect()
    }

    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Line(line) | Block::Divider(line) => {
                    out.push_str(&line.text());
                    out.push('\n');
                }
                Block::Cut { .. } => {}
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from("<div class=\"receipt\">");
        for block in &self.blocks {
            match block {
                Block::Line(line) => {
                    out.push_str(&format!("<div class=\"line {}\">", line.alignment.as_str()));
                    if line.is_blank() {
                        out.push_str("<br>");
                    }
                    for span in &line.spans {
                        push_span(&mut out, span);
                    }
                    out.push_str("</div>");
                }
                Block::Divider(_) => out.push_str("<hr class=\"divider\">"),
                Block::Cut { cut: CutKind::Full } => out.push_str("<hr class=\"cut full\">"),
                Block::Cut {
                    cut: CutKind::Partial,
                } => out.push_str("<hr class=\"cut partial\">"),
            }
        }
        out.push_str("</div>");
        out
    }
}

fn push_span(out: &mut String, span: &Span) {
    let Style {
        bold,
        underline,
        double_height,
    } = span.style;
    if double_height {
        out.push_str("<span class=\"double-height\">");
    }
    if bold {
        out.push_str("<strong>");
    }
    if underline {
        out.push_str("<u>");
    }
    out.push_str(&escape_html(&span.text));
    if underline {
        out.push_str("</u>");
    }
    if bold {
        out.push_str("</strong>");
    }
    if double_height {
        out.push_str("</span>");
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Accumulator threaded through the operation sequence.
#[derive(Debug, Default)]
pub struct PreviewBuilder {
    style: Style,
    alignment: Alignment,
    spans: Vec<Span>,
    blocks: Vec<Block>,
}

impl PreviewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: &Op) {
        match op {
            Op::Text(text) => self.push_text(text),
            Op::Init => {
                self.flush_pending();
                self.style = Style::default();
                self.alignment = Alignment::default();
            }
            Op::SetCharset(_) => {}
            Op::Align(alignment) => {
                self.flush_pending();
                self.alignment = *alignment;
            }
            Op::Bold(on) => self.style.bold = *on,
            Op::Underline(on) => self.style.underline = *on,
            Op::DoubleHeight(on) => self.style.double_height = *on,
            Op::Cut(kind) => {
                self.flush_pending();
                self.blocks.push(Block::Cut { cut: *kind });
            }
            Op::Newline => self.end_line(),
        }
    }

    pub fn finish(mut self) -> Preview {
        self.flush_pending();
        let blocks = self
            .blocks
            .into_iter()
            .map(|block| match block {
                Block::Line(line) if is_divider(&line.text()) => Block::Divider(line),
                other => other,
            })
            .collect();
        Preview { blocks }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == self.style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                style: self.style,
            }),
        }
    }

    fn end_line(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        self.blocks.push(Block::Line(Line {
            alignment: self.alignment,
            spans,
        }));
    }

    /// Close a partially printed line; nothing happens when no text is pending.
    fn flush_pending(&mut self) {
        if !self.spans.is_empty() {
            self.end_line();
        }
    }
}

fn is_divider(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '=' | '-' | '*')
        && chars.all(|c| c == first)
        && text.chars().count() >= DIVIDER_MIN_RUN
}

/// Byte scanner yielding the operations a device would act on.
///
/// Known commands outside the operation set are skipped by their fixed length so the
/// scanner never desynchronizes; a truncated trailing command is dropped.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    table: CharacterTable,
    pending: Vec<Op>,
}

impl<'a> Scanner<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            table: CharacterTable::default(),
            pending: Vec::new(),
        }
    }

    fn arg(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn text_run(&mut self) -> Op {
        let mut text = String::new();
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                HT => text.push(' '),
                b if b >= 0x20 && b != 0x7F => text.push(self.table.decode_byte(b)),
                _ => break,
            }
            self.pos += 1;
        }
        Op::Text(text)
    }

    fn escape(&mut self) -> Option<Op> {
        let command = self.arg(1)?;
        let (len, op) = match command {
            b'@' => {
                self.table = CharacterTable::default();
                (2, Some(Op::Init))
            }
            b't' => {
                let n = self.arg(2)?;
                let op = CharacterTable::from_index(n).map(|table| {
                    self.table = table;
                    Op::SetCharset(table)
                });
                (3, op)
            }
            b'a' => {
                let n = self.arg(2)?;
                let alignment = match n {
                    1 | b'1' => Alignment::Center,
                    _ => Alignment::Left,
                };
                (3, Some(Op::Align(alignment)))
            }
            b'E' => (3, Some(Op::Bold(self.arg(2)? & 0x01 != 0))),
            b'-' => (3, Some(Op::Underline(self.arg(2)? & 0x03 != 0))),
            b'!' => {
                let n = self.arg(2)?;
                self.pending.push(Op::Underline(n & MODE_UNDERLINE != 0));
                self.pending.push(Op::DoubleHeight(n & DOUBLE_HEIGHT_BIT != 0));
                (3, Some(Op::Bold(n & MODE_BOLD != 0)))
            }
            b'i' => (2, Some(Op::Cut(CutKind::Full))),
            b'm' => (2, Some(Op::Cut(CutKind::Partial))),
            b'd' | b'J' | b'M' | b'3' | b'R' | b'{' | b'G' | b'V' | b' ' | b'U' => (3, None),
            b'$' => (4, None),
            b'p' => (5, None),
            _ => (2, None),
        };
        self.advance(len)?;
        Some(op.unwrap_or(Op::Text(String::new())))
    }

    fn group_separator(&mut self) -> Option<Op> {
        let command = self.arg(1)?;
        let (len, op) = match command {
            b'V' => match self.arg(2)? {
                0 | b'0' => (3, Some(Op::Cut(CutKind::Full))),
                1 | b'1' => (3, Some(Op::Cut(CutKind::Partial))),
                65 => (4, Some(Op::Cut(CutKind::Full))),
                66 => (4, Some(Op::Cut(CutKind::Partial))),
                _ => (3, None),
            },
            b'!' | b'B' | b'H' | b'h' | b'w' | b'f' => (3, None),
            _ => (2, None),
        };
        self.advance(len)?;
        Some(op.unwrap_or(Op::Text(String::new())))
    }

    fn advance(&mut self, len: usize) -> Option<()> {
        if self.pos + len > self.bytes.len() {
            self.pos = self.bytes.len();
            return None;
        }
        self.pos += len;
        Some(())
    }
}

impl Iterator for Scanner<'_> {
    type Item = Op;

    fn next(&mut self) -> Option<Op> {
        if let Some(op) = self.pending.pop() {
            return Some(op);
        }
        loop {
            let byte = *self.bytes.get(self.pos)?;
            let op = match byte {
                LF => {
                    self.pos += 1;
                    Some(Op::Newline)
                }
                ESC => self.escape(),
                GS => self.group_separator(),
                DLE => {
                    // DLE EOT n (status request)
                    let len = if self.arg(1) == Some(0x04) { 3 } else { 1 };
                    self.advance(len).map(|_| Op::Text(String::new()))
                }
                FS => self.advance(2).map(|_| Op::Text(String::new())),
                CR => {
                    self.pos += 1;
                    continue;
                }
                b if b < 0x20 && b != HT => {
                    self.pos += 1;
                    continue;
                }
                _ => Some(self.text_run()),
            };
            match op {
                Some(Op::Text(text)) if text.is_empty() => continue,
                Some(op) => return Some(op),
                None => {
                    self.pos = self.bytes.len();
                    return None;
                }
            }
        }
    }
}

/// Decode a raw device stream into preview blocks.
pub fn decode(bytes: &[u8]) -> Preview {
    let mut builder = PreviewBuilder::new();
    for op in Scanner::new(bytes) {
        builder.apply(&op);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, bold: bool) -> Span {
        Span {
            text: text.into(),
            style: Style {
                bold,
                ..Style::default()
            },
        }
    }

    #[test]
    fn style_change_mid_line_splits_spans() {
        let bytes = b"ab\x1bE\x01cd\x1bE\x00e\n";
        let preview = decode(bytes);
        assert_eq!(
            preview.blocks,
            vec![Block::Line(Line {
                alignment: Alignment::Left,
                spans: vec![span("ab", false), span("cd", true), span("e", false)],
            })]
        );
    }

    #[test]
    fn alignment_change_ends_the_line() {
        let bytes = b"left\x1ba\x01mid\n";
        let preview = decode(bytes);
        assert_eq!(preview.blocks.len(), 2);
        let Block::Line(second) = &preview.blocks[1] else {
            panic!("expected a line");
        };
        assert_eq!(second.alignment, Alignment::Center);
        assert_eq!(second.text(), "mid");
    }

    #[test]
    fn cuts_are_explicit_blocks() {
        let bytes = b"a\n\x1dV\x00b\x1dV\x01";
        let preview = decode(bytes);
        assert_eq!(preview.cuts(), vec![CutKind::Full, CutKind::Partial]);
        assert!(matches!(preview.blocks[2], Block::Line(ref l) if l.text() == "b"));
    }

    #[test]
    fn unknown_commands_are_skipped_by_length() {
        // ESC d 3 (feed), ESC p 0 25 250 (drawer), GS h 80, DLE EOT 1
        let bytes = b"\x1bd\x03\x1bp\x00\x19\xfaok\x1dhP\x10\x04\x01!\n";
        assert_eq!(decode(bytes).to_plain_text(), "ok!\n");
    }

    #[test]
    fn print_mode_sets_all_flags() {
        let bytes = b"\x1b!\x98x\x1b!\x00y\n";
        let Block::Line(line) = &decode(bytes).blocks[0] else {
            panic!("expected a line");
        };
        assert_eq!(
            line.spans[0].style,
            Style {
                bold: true,
                underline: true,
                double_height: true
            }
        );
        assert_eq!(line.spans[1].style, Style::default());
    }

    #[test]
    fn high_bytes_follow_selected_table() {
        assert_eq!(decode(b"\x84\n").to_plain_text(), "ã\n");
        assert_eq!(decode(b"\x1bt\x02\xc6\n").to_plain_text(), "ã\n");
    }

    #[test]
    fn long_rules_become_dividers() {
        let preview = decode(b"==========\n---------\n");
        assert!(matches!(preview.blocks[0], Block::Divider(_)));
        assert!(matches!(preview.blocks[1], Block::Line(_)));
    }

    #[test]
    fn truncated_command_does_not_panic() {
        assert_eq!(decode(b"x\n\x1b").to_plain_text(), "x\n");
        assert_eq!(decode(b"\x1dV").blocks, vec![]);
    }

    #[test]
    fn html_is_escaped_and_styled() {
        let bytes = b"\x1ba\x01\x1bE\x01<A&B>\x1bE\x00\n\n\x1dV\x00";
        assert_eq!(
            decode(bytes).to_html(),
            "<div class=\"receipt\"><div class=\"line center\"><strong>&lt;A&amp;B&gt;</strong></div>\
             <div class=\"line center\"><br></div><hr class=\"cut full\"></div>"
        );
    }
}
