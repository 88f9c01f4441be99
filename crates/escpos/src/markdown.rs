//! Markdown dialect for free-form messages.
//!
//! Line oriented: every physical line is classified on its own, then inline markers
//! are applied to its content in a fixed order: `**bold**`, `__underline__`, then
//! `*italic*` / `_italic_` markers are dropped (the hardware has no italic).
//! Headings print bold throughout, so `**` inside one only loses its markers.

use std::sync::LazyLock;

use regex::Regex;

use crate::command::{Alignment, ByteStream, Op};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("static pattern"));
static UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").expect("static pattern"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("static pattern"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([^_]+)_").expect("static pattern"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("static pattern"));
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}$").expect("static pattern"));

/// Classification of one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Heading(&'a str),
    Subheading(&'a str),
    Bullet(&'a str),
    Numbered { number: &'a str, text: &'a str },
    Rule,
    Blank,
    Paragraph(&'a str),
}

pub fn classify(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if RULE.is_match(line) {
        return LineKind::Rule;
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return LineKind::Subheading(rest.trim());
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return LineKind::Heading(rest.trim());
    }
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return LineKind::Bullet(rest.trim_start());
    }
    if let Some(caps) = NUMBERED.captures(line) {
        if let (Some(number), Some(text)) = (caps.get(1), caps.get(2)) {
            return LineKind::Numbered {
                number: number.as_str(),
                text: text.as_str(),
            };
        }
    }
    LineKind::Paragraph(line)
}

/// Render `source` into `out`, sizing rules to `line_width` columns.
pub fn render(source: &str, line_width: usize, out: &mut ByteStream) {
    for line in source.lines() {
        match classify(line) {
            LineKind::Heading(text) => {
                out.align(Alignment::Center)
                    .double_height(true)
                    .bold(true)
                    .extend(heading_inline(text))
                    .newline()
                    .bold(false)
                    .double_height(false)
                    .align(Alignment::Left);
            }
            LineKind::Subheading(text) => {
                out.bold(true).extend(heading_inline(text)).bold(false).newline();
            }
            LineKind::Bullet(text) => {
                out.text("  * ").extend(inline(text)).newline();
            }
            LineKind::Numbered { number, text } => {
                out.text(&format!("  {number}. ")).extend(inline(text)).newline();
            }
            LineKind::Rule => {
                out.line(&"-".repeat(line_width));
            }
            LineKind::Blank => {
                out.newline();
            }
            LineKind::Paragraph(text) => {
                out.extend(inline(text)).newline();
            }
        }
    }
}

/// Dialect rendered without control codes, for text-only previews.
pub fn to_plain_text(source: &str, line_width: usize) -> String {
    let mut stream = ByteStream::new();
    render(source, line_width, &mut stream);
    stream.plain_text()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Control(Op),
}

/// Inline formatting of one line's content as text and style operations.
pub fn inline(text: &str) -> Vec<Op> {
    let mut pieces = vec![Piece::Text(text.to_string())];
    pieces = wrap_matches(pieces, &BOLD, Op::Bold(true), Op::Bold(false));
    pieces = wrap_matches(pieces, &UNDERLINE, Op::Underline(true), Op::Underline(false));
    pieces = unwrap_matches(pieces, &ITALIC_STAR);
    pieces = unwrap_matches(pieces, &ITALIC_UNDERSCORE);

    pieces
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Text(t) if t.is_empty() => None,
            Piece::Text(t) => Some(Op::Text(t)),
            Piece::Control(op) => Some(op),
        })
        .collect()
}

/// Inline formatting inside a line that is already bold: `**` markers are dropped,
/// underline still applies.
fn heading_inline(text: &str) -> Vec<Op> {
    inline(text)
        .into_iter()
        .filter(|op| !matches!(op, Op::Bold(_)))
        .collect()
}

fn wrap_matches(pieces: Vec<Piece>, pattern: &Regex, open: Op, close: Op) -> Vec<Piece> {
    split_pieces(pieces, pattern, |inner, out| {
        out.push(Piece::Control(open.clone()));
        out.push(Piece::Text(inner.to_string()));
        out.push(Piece::Control(close.clone()));
    })
}

fn unwrap_matches(pieces: Vec<Piece>, pattern: &Regex) -> Vec<Piece> {
    split_pieces(pieces, pattern, |inner, out| {
        out.push(Piece::Text(inner.to_string()));
    })
}

/// Run `pattern` over every text piece, letting `emit` replace each match's capture.
fn split_pieces(
    pieces: Vec<Piece>,
    pattern: &Regex,
    emit: impl Fn(&str, &mut Vec<Piece>),
) -> Vec<Piece> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let Piece::Text(text) = piece else {
            out.push(piece);
            continue;
        };
        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push(Piece::Text(text[last..whole.start()].to_string()));
            emit(inner.as_str(), &mut out);
            last = whole.end();
        }
        out.push(Piece::Text(text[last..].to_string()));
    }
    out
}
