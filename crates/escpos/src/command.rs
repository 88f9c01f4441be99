//! Control-operation stream and its lowering to device bytes.
//!
//! [`Op`] is the contract between encoder and preview decoder: both sides agree on
//! exactly this operation set.

use serde::{Deserialize, Serialize};

use crate::charset::CharacterTable;

pub const ESC: u8 = 0x1B;
pub const GS: u8 = 0x1D;
pub const LF: u8 = 0x0A;

/// Bit of the `ESC !` print-mode byte selecting double height.
pub const DOUBLE_HEIGHT_BIT: u8 = 0x10;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutKind {
    Full,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Op {
    /// Literal text; never contains line breaks.
    Text(String),
    Init,
    SetCharset(CharacterTable),
    Align(Alignment),
    Bold(bool),
    Underline(bool),
    DoubleHeight(bool),
    Cut(CutKind),
    Newline,
}

impl Op {
    /// Fixed byte sequence of a control operation (text is lowered by the stream).
    pub fn control_bytes(&self) -> Vec<u8> {
        match self {
            Op::Text(_) => Vec::new(),
            Op::Init => vec![ESC, b'@'],
            Op::SetCharset(table) => vec![ESC, b't', table.index()],
            Op::Align(Alignment::Left) => vec![ESC, b'a', 0],
            Op::Align(Alignment::Center) => vec![ESC, b'a', 1],
            Op::Bold(on) => vec![ESC, b'E', u8::from(*on)],
            Op::Underline(on) => vec![ESC, b'-', u8::from(*on)],
            Op::DoubleHeight(on) => vec![ESC, b'!', if *on { DOUBLE_HEIGHT_BIT } else { 0 }],
            Op::Cut(CutKind::Full) => vec![GS, b'V', 0],
            Op::Cut(CutKind::Partial) => vec![GS, b'V', 1],
            Op::Newline => vec![LF],
        }
    }
}

/// Ordered sequence of text and control operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteStream {
    ops: Vec<Op>,
}

impl ByteStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Op) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Append text, turning embedded line breaks into [`Op::Newline`].
    pub fn text(&mut self, text: &str) -> &mut Self {
        let mut first = true;
        for segment in text.split('\n') {
            if !first {
                self.ops.push(Op::Newline);
            }
            first = false;
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            if !segment.is_empty() {
                self.ops.push(Op::Text(segment.to_string()));
            }
        }
        self
    }

    /// Text followed by a newline.
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.text(text);
        self.newline()
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Op::Newline)
    }

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        self.push(Op::Align(alignment))
    }

    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.push(Op::Bold(on))
    }

    pub fn underline(&mut self, on: bool) -> &mut Self {
        self.push(Op::Underline(on))
    }

    pub fn double_height(&mut self, on: bool) -> &mut Self {
        self.push(Op::DoubleHeight(on))
    }

    pub fn cut(&mut self, kind: CutKind) -> &mut Self {
        self.push(Op::Cut(kind))
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = Op>) -> &mut Self {
        self.ops.extend(ops);
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Raw device bytes. Text goes through the most recently selected table
    /// (CP860 until an [`Op::SetCharset`] says otherwise).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut table = CharacterTable::default();
        let mut out = Vec::with_capacity(self.ops.len() * 8);
        for op in &self.ops {
            match op {
                Op::Text(text) => out.extend(text.chars().map(|ch| lower_char(table, ch))),
                Op::SetCharset(selected) => {
                    table = *selected;
                    out.extend(op.control_bytes());
                }
                _ => out.extend(op.control_bytes()),
            }
        }
        out
    }

    /// Text content only, one `\n` per [`Op::Newline`].
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            match op {
                Op::Text(text) => out.push_str(text),
                Op::Newline => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    pub fn cuts(&self) -> Vec<CutKind> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Cut(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }
}

impl From<Vec<Op>> for ByteStream {
    fn from(ops: Vec<Op>) -> Self {
        Self { ops }
    }
}

/// Control characters in text would be read as commands by the device.
fn lower_char(table: CharacterTable, ch: char) -> u8 {
    match ch {
        '\t' => b' ',
        c if (c as u32) < 0x20 || c == '\u{7f}' => b' ',
        c => table.encode_char(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_sequences_are_fixed() {
        assert_eq!(Op::Init.control_bytes(), vec![0x1B, 0x40]);
        assert_eq!(Op::Bold(true).control_bytes(), vec![0x1B, 0x45, 1]);
        assert_eq!(Op::Underline(false).control_bytes(), vec![0x1B, 0x2D, 0]);
        assert_eq!(Op::Align(Alignment::Center).control_bytes(), vec![0x1B, 0x61, 1]);
        assert_eq!(Op::DoubleHeight(true).control_bytes(), vec![0x1B, 0x21, 0x10]);
        assert_eq!(Op::Cut(CutKind::Full).control_bytes(), vec![0x1D, 0x56, 0]);
        assert_eq!(Op::Cut(CutKind::Partial).control_bytes(), vec![0x1D, 0x56, 1]);
        assert_eq!(
            Op::SetCharset(CharacterTable::Pc860).control_bytes(),
            vec![0x1B, 0x74, 3]
        );
    }

    #[test]
    fn text_splits_on_line_breaks() {
        let mut stream = ByteStream::new();
        stream.text("a\r\nb\n");
        assert_eq!(
            stream.ops(),
            &[
                Op::Text("a".into()),
                Op::Newline,
                Op::Text("b".into()),
                Op::Newline
            ]
        );
    }

    #[test]
    fn text_is_lowered_through_selected_table() {
        let mut stream = ByteStream::new();
        stream
            .push(Op::SetCharset(CharacterTable::Pc850))
            .text("ã")
            .push(Op::SetCharset(CharacterTable::Pc860))
            .text("ã\u{1b}");
        assert_eq!(
            stream.to_bytes(),
            vec![0x1B, b't', 2, 0xC6, 0x1B, b't', 3, 0x84, b' ']
        );
    }
}
