//! Single-byte character tables selectable with `ESC t n`.
//!
//! The lower half (0x00..0x7F) is ASCII in every table; only the upper half differs.

use serde::{Deserialize, Serialize};

/// Replacement byte for characters missing from the active table.
pub const REPLACEMENT: u8 = b'?';

const CP860_HIGH: &str = concat!(
    "ÇüéâãàÁçêÊèÍÔìÃÂ",
    "ÉÀÈôõòÚùÌÕÜ¢£Ù₧Ó",
    "áíóúñÑªº¿Ò¬½¼¡«»",
    "░▒▓│┤╡╢╖╕╣║╗╝╜╛┐",
    "└┴┬├─┼╞╟╚╔╩╦╠═╬╧",
    "╨╤╥╙╘╒╓╫╪┘┌█▄▌▐▀",
    "αßΓπΣσµτΦΘΩδ∞φε∩",
    "≡±≥≤⌠⌡÷≈°∙·√ⁿ²■\u{a0}",
);

const CP850_HIGH: &str = concat!(
    "ÇüéâäàåçêëèïîìÄÅ",
    "ÉæÆôöòûùÿÖÜø£Ø×ƒ",
    "áíóúñÑªº¿®¬½¼¡«»",
    "░▒▓│┤ÁÂÀ©╣║╗╝¢¥┐",
    "└┴┬├─┼ãÃ╚╔╩╦╠═╬¤",
    "ðÐÊËÈıÍÎÏ┘┌█▄¦Ì▀",
    "ÓßÔÒõÕµþÞÚÛÙýÝ¯´",
    "\u{ad}±‗¾¶§÷¸°¨·¹³²■\u{a0}",
);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterTable {
    /// PC860 Portuguese.
    #[default]
    Pc860,
    /// PC850 Multilingual Latin-1.
    Pc850,
}

impl CharacterTable {
    /// Table number sent with `ESC t`.
    pub fn index(&self) -> u8 {
        match self {
            CharacterTable::Pc850 => 2,
            CharacterTable::Pc860 => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            2 => Some(CharacterTable::Pc850),
            3 => Some(CharacterTable::Pc860),
            _ => None,
        }
    }

    fn high_half(&self) -> &'static str {
        match self {
            CharacterTable::Pc850 => CP850_HIGH,
            CharacterTable::Pc860 => CP860_HIGH,
        }
    }

    /// Byte for `ch`, or [`REPLACEMENT`] when the table has no such glyph.
    pub fn encode_char(&self, ch: char) -> u8 {
        if ch.is_ascii() {
            return ch as u8;
        }
        self.high_half()
            .chars()
            .position(|c| c == ch)
            .map(|pos| 0x80 + pos as u8)
            .unwrap_or(REPLACEMENT)
    }

    pub fn decode_byte(&self, byte: u8) -> char {
        if byte < 0x80 {
            return byte as char;
        }
        self.high_half()
            .chars()
            .nth(usize::from(byte - 0x80))
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    pub fn supports(&self, ch: char) -> bool {
        ch.is_ascii() || self.high_half().contains(ch)
    }
}
