//! IBM code page 437 glyphs.
//!
//! Game data stores render characters as CP437 code points. Control codes `0x01..=0x1F` are
//! shown as their graphic glyphs (`☺`, `♥`, `►`, ...) instead of being treated as control characters.

/// glyphs for `0x01..=0x1F`, index 0 is `0x01`
const CONTROL_GLYPHS: [char; 31] = [
    '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '◙', '♂', '♀', '♪', '♫', '☼', '►', //
    '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼',
];

/// glyphs for `0x80..=0xFF`
const UPPER_GLYPHS: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// Converts a CP437 code point to its Unicode glyph.
///
/// Returns `None` for `0`, which has no glyph, and for values that do not fit in a byte.
///
/// ```
/// use dicebag::codepage::cp437_to_unicode;
///
/// assert_eq!(cp437_to_unicode(0x03), Some('♥'));
/// assert_eq!(cp437_to_unicode(0x41), Some('A'));
/// assert_eq!(cp437_to_unicode(0xDB), Some('█'));
/// ```
pub fn cp437_to_unicode(code_point: u32) -> Option<char> {
    match code_point {
        0x01..=0x1F => Some(CONTROL_GLYPHS[code_point as usize - 0x01]),
        0x20..=0x7F => char::from_u32(code_point),
        0x80..=0xFF => Some(UPPER_GLYPHS[code_point as usize - 0x80]),
        _ => None,
    }
}

/// decodes a CP437 byte string. `0x00` becomes U+FFFD.
pub fn cp437_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| cp437_to_unicode(u32::from(b)).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn control_range() {
        assert_eq!(cp437_to_unicode(0x01), Some('☺'));
        assert_eq!(cp437_to_unicode(0x0F), Some('☼'));
        assert_eq!(cp437_to_unicode(0x1A), Some('→'));
        assert_eq!(cp437_to_unicode(0x1F), Some('▼'));
    }

    #[test]
    fn ascii_range() {
        assert_eq!(cp437_to_unicode(0x20), Some(' '));
        assert_eq!(cp437_to_unicode(0x41), Some('A'));
        assert_eq!(cp437_to_unicode(0x7E), Some('~'));
        assert_eq!(cp437_to_unicode(0x7F), Some('\u{7F}'));
    }

    #[test]
    fn upper_range() {
        assert_eq!(cp437_to_unicode(0x80), Some('Ç'));
        assert_eq!(cp437_to_unicode(0x9E), Some('₧'));
        assert_eq!(cp437_to_unicode(0xB0), Some('░'));
        assert_eq!(cp437_to_unicode(0xC5), Some('┼'));
        assert_eq!(cp437_to_unicode(0xE3), Some('π'));
        assert_eq!(cp437_to_unicode(0xFE), Some('■'));
        assert_eq!(cp437_to_unicode(0xFF), Some('\u{A0}'));
    }

    #[test]
    fn out_of_table() {
        assert_eq!(cp437_to_unicode(0x00), None);
        assert_eq!(cp437_to_unicode(0x100), None);
        assert_eq!(cp437_to_unicode(u32::MAX), None);
    }

    #[test]
    fn every_byte_but_zero_has_a_glyph() {
        assert!((1..=0xFF).all(|b| cp437_to_unicode(b).is_some()));
    }

    #[test]
    fn decode_string() {
        assert_eq!(cp437_string(b"\x03 Qud \xF1"), "♥ Qud ±");
        assert_eq!(cp437_string(&[0x00, 0x02]), "\u{FFFD}☻");
    }
}
