// Seven-segment glyphs, bit 0 = segment a .. bit 6 = segment g.
// Bit 7 drives the decimal point (colon on TM1637 position 1).

pub const DIGITS: [u8; 16] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, // 0-7
    0x7F, 0x6F, 0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71, // 8-F
];

pub const MINUS: u8 = 0x40;
pub const BLANK: u8 = 0x00;
pub const DOT: u8 = 0x80;

/// Glyph for a hex digit, `None` above 0xF.
pub const fn digit(value: u8) -> Option<u8> {
    if value < 16 {
        Some(DIGITS[value as usize])
    } else {
        None
    }
}

pub fn encode_char(c: char) -> Option<u8> {
    match c {
        '0'..='9' => digit(c as u8 - b'0'),
        'a'..='f' => digit(c as u8 - b'a' + 10),
        'A'..='F' => digit(c as u8 - b'A' + 10),
        '-' => Some(MINUS),
        ' ' => Some(BLANK),
        'h' | 'H' => Some(0x76),
        'l' | 'L' => Some(0x38),
        'o' => Some(0x5C),
        'p' | 'P' => Some(0x73),
        'u' | 'U' => Some(0x3E),
        '_' => Some(0x08),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_digits() {
        assert_eq!(encode_char('8'), Some(0x7F));
        assert_eq!(encode_char('b'), encode_char('B'));
        assert_eq!(digit(0xF), Some(0x71));
        assert_eq!(digit(16), None);
        assert_eq!(encode_char('?'), None);
    }
}
