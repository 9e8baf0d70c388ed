//! DTMF (Dual-Tone Multi-Frequency) keypad tones

use std::fmt;

/// Row (low group) frequencies in Hz, ITU-T Q.23
pub const LOW_GROUP_HZ: [u16; 4] = [697, 770, 852, 941];

/// Column (high group) frequencies in Hz, ITU-T Q.23
pub const HIGH_GROUP_HZ: [u16; 4] = [1209, 1336, 1477, 1633];

/// One of the sixteen keypad tones.
///
/// The discriminant is the tone code the platform tone generator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DtmfTone {
    Digit0 = 0,
    Digit1 = 1,
    Digit2 = 2,
    Digit3 = 3,
    Digit4 = 4,
    Digit5 = 5,
    Digit6 = 6,
    Digit7 = 7,
    Digit8 = 8,
    Digit9 = 9,
    Star = 10,
    Pound = 11,
    A = 12,
    B = 13,
    C = 14,
    D = 15,
}

impl DtmfTone {
    pub const ALL: [DtmfTone; 16] = [
        DtmfTone::Digit0,
        DtmfTone::Digit1,
        DtmfTone::Digit2,
        DtmfTone::Digit3,
        DtmfTone::Digit4,
        DtmfTone::Digit5,
        DtmfTone::Digit6,
        DtmfTone::Digit7,
        DtmfTone::Digit8,
        DtmfTone::Digit9,
        DtmfTone::Star,
        DtmfTone::Pound,
        DtmfTone::A,
        DtmfTone::B,
        DtmfTone::C,
        DtmfTone::D,
    ];

    /// Look up the tone for a keypad symbol. Anything outside
    /// `0-9 * # A-D` has no tone; lowercase letters included.
    pub fn from_char(digit: char) -> Option<Self> {
        let tone = match digit {
            '0' => DtmfTone::Digit0,
            '1' => DtmfTone::Digit1,
            '2' => DtmfTone::Digit2,
            '3' => DtmfTone::Digit3,
            '4' => DtmfTone::Digit4,
            '5' => DtmfTone::Digit5,
            '6' => DtmfTone::Digit6,
            '7' => DtmfTone::Digit7,
            '8' => DtmfTone::Digit8,
            '9' => DtmfTone::Digit9,
            '*' => DtmfTone::Star,
            '#' => DtmfTone::Pound,
            'A' => DtmfTone::A,
            'B' => DtmfTone::B,
            'C' => DtmfTone::C,
            'D' => DtmfTone::D,
            _ => return None,
        };
        Some(tone)
    }

    pub fn symbol(&self) -> char {
        match self {
            DtmfTone::Digit0 => '0',
            DtmfTone::Digit1 => '1',
            DtmfTone::Digit2 => '2',
            DtmfTone::Digit3 => '3',
            DtmfTone::Digit4 => '4',
            DtmfTone::Digit5 => '5',
            DtmfTone::Digit6 => '6',
            DtmfTone::Digit7 => '7',
            DtmfTone::Digit8 => '8',
            DtmfTone::Digit9 => '9',
            DtmfTone::Star => '*',
            DtmfTone::Pound => '#',
            DtmfTone::A => 'A',
            DtmfTone::B => 'B',
            DtmfTone::C => 'C',
            DtmfTone::D => 'D',
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Keypad position as (row, column)
    fn position(&self) -> (usize, usize) {
        match self {
            DtmfTone::Digit1 => (0, 0),
            DtmfTone::Digit2 => (0, 1),
            DtmfTone::Digit3 => (0, 2),
            DtmfTone::A => (0, 3),
            DtmfTone::Digit4 => (1, 0),
            DtmfTone::Digit5 => (1, 1),
            DtmfTone::Digit6 => (1, 2),
            DtmfTone::B => (1, 3),
            DtmfTone::Digit7 => (2, 0),
            DtmfTone::Digit8 => (2, 1),
            DtmfTone::Digit9 => (2, 2),
            DtmfTone::C => (2, 3),
            DtmfTone::Star => (3, 0),
            DtmfTone::Digit0 => (3, 1),
            DtmfTone::Pound => (3, 2),
            DtmfTone::D => (3, 3),
        }
    }

    /// (low, high) frequency pair in Hz
    pub fn frequencies(&self) -> (u16, u16) {
        let (row, col) = self.position();
        (LOW_GROUP_HZ[row], HIGH_GROUP_HZ[col])
    }
}

impl fmt::Display for DtmfTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Digit-to-tone mapping used by the sequencer.
pub fn tone_for_digit(digit: char) -> Option<DtmfTone> {
    DtmfTone::from_char(digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mapping_covers_keypad() {
        let keypad = "0123456789*#ABCD";
        let tones: Vec<DtmfTone> = keypad.chars().filter_map(tone_for_digit).collect();
        assert_eq!(tones.len(), 16);

        let unique: HashSet<u8> = tones.iter().map(|t| t.code()).collect();
        assert_eq!(unique.len(), 16);

        for (digit, tone) in keypad.chars().zip(&tones) {
            assert_eq!(tone.symbol(), digit);
            assert_eq!(tone_for_digit(digit), Some(*tone));
        }
    }

    #[test]
    fn test_platform_tone_codes() {
        assert_eq!(DtmfTone::Digit0.code(), 0);
        assert_eq!(DtmfTone::Digit9.code(), 9);
        assert_eq!(DtmfTone::Star.code(), 10);
        assert_eq!(DtmfTone::Pound.code(), 11);
        assert_eq!(DtmfTone::A.code(), 12);
        assert_eq!(DtmfTone::D.code(), 15);
    }

    #[test]
    fn test_unknown_symbols_have_no_tone() {
        for digit in ['a', 'd', 'E', '+', ',', ' ', 'p', 'w', '\u{00e9}'] {
            assert_eq!(tone_for_digit(digit), None, "{:?}", digit);
        }
    }

    #[test]
    fn test_frequency_pairs() {
        assert_eq!(DtmfTone::Digit1.frequencies(), (697, 1209));
        assert_eq!(DtmfTone::Digit5.frequencies(), (770, 1336));
        assert_eq!(DtmfTone::Digit0.frequencies(), (941, 1336));
        assert_eq!(DtmfTone::Pound.frequencies(), (941, 1477));
        assert_eq!(DtmfTone::D.frequencies(), (941, 1633));

        let pairs: HashSet<(u16, u16)> = DtmfTone::ALL.iter().map(|t| t.frequencies()).collect();
        assert_eq!(pairs.len(), 16);
    }
}
