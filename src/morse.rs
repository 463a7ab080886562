//! Static Morse alphabet.
//!
//! One entry per 7-bit ASCII code. Each entry is a bit length plus a bit
//! pattern read MSB-first over `len` bits: 0 = dot, 1 = dash. A length of
//! zero marks a symbol with no Morse representation.

/// Morse element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Dit,
    Dah,
}

/// Encoded Morse symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MorseCode {
    /// Number of elements (0 = unsupported).
    pub len: u8,
    /// Elements, MSB first within the low `len` bits.
    pub code: u8,
}

impl MorseCode {
    /// Unsupported symbol.
    pub const NONE: Self = Self { len: 0, code: 0 };

    /// Build from a dot/dash pattern such as `".-"`.
    pub const fn from_pattern(pattern: &str) -> Self {
        let bytes = pattern.as_bytes();
        let mut code = 0u8;
        let mut i = 0;
        while i < bytes.len() {
            code = (code << 1) | (bytes[i] == b'-') as u8;
            i += 1;
        }
        Self {
            len: bytes.len() as u8,
            code,
        }
    }

    /// True if this symbol has a Morse representation.
    #[inline]
    pub const fn is_supported(&self) -> bool {
        self.len != 0
    }

    /// Iterate elements in sending order.
    #[inline]
    pub fn elements(self) -> Elements {
        Elements {
            code: self.code,
            remaining: self.len,
        }
    }
}

/// Iterator over the elements of a [`MorseCode`], MSB first.
#[derive(Clone, Debug)]
pub struct Elements {
    code: u8,
    remaining: u8,
}

impl Iterator for Elements {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if (self.code >> self.remaining) & 1 == 1 {
            Some(Element::Dah)
        } else {
            Some(Element::Dit)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for Elements {}

/// Longest pattern in the table.
pub const MAX_ELEMENTS: usize = 7;

const SYMBOLS: &[(u8, &str)] = &[
    (b'A', ".-"),
    (b'B', "-..."),
    (b'C', "-.-."),
    (b'D', "-.."),
    (b'E', "."),
    (b'F', "..-."),
    (b'G', "--."),
    (b'H', "...."),
    (b'I', ".."),
    (b'J', ".---"),
    (b'K', "-.-"),
    (b'L', ".-.."),
    (b'M', "--"),
    (b'N', "-."),
    (b'O', "---"),
    (b'P', ".--."),
    (b'Q', "--.-"),
    (b'R', ".-."),
    (b'S', "..."),
    (b'T', "-"),
    (b'U', "..-"),
    (b'V', "...-"),
    (b'W', ".--"),
    (b'X', "-..-"),
    (b'Y', "-.--"),
    (b'Z', "--.."),
    (b'0', "-----"),
    (b'1', ".----"),
    (b'2', "..---"),
    (b'3', "...--"),
    (b'4', "....-"),
    (b'5', "....."),
    (b'6', "-...."),
    (b'7', "--..."),
    (b'8', "---.."),
    (b'9', "----."),
    (b'.', ".-.-.-"),
    (b',', "--..--"),
    (b'?', "..--.."),
    (b'\'', ".----."),
    (b'!', "-.-.--"),
    (b'/', "-..-."),
    (b'(', "-.--."),
    (b')', "-.--.-"),
    (b'&', ".-..."),
    (b':', "---..."),
    (b';', "-.-.-."),
    (b'=', "-...-"),
    (b'+', ".-.-."),
    (b'-', "-....-"),
    (b'_', "..--.-"),
    (b'"', ".-..-."),
    (b'$', "...-..-"),
    (b'@', ".--.-."),
];

const fn build_table() -> [MorseCode; 128] {
    let mut table = [MorseCode::NONE; 128];
    let mut i = 0;
    while i < SYMBOLS.len() {
        let (symbol, pattern) = SYMBOLS[i];
        table[symbol as usize] = MorseCode::from_pattern(pattern);
        i += 1;
    }
    table
}

/// Morse table indexed by ASCII code.
pub static MORSE_TABLE: [MorseCode; 128] = build_table();

/// Look up a symbol. Lowercase letters and bytes outside ASCII are unsupported.
#[inline]
pub fn lookup(symbol: u8) -> MorseCode {
    MORSE_TABLE
        .get(symbol as usize)
        .copied()
        .unwrap_or(MorseCode::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(code: MorseCode) -> std::string::String {
        code.elements()
            .map(|e| match e {
                Element::Dit => '.',
                Element::Dah => '-',
            })
            .collect()
    }

    #[test]
    fn test_every_symbol_round_trips() {
        for &(symbol, expected) in SYMBOLS {
            assert_eq!(pattern(lookup(symbol)), expected, "symbol {}", symbol as char);
        }
    }

    #[test]
    fn test_bit_layout_msb_first() {
        // A = .- -> len 2, code 0b01
        assert_eq!(lookup(b'A'), MorseCode { len: 2, code: 0b01 });
        // N = -. -> len 2, code 0b10
        assert_eq!(lookup(b'N'), MorseCode { len: 2, code: 0b10 });
    }

    #[test]
    fn test_unsupported() {
        assert!(!lookup(b'a').is_supported());
        assert!(!lookup(b'#').is_supported());
        assert!(!lookup(b' ').is_supported());
        assert!(!lookup(0xC5).is_supported());
    }

    #[test]
    fn test_max_elements() {
        let longest = SYMBOLS.iter().map(|(_, p)| p.len()).max().unwrap();
        assert_eq!(longest, MAX_ELEMENTS);
    }
}
