//! Morse table and unit expansion tests

use morse_blinker::expander::{expand, MAX_BURST};
use morse_blinker::morse::{lookup, Element, MorseCode, MAX_ELEMENTS, MORSE_TABLE};
use morse_blinker::{Level, Tick, Unit};

fn dots_and_dashes(code: MorseCode) -> String {
    code.elements()
        .map(|e| match e {
            Element::Dit => '.',
            Element::Dah => '-',
        })
        .collect()
}

#[test]
fn test_letters_and_digits_supported() {
    for c in (b'A'..=b'Z').chain(b'0'..=b'9') {
        assert!(lookup(c).is_supported(), "{} missing", c as char);
    }
}

#[test]
fn test_known_patterns() {
    assert_eq!(dots_and_dashes(lookup(b'S')), "...");
    assert_eq!(dots_and_dashes(lookup(b'O')), "---");
    assert_eq!(dots_and_dashes(lookup(b'Q')), "--.-");
    assert_eq!(dots_and_dashes(lookup(b'7')), "--...");
    assert_eq!(dots_and_dashes(lookup(b'?')), "..--..");
}

#[test]
fn test_unsupported_symbols() {
    assert!(!lookup(b'a').is_supported());
    assert!(!lookup(b'#').is_supported());
    assert!(!lookup(b'\n').is_supported());
    assert_eq!(lookup(0xC3), MorseCode::NONE);
}

#[test]
fn test_pattern_round_trip_over_table() {
    for code in MORSE_TABLE.iter().filter(|c| c.is_supported()) {
        assert_eq!(MorseCode::from_pattern(&dots_and_dashes(*code)), *code);
        assert!(code.len as usize <= MAX_ELEMENTS);
    }
}

#[test]
fn test_every_symbol_expands_within_burst() {
    for c in 0u8..128 {
        let burst = expand(Unit::Char(c));
        let code = lookup(c);
        assert_eq!(burst.len(), 2 * code.len as usize);
        assert!(burst.len() <= MAX_BURST);
        if code.is_supported() {
            // Ends on a letter gap
            assert_eq!(*burst.as_slice().last().unwrap(), Tick::LETTER_GAP);
        }
    }
}

/// Read a character's ticks back as dots and dashes, checking the gaps.
fn decode(ticks: &[Tick]) -> String {
    let mut pattern = String::new();
    for (i, pair) in ticks.chunks(2).enumerate() {
        let (on, gap) = (pair[0], pair[1]);
        assert_eq!(on.level, Level::On);
        pattern.push(match on.duration {
            1 => '.',
            3 => '-',
            d => panic!("on tick of {} units", d),
        });
        let expected = if i + 1 == ticks.len() / 2 {
            Tick::LETTER_GAP
        } else {
            Tick::ELEMENT_GAP
        };
        assert_eq!(gap, expected);
    }
    pattern
}

#[test]
fn test_tick_program_decodes_to_table_pattern() {
    for c in (0u8..128).filter(|&c| lookup(c).is_supported()) {
        let burst = expand(Unit::Char(c));
        assert_eq!(
            decode(burst.as_slice()),
            dots_and_dashes(lookup(c)),
            "symbol {}",
            c as char
        );
    }
}

#[test]
fn test_on_ticks_follow_pattern() {
    let burst = expand(Unit::Char(b'C'));
    let on: Vec<u8> = burst
        .as_slice()
        .iter()
        .filter(|t| t.level == Level::On)
        .map(|t| t.duration)
        .collect();
    assert_eq!(on, [3, 1, 3, 1]);
}
