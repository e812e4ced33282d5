//! Conversions between ASCII and Persian (Extended Arabic-Indic) digits.
//!
//! Display labels in the console render every number with Persian digits,
//! while stored values (phone numbers, times) are kept in ASCII.

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Replace every ASCII digit in `input` with its Persian counterpart.
pub fn to_persian_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => PERSIAN_DIGITS[d as usize],
            _ => c,
        })
        .collect()
}

/// Replace every Persian digit in `input` with its ASCII counterpart.
pub fn to_english_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match PERSIAN_DIGITS.iter().position(|p| *p == c) {
            Some(idx) => char::from(b'0' + idx as u8),
            None => c,
        })
        .collect()
}
