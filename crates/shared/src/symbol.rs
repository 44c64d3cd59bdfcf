//! Canonical symbol codec.
//!
//! A side count `n` is written as one letter, `A` for 3 through `R` for 20.
//! A run of `k >= 2` equal side counts is written as the letter followed by
//! `k` in decimal, so `[3, 3, 3, 4]` encodes to `A3B`. Decoding accepts only
//! the canonical spelling: `AAB`, `A1B` and `A03B` are all malformed, which
//! keeps exactly one key per side sequence.

use crate::geometry::check_sides;
use crate::{PolyformError, Result, MAX_SIDES, MIN_SIDES};

/// Longest side sequence a symbol may expand to
pub const MAX_CHAIN_LENGTH: usize = 65_536;

fn malformed(symbol: &str, reason: impl Into<String>) -> PolyformError {
    PolyformError::MalformedSymbol {
        symbol: symbol.to_string(),
        reason: reason.into(),
    }
}

/// Letter for a side count
pub fn primitive_letter(sides: u32) -> Result<char> {
    let sides = check_sides(sides)?;
    Ok(char::from(b'A' + (sides - MIN_SIDES) as u8))
}

/// Side count for a letter, if it belongs to the alphabet
pub fn letter_sides(letter: char) -> Option<u32> {
    if !letter.is_ascii_uppercase() {
        return None;
    }
    let sides = letter as u32 - 'A' as u32 + MIN_SIDES;
    (sides <= MAX_SIDES).then_some(sides)
}

/// Symbol of a single polygon
pub fn primitive_symbol(sides: u32) -> Result<String> {
    primitive_letter(sides).map(String::from)
}

/// Symbol of an ordered two-member chain
pub fn pair_symbol(first: u32, second: u32) -> Result<String> {
    encode(&[first, second])
}

/// All primitive symbols in ascending side count
pub fn primitive_symbols() -> impl Iterator<Item = (u32, String)> {
    (MIN_SIDES..=MAX_SIDES).filter_map(|n| primitive_symbol(n).ok().map(|s| (n, s)))
}

/// Encode an ordered side sequence
pub fn encode(sides: &[u32]) -> Result<String> {
    if sides.is_empty() {
        return Err(malformed("", "side sequence is empty"));
    }
    if sides.len() > MAX_CHAIN_LENGTH {
        return Err(malformed("", format!("more than {MAX_CHAIN_LENGTH} members")));
    }

    let mut out = String::with_capacity(sides.len());
    let mut index = 0;
    while index < sides.len() {
        let letter = primitive_letter(sides[index])?;
        let run = sides[index..]
            .iter()
            .take_while(|&&s| s == sides[index])
            .count();
        out.push(letter);
        if run > 1 {
            out.push_str(&run.to_string());
        }
        index += run;
    }
    Ok(out)
}

/// Decode a canonical symbol back into its side sequence
pub fn decode(symbol: &str) -> Result<Vec<u32>> {
    if symbol.is_empty() {
        return Err(malformed(symbol, "symbol is empty"));
    }

    let mut sides = Vec::new();
    let mut previous: Option<char> = None;
    let mut chars = symbol.chars().peekable();

    while let Some(letter) = chars.next() {
        let n = letter_sides(letter)
            .ok_or_else(|| malformed(symbol, format!("{letter:?} is not in A..=R")))?;
        if previous == Some(letter) {
            return Err(malformed(symbol, format!("repeated {letter} must be run-length encoded")));
        }
        previous = Some(letter);

        let mut digits = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(d);
            chars.next();
        }

        let run = if digits.is_empty() {
            1
        } else {
            if digits.starts_with('0') {
                return Err(malformed(symbol, "run count has a leading zero"));
            }
            let run: usize = digits
                .parse()
                .map_err(|_| malformed(symbol, "run count does not fit"))?;
            if run < 2 {
                return Err(malformed(symbol, "run count must be at least 2"));
            }
            run
        };

        if sides.len() + run > MAX_CHAIN_LENGTH {
            return Err(malformed(symbol, format!("more than {MAX_CHAIN_LENGTH} members")));
        }
        sides.extend(std::iter::repeat(n).take(run));
    }

    Ok(sides)
}

/// True for a single-polygon symbol
pub fn is_primitive(symbol: &str) -> bool {
    let mut chars = symbol.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if letter_sides(c).is_some())
}
