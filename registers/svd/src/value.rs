// Licensed under the Apache-2.0 license

//! Grammars for the scalar text found in register description documents.
//!
//! Every decoder here consumes the whole input; trailing garbage is an
//! error rather than being silently ignored.

use thiserror::Error;
use winnow::combinator::{
    alt, delimited, eof, not, opt, preceded, separated_pair, terminated,
};
use winnow::error::ContextError;
use winnow::token::{one_of, take_while};
use winnow::Parser;

type PResult<T> = Result<T, ContextError>;

/// Text that does not decode as the requested kind of value.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("invalid {kind} '{text}'")]
pub struct InvalidLiteral {
    pub kind: &'static str,
    pub text: String,
}

impl InvalidLiteral {
    pub fn new(kind: &'static str, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

//=========================================================================
// Integers
//=========================================================================

fn sign(input: &mut &str) -> PResult<bool> {
    opt(one_of(['+', '-']))
        .map(|c| c == Some('-'))
        .parse_next(input)
}

fn radix(input: &mut &str) -> PResult<u32> {
    opt(alt((
        alt(("0x", "0X", "#")).value(16),
        alt(("0b", "0B")).value(2),
        alt(("0o", "0O")).value(8),
    )))
    .map(|r| r.unwrap_or(10))
    .parse_next(input)
}

fn digit_run<'i>(radix: u32, input: &mut &'i str) -> PResult<&'i str> {
    take_while(1.., move |c: char| c.is_digit(radix) || c == '_').parse_next(input)
}

/// Digits in `radix`, allowing `_` separators after the first digit.
fn digits(radix: u32) -> impl FnMut(&mut &str) -> PResult<u64> {
    move |input: &mut &str| {
        let text = digit_run(radix, input)?;
        if text.starts_with('_') {
            return Err(ContextError::new());
        }
        text.chars()
            .filter_map(|c| c.to_digit(radix))
            .try_fold(0u64, |acc, d| {
                acc.checked_mul(u64::from(radix))?.checked_add(u64::from(d))
            })
            .ok_or_else(ContextError::new)
    }
}

fn scale(input: &mut &str) -> PResult<u32> {
    opt(one_of(['k', 'K', 'm', 'M', 'g', 'G', 't', 'T']))
        .map(|c| match c {
            Some('k' | 'K') => 10,
            Some('m' | 'M') => 20,
            Some('g' | 'G') => 30,
            Some('t' | 'T') => 40,
            _ => 0,
        })
        .parse_next(input)
}

/// Sign and magnitude of a scaled integer.
fn integer(input: &mut &str) -> PResult<(bool, u64)> {
    let negative = sign(input)?;
    let radix = radix(input)?;
    let magnitude = digits(radix)(input)?;
    let shift = scale(input)?;
    let magnitude = magnitude
        .checked_mul(1u64 << shift)
        .ok_or_else(ContextError::new)?;
    Ok((negative, magnitude))
}

fn unsigned(input: &mut &str) -> PResult<u64> {
    let (negative, magnitude) = integer(input)?;
    if negative && magnitude != 0 {
        return Err(ContextError::new());
    }
    Ok(magnitude)
}

/// Decodes an unsigned scaled integer such as `0x4000_0000`, `#FF`,
/// `0b1010`, `32`, or `4k`.
pub fn parse_u64(text: &str) -> Result<u64, InvalidLiteral> {
    let trimmed = text.trim();
    unsigned
        .parse(trimmed)
        .map_err(|_| InvalidLiteral::new("integer", text))
}

/// Decodes a signed scaled integer.
pub fn parse_i64(text: &str) -> Result<i64, InvalidLiteral> {
    let err = || InvalidLiteral::new("integer", text);
    let (negative, magnitude) = integer.parse(text.trim()).map_err(|_| err())?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(err());
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| err())
    }
}

/// Decodes `true`/`1` and `false`/`0`.
pub fn parse_bool(text: &str) -> Result<bool, InvalidLiteral> {
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(InvalidLiteral::new("boolean", text)),
    }
}

//=========================================================================
// Structured literals
//=========================================================================

/// Decodes a `[msb:lsb]` bit range literal into `(msb, lsb)`.
pub fn parse_bit_range(text: &str) -> Result<(u64, u64), InvalidLiteral> {
    let ws = |input: &mut &str| -> PResult<()> {
        take_while(0.., char::is_whitespace).void().parse_next(input)
    };
    delimited(
        ("[", ws),
        separated_pair(unsigned, (ws, ":", ws), unsigned),
        (ws, "]"),
    )
    .parse(text.trim())
    .map_err(|_| InvalidLiteral::new("bit range", text))
}

/// Value of an enumerated value entry.
///
/// Bits clear in `mask` are "don't care" positions written as `x` in the
/// binary form. Bits above the written digits are implied zeros.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EnumValueLiteral {
    pub value: u64,
    pub mask: u64,
}

fn binary_digits<'i>(input: &mut &'i str) -> PResult<&'i str> {
    terminated(
        preceded(
            alt(("#", "0b", "0B")),
            take_while(1..=64, ['0', '1', 'x', 'X', '_']),
        ),
        eof,
    )
    .parse_next(input)
}

fn binary_pattern(input: &mut &str) -> PResult<EnumValueLiteral> {
    let bits = binary_digits(input)?;
    let mut literal = EnumValueLiteral {
        value: 0,
        mask: u64::MAX,
    };
    for c in bits.chars().filter(|c| *c != '_') {
        literal.value <<= 1;
        literal.mask = (literal.mask << 1) | 1;
        match c {
            '1' => literal.value |= 1,
            '0' => {}
            _ => literal.mask &= !1,
        }
    }
    Ok(literal)
}

/// Decodes an enumerated value: either a scaled integer or a binary
/// pattern (`#1x0`) where `x` marks bits that do not participate.
pub fn parse_enum_value(text: &str) -> Result<EnumValueLiteral, InvalidLiteral> {
    alt((
        binary_pattern,
        preceded(not("#"), unsigned).map(|value| EnumValueLiteral {
            value,
            mask: u64::MAX,
        }),
    ))
    .parse(text.trim())
    .map_err(|_| InvalidLiteral::new("enumerated value", text))
}

fn decimal(input: &mut &str) -> PResult<u64> {
    digits(10)(input)
}

/// Decodes a `dimIndex` list: `0-7`, `A-D`, or `a,b,c`.
pub fn parse_dim_index(text: &str) -> Result<Vec<String>, InvalidLiteral> {
    let err = || InvalidLiteral::new("dimension index", text);
    let trimmed = text.trim();

    if let Ok((first, last)) = separated_pair(decimal, "-", decimal).parse(trimmed) {
        if first > last {
            return Err(err());
        }
        return Ok((first..=last).map(|i| i.to_string()).collect());
    }
    let upper = |input: &mut &str| -> PResult<char> {
        one_of(|c: char| c.is_ascii_uppercase()).parse_next(input)
    };
    if let Ok((first, last)) = separated_pair(upper, "-", upper).parse(trimmed) {
        if first > last {
            return Err(err());
        }
        return Ok((first..=last).map(|c| c.to_string()).collect());
    }

    let entries: Vec<String> = trimmed.split(',').map(|s| s.trim().to_string()).collect();
    if entries.iter().any(String::is_empty) {
        return Err(err());
    }
    Ok(entries)
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

//=========================================================================
// Literal tables
//=========================================================================

/// An enumeration decoded from a fixed table of document spellings.
pub trait Literal: Copy + 'static {
    /// Name used in error messages.
    const KIND: &'static str;
    /// Accepted spellings. Exact matches win over case-insensitive ones.
    const TABLE: &'static [(&'static str, Self)];

    fn from_literal(text: &str) -> Result<Self, InvalidLiteral> {
        let trimmed = text.trim();
        Self::TABLE
            .iter()
            .find(|(spelling, _)| *spelling == trimmed)
            .or_else(|| {
                Self::TABLE
                    .iter()
                    .find(|(spelling, _)| spelling.eq_ignore_ascii_case(trimmed))
            })
            .map(|(_, value)| *value)
            .ok_or_else(|| InvalidLiteral::new(Self::KIND, text))
    }
}
