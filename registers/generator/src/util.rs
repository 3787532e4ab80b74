// Licensed under the Apache-2.0 license

//! Identifier helpers for the exporter.

use std::collections::HashSet;

/// Reduces a document name to identifier characters.
///
/// `-` and whitespace become `_`, any other character outside
/// `[A-Za-z0-9_]` is dropped, and a leading digit gets an `_` prefix.
/// Returns `None` if nothing alphanumeric is left.
///
/// # Examples
/// ```
/// use registers_generator::util::sanitize_identifier;
/// assert_eq!(sanitize_identifier("GPIO-A").as_deref(), Some("GPIO_A"));
/// assert_eq!(sanitize_identifier("2ND(x)").as_deref(), Some("_2NDx"));
/// assert_eq!(sanitize_identifier("%%"), None);
/// ```
pub fn sanitize_identifier(name: &str) -> Option<String> {
    let mut result = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
        } else if c == '-' || c.is_whitespace() {
            result.push('_');
        }
    }
    if !result.chars().any(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    Some(result)
}

/// Hands out names that stay distinct after case conversion.
///
/// Two names collide when they are equal ignoring case and underscores, as
/// both [`snake_case`] and [`camel_case`] could map them to the same
/// identifier. The first claim keeps its name; later ones get `_1`, `_2`, ...
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    pub fn claim(&mut self, name: &str) -> String {
        if self.used.insert(Self::key(name)) {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}_{n}");
            if self.used.insert(Self::key(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Splits a name into words at punctuation, whitespace and lower-to-upper
/// case changes. Runs of capitals stay in one word.
fn words(name: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for part in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut start = 0;
        let bytes = part.as_bytes();
        for i in 1..bytes.len() {
            if bytes[i - 1].is_ascii_lowercase() && bytes[i].is_ascii_uppercase() {
                words.push(&part[start..i]);
                start = i;
            }
        }
        if start < part.len() {
            words.push(&part[start..]);
        }
    }
    words
}

/// A leading digit is not allowed in an identifier.
fn digit_prefix(words: &[&str]) -> &'static str {
    match words.first() {
        Some(word) if word.starts_with(|c: char| c.is_ascii_digit()) => "_",
        _ => "",
    }
}

const KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

fn escape_keyword(mut ident: String) -> String {
    if KEYWORDS.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Lowercase words joined by `_`, e.g. `TimerUp` and `TIMER_UP` both
/// become `timer_up`. Keywords get a `_` suffix.
///
/// ```
/// use registers_generator::util::snake_case;
/// assert_eq!(snake_case("TimerUp"), "timer_up");
/// assert_eq!(snake_case("GPIO_MODER"), "gpio_moder");
/// ```
pub fn snake_case(name: &str) -> String {
    let words = words(name);
    let joined = words
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    escape_keyword(format!("{}{joined}", digit_prefix(&words)))
}

/// Capitalized words without separators, e.g. `TIM1_UP` becomes `Tim1Up`.
///
/// ```
/// use registers_generator::util::camel_case;
/// assert_eq!(camel_case("gpio_moder"), "GpioModer");
/// assert_eq!(camel_case("TIM1_UP"), "Tim1Up");
/// ```
pub fn camel_case(name: &str) -> String {
    let words = words(name);
    let mut result = digit_prefix(&words).to_string();
    for word in &words {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.push(first.to_ascii_uppercase());
            result.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    escape_keyword(result)
}

/// Uppercase words joined by `_`, for constants.
pub fn constant_case(name: &str) -> String {
    let words = words(name);
    let joined = words
        .iter()
        .map(|w| w.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}{joined}", digit_prefix(&words))
}

/// Renders an integer literal: decimal up to 9, otherwise hex grouped in
/// fours.
///
/// # Examples
/// ```
/// use registers_generator::util::hex_const;
/// assert_eq!(hex_const(8), "8");
/// assert_eq!(hex_const(0x4800_0000), "0x4800_0000");
/// ```
pub fn hex_const(val: u64) -> String {
    if val <= 9 {
        return val.to_string();
    }
    let digits = format!("{val:x}");
    let lead = digits.len() % 4;
    let mut groups = Vec::new();
    if lead != 0 {
        groups.push(&digits[..lead]);
    }
    groups.extend((lead..digits.len()).step_by(4).map(|i| &digits[i..i + 4]));
    format!("0x{}", groups.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("CR1").as_deref(), Some("CR1"));
        assert_eq!(sanitize_identifier(" TIM 1 ").as_deref(), Some("TIM_1"));
        assert_eq!(sanitize_identifier("A.B").as_deref(), Some("AB"));
        assert_eq!(sanitize_identifier("3V3").as_deref(), Some("_3V3"));
        assert_eq!(sanitize_identifier("__"), None);
        assert_eq!(sanitize_identifier(""), None);
    }

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("CR"), "CR");
        assert_eq!(names.claim("cr"), "cr_1");
        assert_eq!(names.claim("CR_1"), "CR_1_1");
        assert_eq!(names.claim("C_R"), "C_R_2");
        assert_eq!(names.claim("SR"), "SR");
    }

    #[test]
    fn test_words() {
        assert_eq!(words("DMA_CH1.cnt"), vec!["DMA", "CH1", "cnt"]);
        assert_eq!(words("CenterAligned2"), vec!["Center", "Aligned2"]);
        assert_eq!(words("USBPhy"), vec!["USBPhy"]);
        assert!(words("__").is_empty());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("TIM1"), "tim1");
        assert_eq!(snake_case("DATA_HI"), "data_hi");
        assert_eq!(snake_case("USBPhy"), "usbphy");
        assert_eq!(snake_case("Type"), "type_");
        assert_eq!(snake_case("SELF"), "self_");
        assert_eq!(snake_case("_2ND"), "_2nd");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("usart1_cr"), "Usart1Cr");
        assert_eq!(camel_case("CenterAligned2"), "CenterAligned2");
        assert_eq!(camel_case("DMA_CH"), "DmaCh");
        assert_eq!(camel_case("_3V3"), "_3v3");
        assert_eq!(camel_case("self"), "Self_");
    }

    #[test]
    fn test_constant_case() {
        assert_eq!(constant_case("TimerUp"), "TIMER_UP");
        assert_eq!(constant_case("tim1_up"), "TIM1_UP");
        assert_eq!(constant_case("type"), "TYPE");
    }

    #[test]
    fn test_hex_const() {
        assert_eq!(hex_const(7), "7");
        assert_eq!(hex_const(0x10), "0x10");
        assert_eq!(hex_const(0xabcde), "0xa_bcde");
        assert_eq!(hex_const(0x4001_0000), "0x4001_0000");
    }
}
