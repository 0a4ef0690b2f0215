//! Timestamp layouts for `SAGE_TIME_FORMAT`.
//!
//! The override is accepted either as a chrono `strftime` pattern (anything
//! containing `%`) or as a Go reference layout such as
//! `2006-01-02T15:04:05.000Z07:00`. Go layouts are rewritten into the
//! equivalent `strftime` pattern once, at construction.

use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};

/// Go layout tokens, longest first within each shared prefix.
const TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("2006", "%Y"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("_2006", "_%Y"),
    ("_2", "%e"),
    ("15", "%H"),
    ("PM", "%p"),
    ("pm", "%P"),
    // Encoded instants are always UTC, so ISO 8601 zone designators render
    // as a bare `Z`.
    ("Z07:00:00", "Z"),
    ("Z070000", "Z"),
    ("Z07:00", "Z"),
    ("Z0700", "Z"),
    ("Z07", "Z"),
    ("-07:00:00", "%::z"),
    ("-070000", "%z00"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("-07", "%:::z"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// Resolve a time format override into a checked `strftime` pattern.
///
/// **Errors**
///
/// [`ConfigError::InvalidTimeFormat`] if the pattern does not parse, or if
/// it contains no date or time component at all (it would print the same
/// text for every record).
pub fn resolve(format: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidTimeFormat {
        format: format.to_string(),
    };

    let pattern = if format.contains('%') {
        format.to_string()
    } else {
        from_go_layout(format).ok_or_else(invalid)?
    };

    let mut has_component = false;
    for item in StrftimeItems::new(&pattern) {
        match item {
            Item::Error => return Err(invalid()),
            Item::Numeric(..) | Item::Fixed(..) => has_component = true,
            _ => {}
        }
    }
    if !has_component {
        return Err(invalid());
    }
    Ok(pattern)
}

/// Rewrite a Go reference layout as a `strftime` pattern. `None` for a
/// fractional-second width chrono cannot render.
fn from_go_layout(layout: &str) -> Option<String> {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'scan: while let Some(c) = rest.chars().next() {
        if c == '.' || c == ',' {
            if let Some((spec, len)) = fraction(rest)? {
                out.push_str(spec);
                rest = &rest[len..];
                continue;
            }
        }
        for (token, spec) in TOKENS {
            if rest.starts_with(token) {
                out.push_str(spec);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        if c == '%' {
            out.push('%');
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Some(out)
}

/// Match `.000`, `.999` and friends at the start of `rest`.
///
/// `Some(None)` means `rest` does not start a fractional-second token;
/// `None` means it does but with a width chrono has no specifier for.
fn fraction(rest: &str) -> Option<Option<(&'static str, usize)>> {
    let bytes = rest.as_bytes();
    let digit = match bytes.get(1) {
        Some(d @ (b'0' | b'9')) => *d,
        _ => return Some(None),
    };
    let width = bytes[1..].iter().take_while(|b| **b == digit).count();
    if bytes.get(1 + width).is_some_and(u8::is_ascii_digit) {
        return Some(None);
    }

    let comma = bytes[0] == b',';
    let spec = match (digit, width, comma) {
        (b'0', 3, false) => "%.3f",
        (b'0', 6, false) => "%.6f",
        (b'0', 9, false) => "%.9f",
        (b'0', 3, true) => ",%3f",
        (b'0', 6, true) => ",%6f",
        (b'0', 9, true) => ",%9f",
        (b'9', _, false) => "%.f",
        _ => return None,
    };
    Some(Some((spec, 1 + width)))
}
