//! Conversion between byte counts and human-readable size strings.
//!
//! The display form picks the largest 1024-based unit (B, KB, MB, GB) and
//! shows two decimal places; the parse direction accepts exactly a decimal
//! number, optional whitespace, and one of those unit tokens. The round trip
//! through `format_size` is lossy within the two-decimal rounding bound.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeFormatError {
    #[error("invalid file size format: {0:?}")]
    InvalidFormat(String),
}

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Render a byte count with the largest unit that keeps the value readable.
pub fn format_size(bytes: u64) -> String {
    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < MIB {
        format!("{:.2} KB", value / KIB)
    } else if value < GIB {
        format!("{:.2} MB", value / MIB)
    } else {
        format!("{:.2} GB", value / GIB)
    }
}

/// Parse a human-readable size back into bytes.
///
/// Accepted shape: `\d+(\.\d+)?`, optional ASCII whitespace, then a
/// case-insensitive `B`, `KB`, `MB`, or `GB`. Anything else (sign, exponent,
/// missing or unknown unit, surrounding whitespace) is rejected.
pub fn parse_size(text: &str) -> Result<u64, SizeFormatError> {
    let invalid = || SizeFormatError::InvalidFormat(text.to_string());

    let number_end = text
        .bytes()
        .position(|b| !(b.is_ascii_digit() || b == b'.'))
        .unwrap_or(text.len());
    let (number, rest) = text.split_at(number_end);
    if !is_plain_decimal(number) {
        return Err(invalid());
    }

    let unit = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "B" => 1.0,
        "KB" => KIB,
        "MB" => MIB,
        "GB" => GIB,
        _ => return Err(invalid()),
    };

    let value: f64 = number.parse().map_err(|_| invalid())?;
    Ok((value * multiplier).round() as u64)
}

/// Digits with at most one interior decimal point; no sign, no exponent.
fn is_plain_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    all_digits(int) && frac.map_or(true, all_digits)
}
