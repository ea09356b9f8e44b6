/// Byte-count parsing and display helpers.
///
/// All internal sizes are `u64` bytes. Floating point only appears when a
/// user types a fractional value ("2.5Gi") or at the display boundary.
use crate::error::{Result, SpiderError};

const KIB: f64 = 1024.0;

/// Parse a human size such as `"10Mi"`, `"5k"`, `"1,048,576"` or `"2.5G"`.
///
/// SI suffixes (`k m g t p e`) are powers of 1000, IEC suffixes
/// (`ki mi gi ti pi ei`) powers of 1024. Case and a trailing `b` are
/// ignored, as are thousands separators.
pub fn parse_size(input: &str) -> Result<u64> {
    let normalised: String = input
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    let invalid = || SpiderError::InvalidSize(input.to_string());

    let body = normalised.strip_suffix('b').unwrap_or(&normalised);
    let (number, multiplier) = split_suffix(body).ok_or_else(invalid)?;
    let number = number.trim();
    if number.is_empty() {
        return Err(invalid());
    }

    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier).ok_or_else(invalid);
    }
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes.round() as u64)
}

/// Split `"10mi"` into `("10", 1 << 20)`. Returns `None` for an unknown suffix.
fn split_suffix(s: &str) -> Option<(&str, u64)> {
    const IEC: [(&str, u32); 6] = [
        ("ki", 1),
        ("mi", 2),
        ("gi", 3),
        ("ti", 4),
        ("pi", 5),
        ("ei", 6),
    ];
    const SI: [(char, u32); 6] = [('k', 1), ('m', 2), ('g', 3), ('t', 4), ('p', 5), ('e', 6)];

    for (suffix, power) in IEC {
        if let Some(rest) = s.strip_suffix(suffix) {
            return Some((rest, 1u64 << (10 * power)));
        }
    }
    for (suffix, power) in SI {
        if let Some(rest) = s.strip_suffix(suffix) {
            return Some((rest, 1000u64.pow(power)));
        }
    }
    match s.chars().last() {
        Some(c) if c.is_ascii_digit() || c == '.' => Some((s, 1)),
        _ => None,
    }
}

/// Format a byte count with binary units (KiB = 1024).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if (bytes as f64) < KIB {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / KIB;
    let mut unit = 0;
    while value >= KIB && unit < UNITS.len() - 1 {
        value /= KIB;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
