//! Duration string parsing
//!
//! Policies carry durations in the Kubernetes `metav1.Duration` format:
//! a sequence of decimal numbers each followed by a unit, e.g. `"5m"`,
//! `"1h30m"`, `"1.5h"`, `"250ms"`. A bare `"0"` is accepted.

use crate::error::{OperatorError, Result};
use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1_000.0),
    ("µs", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60.0 * 1_000_000_000.0),
    ("h", 3600.0 * 1_000_000_000.0),
];

/// Parse a duration string such as `"5m"` or `"1h30m"`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid(input, "empty duration"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(invalid(input, "negative durations are not allowed"));
    }

    let s = s.strip_prefix('+').unwrap_or(s);
    let mut rest = s;
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid(input, "missing unit"))?;
        if num_len == 0 {
            return Err(invalid(input, "expected a number"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| invalid(input, "invalid number"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| invalid(input, &format!("unknown unit '{}'", unit)))?;
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid(input, "duration out of range"));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

fn invalid(input: &str, reason: &str) -> OperatorError {
    OperatorError::Configuration(format!("invalid duration '{}': {}", input, reason))
}
