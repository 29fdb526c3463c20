//! Duration strings: `"90s"`, `"1m30s"`, `"1.5h"`, `"500ms"`.
//!
//! Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`, and may be
//! chained. A bare number is read as seconds. Negative durations are
//! rejected.

use std::time::Duration;

use crate::error::{ScaleoverError, ScaleoverResult};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse an operator-supplied duration.
pub fn parse_duration(input: &str) -> ScaleoverResult<Duration> {
    let invalid = || ScaleoverError::InvalidDuration(input.to_string());

    let s = input.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    // Bare number: seconds.
    if rest.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = rest.parse().map_err(|_| invalid())?;
        if negative && secs > 0 {
            return Err(invalid());
        }
        return Ok(Duration::from_secs(secs));
    }

    let mut total: u128 = 0;
    let mut chars = rest.char_indices().peekable();
    while chars.peek().is_some() {
        let mut whole = String::new();
        let mut frac = String::new();
        let mut seen_dot = false;
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_digit() {
                if seen_dot {
                    frac.push(c);
                } else {
                    whole.push(c);
                }
            } else if c == '.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            chars.next();
        }
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }

        let mut unit = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                break;
            }
            unit.push(c);
            chars.next();
        }
        let scale = unit_nanos(&unit).ok_or_else(invalid)?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        total = total
            .checked_add(whole.checked_mul(scale).ok_or_else(invalid)?)
            .ok_or_else(invalid)?;

        // Precision beyond nanoseconds is dropped.
        let frac = &frac[..frac.len().min(18)];
        if !frac.is_empty() {
            let numerator: u128 = frac.parse().map_err(|_| invalid())?;
            let denominator = 10u128.pow(frac.len() as u32);
            total = total
                .checked_add(numerator * scale / denominator)
                .ok_or_else(invalid)?;
        }
    }

    if negative && total > 0 {
        return Err(invalid());
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}
