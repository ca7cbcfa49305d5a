//! Duration literals accepted in behavior documents.
//!
//! Two spellings are supported:
//! - Human units: `"500ms"`, `"10s"`, `"1m"`, `"1h30m"`, `"2 days"`
//! - ISO-8601: `"PT10S"`, `"PT0.5S"`, `"P1DT2H"`, `"P2W"`
//!
//! Anything else is a hard error: a typo in a timeout must fail the reload
//! rather than silently fall back to an inherited value.

use std::time::Duration;

use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;

use crate::DurationParseError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration literal.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    if trimmed.starts_with('P') || trimmed.starts_with('p') {
        return parse_iso8601_duration(trimmed);
    }

    parse_human_duration(trimmed)
}

/// Unit multiplier in nanoseconds
fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1,
        "us" | "µs" | "micro" | "micros" | "microsecond" | "microseconds" => 1_000,
        "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => 1_000_000,
        "s" | "sec" | "secs" | "second" | "seconds" => NANOS_PER_SEC,
        "m" | "min" | "mins" | "minute" | "minutes" => 60 * NANOS_PER_SEC,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600 * NANOS_PER_SEC,
        "d" | "day" | "days" => 86_400 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

/// `<int><unit>` groups, optionally repeated (`"1h30m"`) and space separated
fn parse_human_duration(input: &str) -> Result<Duration, DurationParseError> {
    let mut total: u128 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        rest = rest.trim_start();

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(DurationParseError::MissingNumber(input.to_string()));
        }
        let value: u128 = rest[..digits_end]
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(input.to_string()))?;
        rest = rest[digits_end..].trim_start();

        let unit_end = rest
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        if unit.is_empty() && rest.starts_with('.') {
            return Err(DurationParseError::InvalidNumber(input.to_string()));
        }
        let multiplier = unit_nanos(&unit.to_ascii_lowercase()).ok_or_else(|| {
            DurationParseError::UnknownUnit {
                input: input.to_string(),
                unit: unit.to_string(),
            }
        })?;
        rest = &rest[unit_end..];

        total = value
            .checked_mul(multiplier)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
    }

    nanos_to_duration(total, input)
}

/// `P[nW][nD][T[nH][nM][n[.f]S]]`. Calendar years and months are rejected,
/// their length depends on the date they are applied to.
fn parse_iso8601_duration(input: &str) -> Result<Duration, DurationParseError> {
    let malformed = || DurationParseError::InvalidIso8601(input.to_string());
    let upper = input.to_ascii_uppercase();
    let body = upper.strip_prefix('P').ok_or_else(malformed)?;
    if body.is_empty() {
        return Err(malformed());
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((_, "")) => return Err(malformed()),
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut total: u128 = 0;
    let mut add = |nanos: u128| -> Result<(), DurationParseError> {
        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
        Ok(())
    };

    for (number, designator) in iso_components(date_part).ok_or_else(malformed)? {
        let multiplier = match designator {
            'W' => 7 * 86_400 * NANOS_PER_SEC,
            'D' => 86_400 * NANOS_PER_SEC,
            _ => return Err(malformed()),
        };
        add(scale(number, multiplier).ok_or_else(malformed)?)?;
    }

    if let Some(time_part) = time_part {
        for (number, designator) in iso_components(time_part).ok_or_else(malformed)? {
            let multiplier = match designator {
                'H' => 3_600 * NANOS_PER_SEC,
                'M' => 60 * NANOS_PER_SEC,
                'S' => NANOS_PER_SEC,
                _ => return Err(malformed()),
            };
            add(scale(number, multiplier).ok_or_else(malformed)?)?;
        }
    }

    nanos_to_duration(total, input)
}

/// Splits `"1H30M"` into `[("1", 'H'), ("30", 'M')]`
fn iso_components(part: &str) -> Option<Vec<(&str, char)>> {
    let mut components = Vec::new();
    let mut start = 0;
    for (i, c) in part.char_indices() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            continue;
        }
        if i == start {
            return None;
        }
        components.push((&part[start..i], c));
        start = i + c.len_utf8();
    }
    if start != part.len() {
        return None;
    }
    Some(components)
}

/// Multiplies a decimal literal (`"12"`, `"0.5"`, `"1,25"`) by `multiplier` without floats
fn scale(
    number: &str,
    multiplier: u128,
) -> Option<u128> {
    let number = number.replace(',', ".");
    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number.as_str(), ""),
    };
    if whole.is_empty() || fraction.contains('.') {
        return None;
    }
    let whole: u128 = whole.parse().ok()?;
    let mut nanos = whole.checked_mul(multiplier)?;

    if !fraction.is_empty() {
        if fraction.len() > 9 {
            return None;
        }
        let denominator = 10u128.pow(fraction.len() as u32);
        let numerator: u128 = fraction.parse().ok()?;
        nanos = nanos.checked_add(numerator.checked_mul(multiplier)? / denominator)?;
    }
    Some(nanos)
}

fn nanos_to_duration(
    nanos: u128,
    input: &str,
) -> Result<Duration, DurationParseError> {
    let secs = u64::try_from(nanos / NANOS_PER_SEC)
        .map_err(|_| DurationParseError::Overflow(input.to_string()))?;
    Ok(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}

/// serde adapter for `Option<Duration>` fields written as duration literals
pub(crate) fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(D::Error::custom))
        .transpose()
}
