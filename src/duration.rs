//! Durations written the way Go's `time.ParseDuration` reads them: `1s`,
//! `100ms`, `1.5h`, `1m30s`, or a bare `0`.

use std::{convert::TryFrom, time::Duration};
use thiserror::Error;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fractions are truncated to this many digits.
const MAX_FRACTION_DIGITS: usize = 18;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseDurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration {0:?} is not allowed")]
    Negative(String),

    #[error("duration {0:?} is too large")]
    Overflow(String),
}

pub fn parse(input: &str) -> Result<Duration, ParseDurationError> {
    let (negative, unsigned) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let duration = parse_unsigned(input, unsigned)?;
    if negative && duration != Duration::ZERO {
        return Err(ParseDurationError::Negative(input.to_owned()));
    }
    Ok(duration)
}

fn parse_unsigned(input: &str, mut s: &str) -> Result<Duration, ParseDurationError> {
    let invalid = || ParseDurationError::Invalid(input.to_owned());
    let overflow = || ParseDurationError::Overflow(input.to_owned());

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let (whole, rest) = split_digits(s);
        let (fraction, rest) = match rest.strip_prefix('.') {
            Some(rest) => split_digits(rest),
            None => ("", rest),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_end = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or_else(|| rest.len());
        let (unit, rest) = rest.split_at(unit_end);
        let scale: u128 = match unit {
            "" => return Err(ParseDurationError::MissingUnit(input.to_owned())),
            "ns" => 1,
            "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 60 * 60 * NANOS_PER_SEC,
            _ => {
                return Err(ParseDurationError::UnknownUnit {
                    unit: unit.to_owned(),
                    input: input.to_owned(),
                })
            }
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let numerator: u128 = fraction.parse().map_err(|_| invalid())?;
            numerator * scale / 10_u128.pow(fraction.len() as u32)
        };

        total = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| n.checked_add(total))
            .ok_or_else(overflow)?;
        s = rest;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| s.len());
    s.split_at(end)
}

#[test]
fn test_units() {
    assert_eq!(parse("1s"), Ok(Duration::from_secs(1)));
    assert_eq!(parse("100ms"), Ok(Duration::from_millis(100)));
    assert_eq!(parse("7ns"), Ok(Duration::from_nanos(7)));
    assert_eq!(parse("3us"), Ok(Duration::from_micros(3)));
    assert_eq!(parse("3µs"), Ok(Duration::from_micros(3)));
    assert_eq!(parse("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse("1h"), Ok(Duration::from_secs(3600)));
}

#[test]
fn test_zero() {
    assert_eq!(parse("0"), Ok(Duration::ZERO));
    assert_eq!(parse("+0"), Ok(Duration::ZERO));
    assert_eq!(parse("-0"), Ok(Duration::ZERO));
    assert_eq!(parse("-0s"), Ok(Duration::ZERO));
    assert_eq!(parse("-0.000ms"), Ok(Duration::ZERO));
    assert_eq!(parse("+0h0m"), Ok(Duration::ZERO));
    assert_eq!(parse("0s"), Ok(Duration::ZERO));
}

#[test]
fn test_compound_and_fractions() {
    assert_eq!(parse("1m30s"), Ok(Duration::from_secs(90)));
    assert_eq!(parse("1.5s"), Ok(Duration::from_millis(1500)));
    assert_eq!(parse(".5s"), Ok(Duration::from_millis(500)));
    assert_eq!(parse("1.s"), Ok(Duration::from_secs(1)));
    assert_eq!(parse("1h2m3.004s"), Ok(Duration::new(3723, 4_000_000)));
    assert_eq!(parse("+250ms"), Ok(Duration::from_millis(250)));
}

#[test]
fn test_errors() {
    assert_eq!(parse(""), Err(ParseDurationError::Invalid(String::new())));
    assert_eq!(parse(".s"), Err(ParseDurationError::Invalid(".s".to_owned())));
    assert_eq!(parse("1"), Err(ParseDurationError::MissingUnit("1".to_owned())));
    assert_eq!(
        parse("5 s"),
        Err(ParseDurationError::UnknownUnit {
            unit: " s".to_owned(),
            input: "5 s".to_owned(),
        })
    );
    assert_eq!(
        parse("3d"),
        Err(ParseDurationError::UnknownUnit {
            unit: "d".to_owned(),
            input: "3d".to_owned(),
        })
    );
    assert_eq!(parse("-1s"), Err(ParseDurationError::Negative("-1s".to_owned())));
    assert_eq!(parse("-1ns"), Err(ParseDurationError::Negative("-1ns".to_owned())));
    assert_eq!(parse("-"), Err(ParseDurationError::Invalid("-".to_owned())));
    assert_eq!(
        parse("99999999999999999999999999999999999999999h"),
        Err(ParseDurationError::Overflow(
            "99999999999999999999999999999999999999999h".to_owned()
        ))
    );
}
