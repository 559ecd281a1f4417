//! Human-friendly value formats accepted by the configuration file.
//!
//! Rates may be written as a fraction (`0.05`) or a percentage (`"5%"`).
//! Durations may be plain milliseconds (`50`) or carry a unit (`"50ms"`, `"2s"`).
//! Anything else, including negative numbers, is a parse error.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RateValue {
    Num(f64),
    Str(String),
}

/// Parses a rate written as a fraction or as a percentage string.
pub fn parse_rate(input: &str) -> Result<f64, String> {
    let s = input.trim();
    let value = match s.strip_suffix('%') {
        Some(percent) => {
            let number: f64 = percent
                .trim()
                .parse()
                .map_err(|_| format!("invalid percentage '{input}'"))?;
            number / 100.0
        }
        None => s
            .parse()
            .map_err(|_| format!("invalid rate '{input}'"))?,
    };
    finite(value)
}

fn finite(value: f64) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("rate must be a finite number, got {value}"))
    }
}

/// Serde adapter for rate fields.
pub fn deserialize_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RateValue::deserialize(deserializer)? {
        RateValue::Num(n) => finite(n).map_err(serde::de::Error::custom),
        RateValue::Str(s) => parse_rate(&s).map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MillisValue {
    Num(u64),
    Str(String),
}

/// Parses a duration in milliseconds, with an optional `ms` or `s` suffix.
pub fn parse_millis(input: &str) -> Result<u64, String> {
    let s = input.trim();
    let (number, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1_000)
    } else {
        (s, 1)
    };
    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{input}'"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{input}' overflows"))
}

/// Serde adapter for millisecond fields.
pub fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match MillisValue::deserialize(deserializer)? {
        MillisValue::Num(n) => Ok(n),
        MillisValue::Str(s) => parse_millis(&s).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rates_accept_fraction_and_percent() {
        assert_eq!(parse_rate("0.25"), Ok(0.25));
        assert_eq!(parse_rate(" 5% "), Ok(0.05));
        assert_eq!(parse_rate("100%"), Ok(1.0));
    }

    #[test]
    fn rates_reject_garbage() {
        assert!(parse_rate("five").is_err());
        assert!(parse_rate("%").is_err());
        assert!(parse_rate("NaN").is_err());
        assert!(parse_rate("inf").is_err());
    }

    #[test]
    fn millis_accept_units() {
        assert_eq!(parse_millis("50"), Ok(50));
        assert_eq!(parse_millis("50ms"), Ok(50));
        assert_eq!(parse_millis("2s"), Ok(2_000));
    }

    #[test]
    fn millis_reject_negative_and_garbage() {
        assert!(parse_millis("-5").is_err());
        assert!(parse_millis("-5ms").is_err());
        assert!(parse_millis("fast").is_err());
    }

    proptest! {
        #[test]
        fn percent_and_fraction_agree(percent in 0u32..=100) {
            let from_percent = parse_rate(&format!("{percent}%")).unwrap();
            let from_fraction = parse_rate(&(f64::from(percent) / 100.0).to_string()).unwrap();
            prop_assert!((from_percent - from_fraction).abs() < 1e-12);
        }

        #[test]
        fn seconds_scale_to_millis(secs in 0u64..1_000_000) {
            prop_assert_eq!(parse_millis(&format!("{secs}s")), Ok(secs * 1_000));
            prop_assert_eq!(parse_millis(&format!("{}ms", secs * 1_000)), Ok(secs * 1_000));
        }
    }
}
