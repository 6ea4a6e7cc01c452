//! Race time codec.
//!
//! Times travel through chat as `MM:SS.cc` or `H:MM:SS.cc` strings, optionally
//! prefixed with a sign when they describe a split against a previous record.
//! Internally they are integer centiseconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a time string is not in a recognized shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid race time: {0:?}")]
pub struct TimeParseError(String);

/// Parses `MM:SS.cc` or `H:MM:SS.cc` into centiseconds.
///
/// Returns `None` for any other shape: a missing or short fraction, a
/// non-digit component, the wrong number of `:` separators, or seconds
/// (and minutes, when an hour field is present) outside `0..60`.
pub fn parse_centiseconds(text: &str) -> Option<u32> {
    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, parse_digits(m)?, *s),
        [h, m, s] => {
            let minutes = parse_digits(m)?;
            if minutes >= 60 {
                return None;
            }
            (parse_digits(h)?, minutes, *s)
        }
        _ => return None,
    };

    let (whole, fraction) = seconds.split_once('.')?;
    if fraction.len() != 2 {
        return None;
    }
    let whole = parse_digits(whole)?;
    let fraction = parse_digits(fraction)?;
    if whole >= 60 {
        return None;
    }

    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(whole)?
        .checked_mul(100)?
        .checked_add(fraction)
}

/// Formats centiseconds as `MM:SS.cc`, or `H:MM:SS.cc` once an hour is reached.
pub fn format_centiseconds(centiseconds: u32) -> String {
    let fraction = centiseconds % 100;
    let total_seconds = centiseconds / 100;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;

    if hours == 0 {
        format!("{minutes:02}:{seconds:02}.{fraction:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}.{fraction:02}")
    }
}

/// Canonicalizes a possibly signed time, keeping the sign character as written.
///
/// `"+0:40.06"` becomes `"+00:40.06"`, an unsigned input stays unsigned.
pub fn normalize_signed_time(text: &str) -> Option<String> {
    text.parse::<SignedTime>().ok().map(|t| t.to_string())
}

/// Accepts only non-empty runs of ASCII digits (`u32::from_str` would also take `+`).
fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A non-negative race duration with centisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RaceTime(u32);

impl RaceTime {
    pub const fn from_centiseconds(centiseconds: u32) -> Self {
        Self(centiseconds)
    }

    pub const fn centiseconds(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_centiseconds(self.0))
    }
}

impl FromStr for RaceTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_centiseconds(s)
            .map(Self)
            .ok_or_else(|| TimeParseError(s.to_string()))
    }
}

impl Serialize for RaceTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RaceTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The sign character a split was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
    Unsigned,
}

impl Sign {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Unsigned => "",
        }
    }
}

/// A delta against a previous record, e.g. `-00:00.10`.
///
/// The sign is kept exactly as written so `+00:00.00` and `00:00.00` survive a
/// round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedTime {
    pub sign: Sign,
    pub magnitude: RaceTime,
}

impl SignedTime {
    /// True for any `-` prefixed split, including `-00:00.00`.
    pub const fn is_negative(self) -> bool {
        matches!(self.sign, Sign::Minus)
    }
}

impl fmt::Display for SignedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign.as_str(), self.magnitude)
    }
}

impl FromStr for SignedTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sign, rest) = if let Some(rest) = s.strip_prefix('+') {
            (Sign::Plus, rest)
        } else if let Some(rest) = s.strip_prefix('-') {
            (Sign::Minus, rest)
        } else {
            (Sign::Unsigned, s)
        };
        let magnitude = parse_centiseconds(rest)
            .map(RaceTime)
            .ok_or_else(|| TimeParseError(s.to_string()))?;
        Ok(Self { sign, magnitude })
    }
}

impl Serialize for SignedTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SignedTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
