//! Resource quantity parsing.
//!
//! Pods describe CPU in the form of `1`, `0.99` or `1500m`, and memory in
//! the form of `3.49G`, `1.5Gi` or `128974848`. [`Quantity`] keeps the raw
//! string for round-tripping and exposes the parsed value in milli-units
//! (CPU) and base units (memory, bytes).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity cannot be empty")]
    Empty,
    #[error("unable to parse quantity value: {0}")]
    InvalidValue(String),
}

/// A resource quantity such as `1500m`, `0.99`, `3.49G` or `8Gi`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    raw: String,
    value: f64,
}

const DECIMAL_SUFFIXES: &[(&str, f64)] = &[
    ("k", 1e3),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
];

const BINARY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

impl Quantity {
    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (number, multiplier) = split_suffix(trimmed);
        let parsed: f64 = number
            .parse()
            .map_err(|_| QuantityError::InvalidValue(raw.to_string()))?;
        Ok(Quantity {
            raw: trimmed.to_string(),
            value: parsed * multiplier,
        })
    }

    /// The quantity in base units, e.g. bytes for memory.
    pub fn value(&self) -> i64 {
        self.value.round() as i64
    }

    /// The quantity in milli-units, e.g. millicores for CPU.
    pub fn milli_value(&self) -> i64 {
        (self.value * 1000.0).round() as i64
    }

    pub fn from_millis(millis: i64) -> Self {
        Quantity {
            raw: format!("{millis}m"),
            value: millis as f64 / 1000.0,
        }
    }

    pub fn from_value(value: i64) -> Self {
        Quantity {
            raw: value.to_string(),
            value: value as f64,
        }
    }
}

fn split_suffix(raw: &str) -> (&str, f64) {
    for (suffix, multiplier) in BINARY_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return (number, *multiplier);
        }
    }
    for (suffix, multiplier) in DECIMAL_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return (number, *multiplier);
        }
    }
    if let Some(number) = raw.strip_suffix('m') {
        return (number, 1e-3);
    }
    (raw, 1.0)
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Quantity::parse(raw)
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Quantity::parse(&raw)
    }
}

impl From<Quantity> for String {
    fn from(quantity: Quantity) -> Self {
        quantity.raw
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
