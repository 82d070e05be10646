//! Model scale (parameter count) type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaxError};

/// A strictly positive model parameter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Scale(u64);

impl Scale {
    pub const M125: Scale = Scale(125_000_000);
    pub const M350: Scale = Scale(350_000_000);
    pub const B1_3: Scale = Scale(1_300_000_000);
    pub const B6_7: Scale = Scale(6_700_000_000);

    pub fn new(params: u64) -> Result<Self> {
        if params == 0 {
            return Err(TaxError::validation("scale must be a positive parameter count"));
        }
        Ok(Self(params))
    }

    pub fn params(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    /// The four model sizes benchmarked by default.
    pub fn default_set() -> Vec<Scale> {
        vec![Self::M125, Self::M350, Self::B1_3, Self::B6_7]
    }
}

/// Validate a requested scale list: non-empty, positive entries.
pub fn validate_scales(scales: &[Scale]) -> Result<()> {
    if scales.is_empty() {
        return Err(TaxError::validation("scale list must not be empty"));
    }
    // Scale::new already rejects zero; deserialized lists go through try_from too.
    Ok(())
}

impl TryFrom<u64> for Scale {
    type Error = TaxError;

    fn try_from(value: u64) -> Result<Self> {
        Scale::new(value)
    }
}

impl From<Scale> for u64 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

/// Label units, largest first.
const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0 as f64;
        for (i, &(size, suffix)) in UNITS.iter().enumerate() {
            if p < size {
                continue;
            }
            let value = round2(p / size);
            // 999_999_000 rounds to 1000M; show it as 1B
            if value >= 1000.0 && i > 0 {
                let (larger, larger_suffix) = UNITS[i - 1];
                return write!(f, "{}{}", trim_decimal(round2(p / larger)), larger_suffix);
            }
            return write!(f, "{}{}", trim_decimal(value), suffix);
        }
        write!(f, "{}", self.0)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Two decimals at most, trailing zeros dropped.
fn trim_decimal(v: f64) -> String {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl FromStr for Scale {
    type Err = TaxError;

    /// Accepts `350000000`, `6.7e9`, or suffixed forms such as `125M` and `1.3B`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().replace('_', "");
        if trimmed.is_empty() {
            return Err(TaxError::validation("empty scale"));
        }
        let (number, multiplier) = match trimmed.chars().last() {
            Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], 1e3),
            Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], 1e6),
            Some('b' | 'B') => (&trimmed[..trimmed.len() - 1], 1e9),
            Some('t' | 'T') => (&trimmed[..trimmed.len() - 1], 1e12),
            _ => (trimmed.as_str(), 1.0),
        };
        let value: f64 = number
            .parse()
            .map_err(|_| TaxError::validation(format!("invalid scale '{}'", s)))?;
        let params = value * multiplier;
        if !params.is_finite() || params < 1.0 || params > u64::MAX as f64 {
            return Err(TaxError::validation(format!(
                "scale '{}' must be a positive parameter count",
                s
            )));
        }
        Scale::new(params.round() as u64)
    }
}
