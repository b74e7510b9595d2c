//! Exact resource quantities
//!
//! Kubernetes expresses CPU and memory as decimal quantities with SI or
//! binary suffixes (`100m`, `1.5`, `256Mi`, `1e3`). A `ResourceQuantity`
//! keeps the value as an integer count of nano-units so sums of fractional
//! millicores or mebibytes stay exact; floating point is only used for the
//! final ratio.

use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{QuantityError, QuantityResult};

/// Nano-units per whole unit (core or byte)
const NANOS_PER_UNIT: i128 = 1_000_000_000;

/// Largest power of ten that fits in an i128
const MAX_POW10: u32 = 38;

/// Binary suffixes, largest first
const BINARY_SUFFIXES: &[(&str, u32)] = &[
    ("Ei", 60),
    ("Pi", 50),
    ("Ti", 40),
    ("Gi", 30),
    ("Mi", 20),
    ("Ki", 10),
];

/// Which resource a quantity measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Cores, possibly fractional
    Cpu,
    /// Bytes
    Memory,
}

impl ResourceKind {
    /// Key of this resource in a container's limits/requests map
    pub fn resource_name(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

/// An exact CPU or memory quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceQuantity {
    kind: ResourceKind,
    nanos: i128,
}

impl ResourceQuantity {
    pub fn zero(kind: ResourceKind) -> Self {
        Self { kind, nanos: 0 }
    }

    pub fn from_nanos(kind: ResourceKind, nanos: i128) -> Self {
        Self { kind, nanos }
    }

    pub fn millicores(millis: i64) -> Self {
        Self::from_nanos(ResourceKind::Cpu, millis as i128 * 1_000_000)
    }

    pub fn bytes(bytes: i64) -> Self {
        Self::from_nanos(ResourceKind::Memory, bytes as i128 * NANOS_PER_UNIT)
    }

    /// Parse a Kubernetes quantity string
    ///
    /// Accepts an optional sign, a decimal number and a binary SI
    /// (`Ki`..`Ei`), decimal SI (`n`, `u`, `m`, `k`..`E`) or exponent
    /// (`e3`, `E-2`) suffix. Precision below one nano-unit rounds up.
    pub fn parse(kind: ResourceKind, text: &str) -> QuantityResult<Self> {
        Ok(Self::from_nanos(kind, parse_nanos(text)?))
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Magnitude in nano-units (nanocores or nanobytes)
    pub fn nanos(&self) -> i128 {
        self.nanos
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    /// Sum of two quantities of the same kind
    pub fn checked_add(&self, other: &ResourceQuantity) -> QuantityResult<ResourceQuantity> {
        self.ensure_same_kind(other)?;
        let nanos = self
            .nanos
            .checked_add(other.nanos)
            .ok_or_else(|| QuantityError::Overflow(format!("{} + {}", self, other)))?;
        Ok(Self::from_nanos(self.kind, nanos))
    }

    /// `self / whole`, or `None` when `whole` is zero
    pub fn ratio(&self, whole: &ResourceQuantity) -> QuantityResult<Option<f64>> {
        self.ensure_same_kind(whole)?;
        if whole.nanos == 0 {
            return Ok(None);
        }
        Ok(Some(self.nanos as f64 / whole.nanos as f64))
    }

    fn ensure_same_kind(&self, other: &ResourceQuantity) -> QuantityResult<()> {
        if self.kind != other.kind {
            return Err(QuantityError::UnitMismatch {
                left: self.kind,
                right: other.kind,
            });
        }
        Ok(())
    }
}

impl PartialOrd for ResourceQuantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.kind != other.kind {
            return None;
        }
        Some(self.nanos.cmp(&other.nanos))
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos < 0 {
            f.write_str("-")?;
        }
        let nanos = self.nanos.unsigned_abs();
        if nanos == 0 {
            return f.write_str("0");
        }

        if self.kind == ResourceKind::Memory && nanos % NANOS_PER_UNIT as u128 == 0 {
            let bytes = nanos / NANOS_PER_UNIT as u128;
            for (suffix, shift) in BINARY_SUFFIXES {
                let unit = 1u128 << shift;
                if bytes % unit == 0 {
                    return write!(f, "{}{}", bytes / unit, suffix);
                }
            }
            return write!(f, "{}", bytes);
        }

        write_decimal(f, nanos)
    }
}

impl Serialize for ResourceQuantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn write_decimal(f: &mut fmt::Formatter<'_>, nanos: u128) -> fmt::Result {
    if nanos % 1_000_000_000 == 0 {
        write!(f, "{}", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        write!(f, "{}m", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        write!(f, "{}u", nanos / 1_000)
    } else {
        write!(f, "{}n", nanos)
    }
}

enum Suffix {
    /// Multiply by 2^shift
    Binary(u32),
    /// Multiply by 10^exponent
    Decimal(i32),
}

fn parse_suffix(suffix: &str) -> Option<Suffix> {
    let decimal = match suffix {
        "" => 0,
        "n" => -9,
        "u" => -6,
        "m" => -3,
        "k" => 3,
        "M" => 6,
        "G" => 9,
        "T" => 12,
        "P" => 15,
        "E" => 18,
        _ => {
            if let Some((_, shift)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
                return Some(Suffix::Binary(*shift));
            }
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            return exponent.parse::<i32>().ok().map(Suffix::Decimal);
        }
    };
    Some(Suffix::Decimal(decimal))
}

fn pow10(exponent: u32) -> Option<i128> {
    if exponent > MAX_POW10 {
        return None;
    }
    10i128.checked_pow(exponent)
}

fn div_ceil(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    if numerator % denominator == 0 {
        quotient
    } else {
        quotient + 1
    }
}

fn parse_nanos(text: &str) -> QuantityResult<i128> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QuantityError::Empty);
    }
    let invalid = || QuantityError::Invalid(text.to_string());
    let overflow = || QuantityError::Overflow(text.to_string());

    let (negative, body) = if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix('+') {
        (false, rest)
    } else {
        (false, trimmed)
    };

    let number_end = body
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(body.len());
    let (number, suffix) = body.split_at(number_end);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(invalid());
    }

    let mut mantissa: i128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add((digit - b'0') as i128))
            .ok_or_else(overflow)?;
    }
    let scale = fraction.len() as i32;

    let magnitude = match parse_suffix(suffix).ok_or_else(invalid)? {
        Suffix::Binary(shift) => {
            let numerator = mantissa
                .checked_mul(1i128 << shift)
                .and_then(|n| n.checked_mul(NANOS_PER_UNIT))
                .ok_or_else(overflow)?;
            let denominator = pow10(scale as u32).ok_or_else(overflow)?;
            div_ceil(numerator, denominator)
        }
        Suffix::Decimal(exponent) => {
            let shift = exponent
                .checked_add(9)
                .and_then(|e| e.checked_sub(scale))
                .ok_or_else(overflow)?;
            if shift >= 0 {
                let factor = pow10(shift as u32).ok_or_else(overflow)?;
                mantissa.checked_mul(factor).ok_or_else(overflow)?
            } else {
                match pow10(shift.unsigned_abs()) {
                    Some(divisor) => div_ceil(mantissa, divisor),
                    // Smaller than one nano-unit
                    None => i128::from(mantissa != 0),
                }
            }
        }
    };

    Ok(if negative { -magnitude } else { magnitude })
}
