//! Fixed-precision decimal quantization for camera coordinates.
//!
//! Camera components arrive as user-supplied text. They are rounded in
//! decimal, never through binary floating point, so the text handed to the
//! engine is identical on every platform:
//!
//! - round-half-even to [`PRECISION`] significant digits
//! - adjusted exponent bounded to `MIN_EXPONENT..=MAX_EXPONENT`
//! - values below the normal range are held at a fixed minimum exponent
//!   (subnormal clamping) instead of being rejected
//!
//! Trailing zeros written by the caller are significant: `1.0` stays `1.0`.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{num_bigint::BigInt, BigDecimal, RoundingMode};
use thiserror::Error;

/// Significant digits kept after rounding.
pub const PRECISION: usize = 4;

/// Smallest adjusted exponent of a normal value.
pub const MIN_EXPONENT: i64 = -4;

/// Largest adjusted exponent; anything above overflows.
pub const MAX_EXPONENT: i64 = 4;

/// Smallest exponent a subnormal value may carry.
const TINY_EXPONENT: i64 = MIN_EXPONENT - PRECISION as i64 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantizeError {
    #[error("not a decimal number")]
    Syntax,

    #[error("magnitude exceeds 4 significant digits at exponent +4")]
    Overflow,
}

/// A decimal number rounded to [`PRECISION`] significant digits.
///
/// Stored as sign, coefficient digits and exponent, so `Display` reproduces
/// the canonical text exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantized {
    negative: bool,
    /// Coefficient without leading zeros ("0" for zero).
    digits: String,
    exponent: i64,
}

impl Quantized {
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.digits == "0"
    }

    /// Exponent of the most significant digit.
    pub fn adjusted_exponent(&self) -> i64 {
        self.exponent + self.digits.len() as i64 - 1
    }

    fn zero(negative: bool, exponent: i64) -> Self {
        Self {
            negative,
            digits: "0".to_string(),
            exponent,
        }
    }

    /// Quantize `|coefficient| × 10^exponent`.
    ///
    /// The exponent is wide because it comes straight from user text; it is
    /// bounded before any decimal arithmetic happens.
    fn quantize(negative: bool, coefficient: &BigInt, exponent: i128) -> Result<Self, QuantizeError> {
        let magnitude = BigInt::from(coefficient.magnitude().clone());
        let digits = magnitude.to_string();
        if digits == "0" {
            let exponent = exponent.clamp(i128::from(TINY_EXPONENT), i128::from(MAX_EXPONENT));
            return Ok(Self::zero(negative, exponent as i64));
        }

        let adjusted = exponent + digits.len() as i128 - 1;
        if adjusted > i128::from(MAX_EXPONENT) {
            return Err(QuantizeError::Overflow);
        }
        if adjusted < i128::from(TINY_EXPONENT - 1) {
            // Less than half a unit at the minimum exponent.
            return Ok(Self::zero(negative, TINY_EXPONENT));
        }

        // adjusted is now within a few units of the normal range, so the
        // exponent is bounded by the digit count.
        let exponent = exponent as i64;
        let target = (adjusted as i64 - PRECISION as i64 + 1).max(TINY_EXPONENT);

        let value = BigDecimal::new(magnitude, -exponent);
        let rounded = if target > exponent {
            value.with_scale_round(-target, RoundingMode::HalfEven)
        } else {
            value
        };

        let (coefficient, scale) = rounded.as_bigint_and_exponent();
        let mut digits = coefficient.magnitude().to_string();
        if digits == "0" {
            return Ok(Self::zero(negative, target));
        }
        let mut exponent = -scale;

        // A carry out of the top digit (9999.5 -> 10000) adds one digit.
        if digits.len() > PRECISION {
            digits.pop();
            exponent += 1;
        }

        let quantized = Self {
            negative,
            digits,
            exponent,
        };
        if quantized.adjusted_exponent() > MAX_EXPONENT {
            return Err(QuantizeError::Overflow);
        }
        Ok(quantized)
    }
}

impl FromStr for Quantized {
    type Err = QuantizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(at) => {
                let exponent = s[at + 1..]
                    .parse::<i128>()
                    .map_err(|_| QuantizeError::Syntax)?;
                (&s[..at], exponent)
            }
            None => (s, 0),
        };

        let mantissa = BigDecimal::from_str(mantissa).map_err(|_| QuantizeError::Syntax)?;
        let (coefficient, scale) = mantissa.as_bigint_and_exponent();

        // BigInt has no negative zero; the sign is read from the text.
        Self::quantize(
            s.starts_with('-'),
            &coefficient,
            exponent - i128::from(scale),
        )
    }
}

impl fmt::Display for Quantized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        let adjusted = self.adjusted_exponent();

        if self.exponent <= 0 && adjusted >= -6 {
            if self.exponent == 0 {
                return write!(f, "{sign}{}", self.digits);
            }
            let point = self.digits.len() as i64 + self.exponent;
            if point > 0 {
                let (int_part, frac_part) = self.digits.split_at(point as usize);
                write!(f, "{sign}{int_part}.{frac_part}")
            } else {
                let zeros = "0".repeat((-point) as usize);
                write!(f, "{sign}0.{zeros}{}", self.digits)
            }
        } else {
            let (lead, rest) = self.digits.split_at(1);
            let dot = if rest.is_empty() { "" } else { "." };
            write!(f, "{sign}{lead}{dot}{rest}E{adjusted:+}")
        }
    }
}
