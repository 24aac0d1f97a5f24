//! Wide unsigned integer encoding
//!
//! Magnitudes are stored as `<prefix><hex>` where `<prefix>` is the number
//! of hex digits minus one, written as a fixed-width hex number. Longer
//! magnitudes therefore sort after shorter ones and plain string comparison
//! orders encoded values numerically.
//!
//! Negative values are stored as `-` followed by the bit-inverted encoding of
//! the absolute value, which reverses their order and places them below
//! every non-negative value.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{FilterError, FilterResult};

/// Storage width of a wide integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BigUIntWidth {
    /// Up to 64-bit magnitudes, one prefix digit
    U64,
    /// Up to 1024-bit magnitudes, two prefix digits
    U1024,
}

impl BigUIntWidth {
    /// Number of hex digits used by the length prefix
    pub fn prefix_len(&self) -> usize {
        match self {
            BigUIntWidth::U64 => 1,
            BigUIntWidth::U1024 => 2,
        }
    }

    /// Maximum number of hex digits in a magnitude
    pub fn max_hex_digits(&self) -> usize {
        match self {
            BigUIntWidth::U64 => 16,
            BigUIntWidth::U1024 => 256,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BigUIntWidth::U64 => "u64",
            BigUIntWidth::U1024 => "u1024",
        }
    }
}

/// Output format for decoded values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BigNumberFormat {
    #[default]
    Hex,
    Dec,
}

fn inverted_hex(hex: &str) -> String {
    hex.chars()
        .map(|c| match c.to_digit(16) {
            Some(d) => std::char::from_digit(d ^ 0xf, 16).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// Parses a caller-supplied number: JSON integer, decimal string or
/// `0x`-prefixed hex string, optionally negative.
pub fn parse_big_int(value: &Value) -> FilterResult<BigInt> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(BigInt::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(BigInt::from(u))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e18 => Ok(BigInt::from(f as i64)),
                    _ => Err(FilterError::invalid_value(n.to_string(), "expected an integer")),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let (neg, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, trimmed),
            };
            let magnitude = match digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
            {
                Some(hex) => BigInt::parse_bytes(hex.as_bytes(), 16),
                None => BigInt::parse_bytes(digits.as_bytes(), 10),
            }
            .ok_or_else(|| FilterError::invalid_value(s.clone(), "expected an integer"))?;
            Ok(if neg { -magnitude } else { magnitude })
        }
        other => Err(FilterError::invalid_value(
            other.to_string(),
            "expected an integer",
        )),
    }
}

/// Encodes an integer in the sortable stored form
pub fn encode_big_int(width: BigUIntWidth, value: &BigInt) -> FilterResult<String> {
    let neg = value.sign() == Sign::Minus;
    let hex = value.abs().to_str_radix(16);
    if hex.len() > width.max_hex_digits() {
        return Err(FilterError::invalid_value(
            value.to_string(),
            format!("does not fit into {}", width.as_str()),
        ));
    }
    let len = format!("{:x}", hex.len() - 1);
    let prefix = format!("{:0>width$}", len, width = width.prefix_len());
    let encoded = format!("{}{}", prefix, hex);
    Ok(if neg {
        format!("-{}", inverted_hex(&encoded))
    } else {
        encoded
    })
}

/// Converts a filter operand into the stored encoding (null passes through)
pub fn convert_big_uint(width: BigUIntWidth, value: &Value) -> FilterResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let parsed = parse_big_int(value)?;
    Ok(Value::String(encode_big_int(width, &parsed)?))
}

/// Decodes a stored value into an integer
pub fn decode_big_int(width: BigUIntWidth, stored: &Value) -> FilterResult<BigInt> {
    let s = match stored {
        Value::String(s) => s.trim(),
        Value::Number(_) => return parse_big_int(stored),
        other => {
            return Err(FilterError::invalid_value(
                other.to_string(),
                "expected an encoded integer",
            ))
        }
    };
    let prefix_len = width.prefix_len();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let hex = body
        .get(prefix_len..)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FilterError::invalid_value(s, "truncated encoded integer"))?;
    let hex = if neg { inverted_hex(hex) } else { hex.to_string() };
    let magnitude = BigInt::parse_bytes(hex.as_bytes(), 16)
        .ok_or_else(|| FilterError::invalid_value(s, "malformed encoded integer"))?;
    Ok(if neg { -magnitude } else { magnitude })
}

/// Decodes a stored value for display in the requested format
pub fn resolve_big_uint(
    width: BigUIntWidth,
    stored: &Value,
    format: BigNumberFormat,
) -> FilterResult<Value> {
    if stored.is_null() {
        return Ok(Value::Null);
    }
    let value = decode_big_int(width, stored)?;
    Ok(Value::String(format_big_int(&value, format)))
}

/// Formats an integer as decimal or `0x` hex, keeping the sign
pub fn format_big_int(value: &BigInt, format: BigNumberFormat) -> String {
    match format {
        BigNumberFormat::Dec => value.to_string(),
        BigNumberFormat::Hex => {
            let sign = if value.is_negative() && !value.is_zero() { "-" } else { "" };
            format!("{}0x{}", sign, value.abs().to_str_radix(16))
        }
    }
}
