//! Numeric coercion and formatting for answer values.
//!
//! Answers arrive from the backend loosely typed, so scale values may be
//! numbers or numeric strings. These helpers give them one consistent
//! numeric reading and one consistent textual rendering.

use serde_json::Value;

/// Largest magnitude that still round-trips through an `i64` without loss.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Coerce a string to a number.
///
/// Surrounding whitespace is ignored and a blank string reads as zero.
/// `0x`, `0o` and `0b` prefixes are accepted for unsigned integers.
/// Returns `None` for anything that is not a finite number.
pub fn coerce_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => 16,
        Some("0o") | Some("0O") => 8,
        Some("0b") | Some("0B") => 2,
        _ => 10,
    };

    if radix != 10 {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
    }

    // f64::from_str also accepts "inf" and "nan", which are not numbers here
    let plain = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !plain {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a number the way the dashboard shows it: whole numbers without a
/// fractional part, everything else in shortest round-trip form.
///
/// Magnitudes from 1e21 up and below 1e-6 use exponent notation with an
/// explicit sign on positive exponents ("1e+21", "1.5e-7").
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // covers negative zero
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }

    format!("{}", value)
}

/// Format with exactly two decimals.
///
/// Exact binary ties at the third decimal (x.125, x.375, x.625, x.875)
/// round away from zero, so 4.125 renders as "4.13".
pub fn to_fixed_2(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let magnitude = value.abs();
    let eighths = magnitude * 8.0;

    if magnitude < 1e15 && eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        // an odd number of eighths is 12.5 cents each; the tie rounds up
        let cents = ((eighths as u64) * 25 + 1) / 2;
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}{}.{:02}", sign, cents / 100, cents % 100);
    }

    format!("{:.2}", value)
}

/// Convert to a JSON value, using an integer when the number is whole.
pub fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Serde helper for optional numbers that should stay integral when whole.
pub fn serialize_optional_number<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::Serialize;

    match value {
        Some(v) => json_number(*v).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_plain_numbers() {
        assert_eq!(coerce_str("3"), Some(3.0));
        assert_eq!(coerce_str(" 4.5 "), Some(4.5));
        assert_eq!(coerce_str("-2"), Some(-2.0));
        assert_eq!(coerce_str("+.5"), Some(0.5));
        assert_eq!(coerce_str("1e2"), Some(100.0));
    }

    #[test]
    fn test_coerce_blank_is_zero() {
        assert_eq!(coerce_str("   "), Some(0.0));
    }

    #[test]
    fn test_coerce_prefixed_integers() {
        assert_eq!(coerce_str("0x1F"), Some(31.0));
        assert_eq!(coerce_str("0b101"), Some(5.0));
        assert_eq!(coerce_str("0o17"), Some(15.0));
        assert_eq!(coerce_str("0x"), None);
        assert_eq!(coerce_str("0xZZ"), None);
    }

    #[test]
    fn test_coerce_rejects_words() {
        assert_eq!(coerce_str("x"), None);
        assert_eq!(coerce_str("inf"), None);
        assert_eq!(coerce_str("NaN"), None);
        assert_eq!(coerce_str("Infinity"), None);
        assert_eq!(coerce_str("1,5"), None);
        assert_eq!(coerce_str("."), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(3.5), "3.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_format_number_exponent_range() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.23e22), "1.23e+22");
        assert_eq!(format_number(-1e21), "-1e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_to_fixed_2() {
        assert_eq!(to_fixed_2(4.0), "4.00");
        assert_eq!(to_fixed_2(10.0 / 3.0), "3.33");
        assert_eq!(to_fixed_2(2.0 / 3.0), "0.67");
        assert_eq!(to_fixed_2(0.0), "0.00");
        assert_eq!(to_fixed_2(-0.0), "0.00");
    }

    #[test]
    fn test_to_fixed_2_rounds_ties_away_from_zero() {
        assert_eq!(to_fixed_2(4.125), "4.13");
        assert_eq!(to_fixed_2(0.375), "0.38");
        assert_eq!(to_fixed_2(-1.625), "-1.63");
        // 1.005 is not an exact tie in binary and rounds down
        assert_eq!(to_fixed_2(1.005), "1.00");
    }

    #[test]
    fn test_to_fixed_2_large_ties() {
        // 2^49 + 0.125
        assert_eq!(to_fixed_2(562_949_953_421_312.125), "562949953421312.13");
        assert_eq!(to_fixed_2(-562_949_953_421_312.375), "-562949953421312.38");
    }

    #[test]
    fn test_json_number() {
        assert_eq!(json_number(3.0), serde_json::json!(3));
        assert_eq!(json_number(2.5), serde_json::json!(2.5));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
