//! Lenient numeric parsing for backend fields typed as free text.
//!
//! Pattern-master rows carry quantities and weights as whatever the operator
//! typed (`"2"`, `" 3.5kg"`, `""`). These helpers read the longest numeric
//! prefix and report `None` when there is none, so callers can apply their own
//! fallbacks.

use smart_erp_api_types::Numeric;

/// Parse the leading decimal integer of `text`, ignoring leading whitespace.
///
/// A fractional part terminates the integer (`"2.7"` reads as `2`).
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = split_sign(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse the leading decimal floating point literal of `text`.
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse().ok()
}

/// Cavity count of a part: the integer prefix of `Qty`, where zero, missing or
/// unreadable values count as a single cavity.
pub fn cavity(qty: Option<&Numeric>) -> i64 {
    qty.and_then(|value| parse_int_prefix(&value.to_text()))
        .filter(|value| *value != 0)
        .unwrap_or(1)
}

/// Unit weight of a part, defaulting to zero when missing or unreadable.
pub fn weight(weight: Option<&Numeric>) -> f64 {
    number(weight)
}

/// Generic non-NaN float reading with a zero fallback.
pub fn number(value: Option<&Numeric>) -> f64 {
    value
        .and_then(|value| match value {
            Numeric::Int(int) => Some(*int as f64),
            Numeric::Float(float) => Some(*float),
            Numeric::Text(text) => parse_float_prefix(text),
        })
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn split_sign(text: &str) -> (bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_prefix_stops_at_first_non_digit() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  7 pcs"), Some(7));
        assert_eq!(parse_int_prefix("2.9"), Some(2));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn float_prefix_reads_longest_literal() {
        assert_eq!(parse_float_prefix("3.5kg"), Some(3.5));
        assert_eq!(parse_float_prefix(" .25"), Some(0.25));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("1e3x"), Some(1000.0));
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("kg"), None);
    }

    #[test]
    fn cavity_falls_back_to_one() {
        assert_eq!(cavity(None), 1);
        assert_eq!(cavity(Some(&Numeric::Int(0))), 1);
        assert_eq!(cavity(Some(&Numeric::Text("n/a".into()))), 1);
        assert_eq!(cavity(Some(&Numeric::Text("4".into()))), 4);
        assert_eq!(cavity(Some(&Numeric::Float(2.7))), 2);
    }

    #[test]
    fn weight_falls_back_to_zero() {
        assert_eq!(weight(None), 0.0);
        assert_eq!(weight(Some(&Numeric::Text("".into()))), 0.0);
        assert_eq!(weight(Some(&Numeric::Text("12.5".into()))), 12.5);
        assert_eq!(weight(Some(&Numeric::Int(3))), 3.0);
    }
}
