//! Measurement parsing
//!
//! Form values arrive as free text such as "70", "70 kg", "98%" or "120/80".

/// Parse a number with an optional trailing unit ("98.6", "72 bpm", "95%").
///
/// Returns `None` for empty text, text without a leading number, or a unit
/// part that itself contains digits ("12abc3").
pub fn parse_measurement(text: &str) -> Option<f64> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    let (number, unit) = text.split_at(end);
    if unit.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a "first/second" pair such as a blood pressure reading.
///
/// Both halves go through [`parse_measurement`], so "120/80 mmHg" is accepted.
pub fn parse_pair(text: &str) -> Option<(f64, f64)> {
    let (first, second) = text.trim().split_once('/')?;
    Some((parse_measurement(first)?, parse_measurement(second)?))
}

/// Parse a "lo-hi" range, ignoring a trailing unit on either bound
pub fn parse_range(text: &str) -> Option<(f64, f64)> {
    let text = text.trim();
    // skip index 0 so a leading minus is not taken as the separator
    let split = text.char_indices().skip(1).find(|&(_, c)| c == '-')?.0;
    let (lo, hi) = (&text[..split], &text[split + 1..]);
    Some((parse_measurement(lo)?, parse_measurement(hi)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement("98.6"), Some(98.6));
        assert_eq!(parse_measurement(" 72 bpm "), Some(72.0));
        assert_eq!(parse_measurement("95%"), Some(95.0));
        assert_eq!(parse_measurement("101°F"), Some(101.0));
        assert_eq!(parse_measurement("-3"), Some(-3.0));
    }

    #[test]
    fn test_parse_measurement_rejects_garbage() {
        assert_eq!(parse_measurement(""), None);
        assert_eq!(parse_measurement("abc"), None);
        assert_eq!(parse_measurement("12abc3"), None);
        assert_eq!(parse_measurement("1.2.3"), None);
        assert_eq!(parse_measurement("120/80"), None);
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("120/80"), Some((120.0, 80.0)));
        assert_eq!(parse_pair("150 / 95 mmHg"), Some((150.0, 95.0)));
        assert_eq!(parse_pair("120"), None);
        assert_eq!(parse_pair("120/"), None);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("60-100"), Some((60.0, 100.0)));
        assert_eq!(parse_range("94-100%"), Some((94.0, 100.0)));
        assert_eq!(parse_range("18.5-24.9"), Some((18.5, 24.9)));
        assert_eq!(parse_range("-"), None);
        assert_eq!(parse_range("100"), None);
    }
}
