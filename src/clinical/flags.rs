//! Reference range flags
//!
//! Free-text checks behind the FLAG column of the vitals table. Values and
//! ranges are the strings printed on the report, so units ride along.

use serde::Serialize;

use super::measure::{parse_measurement, parse_pair, parse_range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    /// In range, no value, or no reference range
    Clear,
    OutOfRange,
    Invalid,
}

impl Flag {
    /// Marker printed in the table
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Clear => "",
            Flag::OutOfRange => "Out of range",
            Flag::Invalid => "Invalid input",
        }
    }
}

/// Compare a value against a range such as "60-100", "94-100%" or "90/60 - 140/90".
///
/// Bounds are inclusive. A pair range compares each half independently.
pub fn check_range(value: &str, range_spec: &str) -> Flag {
    let value = value.trim();
    let range_spec = range_spec.trim();
    if value.is_empty() || range_spec.is_empty() || range_spec == "-" {
        return Flag::Clear;
    }

    if range_spec.contains('/') {
        return check_pair_range(value, range_spec);
    }

    let Some(number) = parse_measurement(value) else {
        return Flag::Invalid;
    };
    let Some((lo, hi)) = parse_range(range_spec) else {
        return Flag::Invalid;
    };
    if (lo..=hi).contains(&number) {
        Flag::Clear
    } else {
        Flag::OutOfRange
    }
}

fn check_pair_range(value: &str, range_spec: &str) -> Flag {
    let bounds = range_spec
        .split_once('-')
        .and_then(|(lo, hi)| Some((parse_pair(lo)?, parse_pair(hi)?)));
    let (Some((first, second)), Some(((lo_first, lo_second), (hi_first, hi_second)))) =
        (parse_pair(value), bounds)
    else {
        return Flag::Invalid;
    };

    if (lo_first..=hi_first).contains(&first) && (lo_second..=hi_second).contains(&second) {
        Flag::Clear
    } else {
        Flag::OutOfRange
    }
}

/// Table marker for `value` against `range_spec`
pub fn flag_value(value: &str, range_spec: &str) -> &'static str {
    check_range(value, range_spec).as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_markers() {
        assert_eq!(flag_value("150/95", "90/60 - 140/90"), "Out of range");
        assert_eq!(flag_value("98%", "94-100%"), "");
        assert_eq!(flag_value("abc", "94-100%"), "Invalid input");
    }

    #[test]
    fn test_pair_range_bounds_are_inclusive() {
        assert_eq!(check_range("120/80", "90/60 - 140/90"), Flag::Clear);
        assert_eq!(check_range("140/90", "90/60 - 140/90"), Flag::Clear);
        assert_eq!(check_range("90/59", "90/60 - 140/90"), Flag::OutOfRange);
        assert_eq!(check_range("120", "90/60 - 140/90"), Flag::Invalid);
    }

    #[test]
    fn test_values_with_units() {
        assert_eq!(check_range("72 bpm", "60-100"), Flag::Clear);
        assert_eq!(check_range("101°F", "97.8-99.1"), Flag::OutOfRange);
        assert_eq!(check_range("32.0", "18.5-24.9"), Flag::OutOfRange);
        assert_eq!(check_range("18.5", "18.5-24.9"), Flag::Clear);
    }

    #[test]
    fn test_missing_value_or_range_is_clear() {
        assert_eq!(check_range("", "60-100"), Flag::Clear);
        assert_eq!(check_range("70 kg", "-"), Flag::Clear);
        assert_eq!(check_range("70 kg", ""), Flag::Clear);
    }
}
