//! Property-based tests using QuickCheck

use physcalc_engine::units::Quantity;
use quickcheck::{QuickCheck, TestResult};

mod test_support;

const UNITS: &[&str] = &["m", "Kg", "s", "km", "mg", "J", "W", "°C", "m/s", "Kg*m/s^2", "m^3"];

/// Pairs of convertible units.
const CONVERSIONS: &[(&str, &str)] = &[
    ("km", "m"),
    ("h", "s"),
    ("°C", "°F"),
    ("°F", "K"),
    ("L", "m^3"),
    ("eV", "J"),
    ("mi", "ft"),
    ("km/h", "m/s"),
    ("bar", "atm"),
];

fn usable(value: f64) -> bool {
    value.is_finite() && value.abs() < 1e100
}

fn pick<T>(items: &[T], index: usize) -> &T {
    &items[index % items.len()]
}

/// Property: printing a quantity and parsing the text gives it back.
fn format_then_parse_is_identity(value: f64, unit_index: usize) -> TestResult {
    if !usable(value) {
        return TestResult::discard();
    }
    let text = format!("{value} {}", pick(UNITS, unit_index));
    let Ok(first) = test_support::eval(&text) else {
        return TestResult::error(format!("'{text}' did not parse"));
    };
    let printed = first.to_string();
    match test_support::eval(&printed) {
        Ok(second) => TestResult::from_bool(second == first),
        Err(e) => TestResult::error(format!("'{printed}' did not parse: {e}")),
    }
}

#[test]
fn prop_format_parse_idempotent() {
    QuickCheck::new()
        .tests(300)
        .quickcheck(format_then_parse_is_identity as fn(f64, usize) -> TestResult);
}

/// Property: converting to another unit and back returns the original value.
fn conversion_round_trip(value: f64, pair_index: usize) -> TestResult {
    if !usable(value) {
        return TestResult::discard();
    }
    let (from, to) = pick(CONVERSIONS, pair_index);
    let there = match test_support::eval(&format!("{value} {from} [{to}]")) {
        Ok(q) => q,
        Err(e) => return TestResult::error(e.to_string()),
    };
    let back = match test_support::eval(&format!("{there} [{from}]")) {
        Ok(q) => q,
        Err(e) => return TestResult::error(e.to_string()),
    };
    let tolerance = 1e-9 * value.abs().max(1.0);
    TestResult::from_bool((back.value() - value).abs() <= tolerance)
}

#[test]
fn prop_conversion_round_trip() {
    QuickCheck::new()
        .tests(300)
        .quickcheck(conversion_round_trip as fn(f64, usize) -> TestResult);
}

/// Property: addition of same-unit quantities is commutative.
/// Using manual test cases; the values cover both signs and a wide range.
#[test]
fn prop_addition_commutative() {
    let cases = [(0.0, 0.0), (1.5, 2.25), (-3.0, 7.0), (1e6, -2e-3), (-1e-9, -4e9)];
    for (a, b) in cases {
        let left = test_support::eval(&format!("{a} m + {b} m")).unwrap();
        let right = test_support::eval(&format!("{b} m + {a} m")).unwrap();
        assert_eq!(left.value(), right.value(), "{a} m + {b} m");
    }
}

/// Property: any value compares equal to itself converted to another unit.
#[test]
fn prop_converted_values_compare_equal() {
    for (from, to) in CONVERSIONS {
        let original = test_support::eval(&format!("12.5 {from}")).unwrap();
        let converted = test_support::eval(&format!("12.5 {from} [{to}]")).unwrap();
        let same: Quantity = test_support::eval(&format!("12.5 {from} == {converted}")).unwrap();
        assert_eq!(same.value(), 1.0, "{original} vs {converted}");
    }
}
