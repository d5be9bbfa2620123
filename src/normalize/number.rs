// src/normalize/number.rs

use super::utils::trimmed;

/// Shape annotation found in the diameter/capacity columns. Carries no numeric meaning.
const SHAPE_ANNOTATION: &str = "elip";

/// Parse a measurement that may be written as a range, e.g. `"140-141"` or `"2,8-2,85"`.
///
/// Steps, in order:
/// 1) empty/whitespace → `None`
/// 2) drop the `"elip"` annotation (case-sensitive)
/// 3) drop spaces
/// 4) `,` → `.`
/// 5) a hyphen splits `A-B` at the first `-`; both sides must parse, result is the midpoint
/// 6) otherwise a plain float parse
///
/// Never fails: anything unparseable is `None`.
pub fn parse_numeric_with_range(text: Option<&str>) -> Option<f64> {
    let raw = trimmed(text)?;

    let cleaned = raw
        .replace(SHAPE_ANNOTATION, "")
        .replace(' ', "")
        .replace(',', ".");

    match cleaned.split_once('-') {
        Some((low, high)) => {
            let low = parse_finite(low)?;
            let high = parse_finite(high)?;
            finite((low + high) / 2.0)
        }
        None => parse_finite(&cleaned),
    }
}

/// Lighter variant used for cycle times: trim, drop spaces, `,` → `.`, plain parse.
/// No range handling and no annotation stripping.
pub fn parse_plain_number(text: Option<&str>) -> Option<f64> {
    let raw = trimmed(text)?;
    parse_finite(&raw.replace(' ', "").replace(',', "."))
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `str::parse::<f64>` also accepts "inf" and "NaN"; those are not measurements.
fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().and_then(finite)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn range_is_averaged() {
        assert_eq!(parse_numeric_with_range(Some("140-141")), Some(140.5));
        assert!(approx(parse_numeric_with_range(Some("2,8-2,85")), 2.825));
        assert_eq!(parse_numeric_with_range(Some(" 10 - 20 ")), Some(15.0));
    }

    #[test]
    fn annotation_and_spaces_are_dropped() {
        assert_eq!(parse_numeric_with_range(Some("elip 45")), Some(45.0));
        assert_eq!(parse_numeric_with_range(Some("1 250,5")), Some(1250.5));
        // case-sensitive: "Elip" stays and poisons the token
        assert_eq!(parse_numeric_with_range(Some("Elip 45")), None);
        assert_eq!(parse_numeric_with_range(Some("elip")), None);
    }

    #[test]
    fn empty_and_missing_are_none() {
        assert_eq!(parse_numeric_with_range(Some("")), None);
        assert_eq!(parse_numeric_with_range(Some("   ")), None);
        assert_eq!(parse_numeric_with_range(None), None);
    }

    #[test]
    fn dangling_hyphens_are_none() {
        assert_eq!(parse_numeric_with_range(Some("-5")), None);
        assert_eq!(parse_numeric_with_range(Some("5-")), None);
        assert_eq!(parse_numeric_with_range(Some("-")), None);
    }

    #[test]
    fn multiple_hyphens_null_the_field() {
        assert_eq!(parse_numeric_with_range(Some("1-2-3")), None);
        assert_eq!(parse_numeric_with_range(Some("1e-5")), None);
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_numeric_with_range(Some("abc")), None);
        assert_eq!(parse_numeric_with_range(Some("12mm")), None);
        assert_eq!(parse_numeric_with_range(Some("1-abc")), None);
        assert_eq!(parse_numeric_with_range(Some("inf")), None);
        assert_eq!(parse_numeric_with_range(Some("NaN")), None);
    }

    #[test]
    fn plain_number_keeps_hyphen_and_annotation() {
        assert_eq!(parse_plain_number(Some(" 42,5 ")), Some(42.5));
        assert_eq!(parse_plain_number(Some("-5")), Some(-5.0));
        assert_eq!(parse_plain_number(Some("40-41")), None);
        assert_eq!(parse_plain_number(Some("elip 45")), None);
        assert_eq!(parse_plain_number(Some("")), None);
        assert_eq!(parse_plain_number(None), None);
    }

    #[test]
    fn rounding_to_two_places() {
        assert_eq!(round_to(42.5 / 0.85, 2), 50.0);
        assert_eq!(round_to(10.0 / 3.0, 2), 3.33);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
    }
}
