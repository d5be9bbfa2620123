// src/normalize/mod.rs
pub mod number;
pub mod utils;

pub use number::{parse_numeric_with_range, parse_plain_number, round_to};

use serde::Serialize;
use utils::trimmed;

/// Fallback OEE ratio used to derive a planned cycle time from the measured one.
pub const DEFAULT_OEE_RATIO: f64 = 0.85;

/// Number of positional fields in one export row.
pub const RAW_FIELD_COUNT: usize = 8;

/// One staged export row, fields in file order. Absent and blank are both `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub col1: Option<String>,
    pub capacity: Option<String>,
    pub diameter: Option<String>,
    pub thickness: Option<String>,
    pub heat_treat_cycle_seconds: Option<String>,
    pub oee: Option<String>,
    pub notes: Option<String>,
    pub extra: Option<String>,
}

impl RawRecord {
    /// Build from positional fields. Missing trailing fields stay `None`, extra ones are ignored.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut slots: [Option<String>; RAW_FIELD_COUNT] = Default::default();
        for (slot, field) in slots.iter_mut().zip(fields) {
            *slot = field.map(Into::into);
        }
        let [col1, capacity, diameter, thickness, heat_treat_cycle_seconds, oee, notes, extra] =
            slots;
        Self {
            col1,
            capacity,
            diameter,
            thickness,
            heat_treat_cycle_seconds,
            oee,
            notes,
            extra,
        }
    }

    /// Fields in file order.
    pub fn fields(&self) -> [Option<&str>; RAW_FIELD_COUNT] {
        [
            self.col1.as_deref(),
            self.capacity.as_deref(),
            self.diameter.as_deref(),
            self.thickness.as_deref(),
            self.heat_treat_cycle_seconds.as_deref(),
            self.oee.as_deref(),
            self.notes.as_deref(),
            self.extra.as_deref(),
        ]
    }

    /// True when every field is missing or whitespace.
    pub fn is_blank(&self) -> bool {
        self.fields().iter().all(|f| trimmed(*f).is_none())
    }
}

/// Typed destination row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedRecord {
    pub workstation_id: i64,
    pub diameter_mm: Option<f64>,
    pub wall_thickness_mm: Option<f64>,
    pub volume_liters: Option<f64>,
    pub thread_spec: Option<String>,
    pub cycle_time_seconds: Option<f64>,
    pub planned_cycle_time_seconds: Option<f64>,
}

impl TypedRecord {
    /// Admission rule: at least one numeric field survived parsing.
    ///
    /// `planned_cycle_time_seconds` is set exactly when the OEE column parsed or the
    /// cycle time parsed, so this matches "any of diameter, thickness, volume, cycle, oee".
    pub fn has_numeric_content(&self) -> bool {
        [
            self.diameter_mm,
            self.wall_thickness_mm,
            self.volume_liters,
            self.cycle_time_seconds,
            self.planned_cycle_time_seconds,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Map one raw row to its typed form, or `None` if it carries no numeric information.
pub fn normalize(
    raw: &RawRecord,
    workstation_id: i64,
    default_oee_ratio: f64,
) -> Option<TypedRecord> {
    let cycle_time_seconds = parse_plain_number(raw.heat_treat_cycle_seconds.as_deref());

    let planned_cycle_time_seconds = parse_plain_number(raw.oee.as_deref()).or_else(|| {
        cycle_time_seconds
            .map(|cycle| round_to(cycle / default_oee_ratio, 2))
            .filter(|v| v.is_finite())
    });

    let record = TypedRecord {
        workstation_id,
        diameter_mm: parse_numeric_with_range(raw.diameter.as_deref()),
        wall_thickness_mm: parse_numeric_with_range(raw.thickness.as_deref()),
        volume_liters: parse_numeric_with_range(raw.capacity.as_deref()),
        thread_spec: trimmed(raw.notes.as_deref()).map(str::to_string),
        cycle_time_seconds,
        planned_cycle_time_seconds,
    };

    record.has_numeric_content().then_some(record)
}

/// Lazily normalize a sequence of rows, dropping the ones without numeric content.
/// Output order follows input order.
pub fn normalize_all<'a, I>(
    records: I,
    workstation_id: i64,
    default_oee_ratio: f64,
) -> impl Iterator<Item = TypedRecord> + 'a
where
    I: IntoIterator<Item = &'a RawRecord>,
    I::IntoIter: 'a,
{
    records
        .into_iter()
        .filter_map(move |raw| normalize(raw, workstation_id, default_oee_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fields: &[&str]) -> RawRecord {
        RawRecord::from_fields(fields.iter().map(|s| Some(*s)))
    }

    #[test]
    fn all_empty_is_rejected() {
        let r = raw(&["", "", "", "", "", "", "", ""]);
        assert_eq!(normalize(&r, 1, DEFAULT_OEE_RATIO), None);
        assert_eq!(normalize(&RawRecord::default(), 1, DEFAULT_OEE_RATIO), None);
    }

    #[test]
    fn notes_alone_is_rejected() {
        let r = raw(&["", "", "", "", "", "", "see supervisor", ""]);
        assert_eq!(normalize(&r, 1, DEFAULT_OEE_RATIO), None);
    }

    #[test]
    fn planned_falls_back_to_cycle_over_ratio() {
        let r = raw(&["", "", "", "", "42,5", "", "", ""]);
        let t = normalize(&r, 3, 0.85).expect("cycle time admits the row");
        assert_eq!(t.cycle_time_seconds, Some(42.5));
        assert_eq!(t.planned_cycle_time_seconds, Some(50.0));
    }

    #[test]
    fn oee_column_wins_over_fallback() {
        let r = raw(&["", "", "", "", "42,5", "39,5", "", ""]);
        let t = normalize(&r, 3, 0.85).expect("admitted");
        assert_eq!(t.planned_cycle_time_seconds, Some(39.5));
        assert_eq!(t.cycle_time_seconds, Some(42.5));
    }

    #[test]
    fn oee_alone_admits_the_row() {
        let r = raw(&["", "", "", "", "", "39,5", "", ""]);
        let t = normalize(&r, 3, 0.85).expect("admitted");
        assert_eq!(t.cycle_time_seconds, None);
        assert_eq!(t.planned_cycle_time_seconds, Some(39.5));
    }

    #[test]
    fn full_row_maps_every_field() {
        let r = raw(&["A1", "elip 45", "140-141", "2,8-2,85", "120", "", "  M30x2 ", "x"]);
        let t = normalize(&r, 7, 0.8).expect("admitted");
        assert_eq!(t.workstation_id, 7);
        assert_eq!(t.volume_liters, Some(45.0));
        assert_eq!(t.diameter_mm, Some(140.5));
        assert!((t.wall_thickness_mm.unwrap() - 2.825).abs() < 1e-9);
        assert_eq!(t.thread_spec.as_deref(), Some("M30x2"));
        assert_eq!(t.cycle_time_seconds, Some(120.0));
        assert_eq!(t.planned_cycle_time_seconds, Some(150.0));
    }

    #[test]
    fn unparseable_numbers_with_notes_are_rejected() {
        let r = raw(&["A1", "n/a", "-5", "1-2-3", "abc", "", "note", ""]);
        assert_eq!(normalize(&r, 1, DEFAULT_OEE_RATIO), None);
    }

    #[test]
    fn zero_ratio_does_not_produce_infinity() {
        let r = raw(&["", "", "", "", "10", "", "", ""]);
        let t = normalize(&r, 1, 0.0).expect("cycle time admits the row");
        assert_eq!(t.planned_cycle_time_seconds, None);
    }

    #[test]
    fn normalize_is_repeatable() {
        let r = raw(&["A1", "50", "140-141", "3", "42,5", "", "M30", ""]);
        let a = normalize(&r, 9, DEFAULT_OEE_RATIO);
        let b = normalize(&r, 9, DEFAULT_OEE_RATIO);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn ragged_rows_pad_with_none() {
        let r = RawRecord::from_fields(vec![Some("A1"), Some("50"), Some("140")]);
        assert_eq!(r.diameter.as_deref(), Some("140"));
        assert_eq!(r.thickness, None);
        assert_eq!(r.extra, None);

        let long = RawRecord::from_fields((0..12).map(|i| Some(i.to_string())));
        assert_eq!(long.extra.as_deref(), Some("7"));
    }

    #[test]
    fn normalize_all_keeps_order_and_filters() {
        let rows = vec![
            raw(&["a", "1", "", "", "", "", "", ""]),
            raw(&["b", "", "", "", "", "", "only notes", ""]),
            raw(&["c", "2", "", "", "", "", "", ""]),
        ];
        let out: Vec<_> = normalize_all(&rows, 1, DEFAULT_OEE_RATIO).collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].volume_liters, Some(1.0));
        assert_eq!(out[1].volume_liters, Some(2.0));
    }

    #[test]
    fn blank_detection() {
        assert!(raw(&[" ", "", "\t", "", "", "", "", ""]).is_blank());
        assert!(!raw(&["", "", "", "", "", "", "x", ""]).is_blank());
    }
}
