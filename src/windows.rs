// 📅 Temporal Window Engine - Ranked latest / prior-period selection
// Ranks a single entity's records by period key to pick "latest" and
// "prior period" rows for trend computation. Prior-period lookup is an
// exact key match only, never a fuzzy nearest-period fallback.

use crate::model::{field_number, FieldMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

// ============================================================================
// PERIOD KEY
// ============================================================================

/// A reporting period: year plus quarter, totally ordered (year, quarter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PeriodKey {
    pub year: i32,
    pub quarter: u8,
}

impl PeriodKey {
    /// Quarter must be 1..=4.
    pub fn new(year: i32, quarter: u8) -> Option<PeriodKey> {
        if (1..=4).contains(&quarter) {
            Some(PeriodKey { year, quarter })
        } else {
            None
        }
    }

    /// Same quarter, one year back (year-over-year comparisons).
    pub fn year_earlier(&self) -> PeriodKey {
        PeriodKey {
            year: self.year - 1,
            quarter: self.quarter,
        }
    }

    /// The immediately preceding quarter (sequential comparisons).
    pub fn previous_quarter(&self) -> PeriodKey {
        if self.quarter == 1 {
            PeriodKey {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            PeriodKey {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }

    /// Build a period key from numeric year/quarter fields on a record.
    /// Null, missing, or out-of-range values yield None.
    pub fn from_fields(fields: &FieldMap, year_field: &str, quarter_field: &str) -> Option<PeriodKey> {
        let year = field_number(fields, year_field)?;
        let quarter = field_number(fields, quarter_field)?;
        if year.fract() != 0.0 || quarter.fract() != 0.0 {
            return None;
        }
        PeriodKey::new(year as i32, quarter as u8)
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

// ============================================================================
// WINDOW SELECTION
// ============================================================================

/// Pick the record with the maximum order key per entity.
///
/// Ties on the order key are broken by the LAST record encountered in input
/// order, matching the stable behavior downstream models depend on.
pub fn latest_per_entity<'a, R, K, O>(
    records: &'a [R],
    entity_key: impl Fn(&R) -> K,
    order_key: impl Fn(&R) -> O,
) -> HashMap<K, &'a R>
where
    K: Eq + Hash,
    O: Ord,
{
    let mut latest: HashMap<K, (O, &'a R)> = HashMap::new();

    for record in records {
        let key = entity_key(record);
        let order = order_key(record);
        match latest.get(&key) {
            // Strictly smaller loses; equal replaces (last one wins)
            Some((best, _)) if order < *best => {}
            _ => {
                latest.insert(key, (order, record));
            }
        }
    }

    latest.into_iter().map(|(k, (_, r))| (k, r)).collect()
}

/// Find one entity's record for the computed prior period.
///
/// The offset function maps the current period to the prior one (e.g.
/// year − 1, same quarter); only an exact match on that key counts.
pub fn prior_period<'a, R, K, P>(
    records: &'a [R],
    entity: &K,
    current: P,
    entity_key: impl Fn(&R) -> K,
    period_key: impl Fn(&R) -> Option<P>,
    offset: impl Fn(&P) -> P,
) -> Option<&'a R>
where
    K: PartialEq,
    P: PartialEq,
{
    let target = offset(&current);
    records
        .iter()
        .find(|r| entity_key(r) == *entity && period_key(r).as_ref() == Some(&target))
}

/// Period-over-period growth in percent: (current − prior) / prior × 100.
///
/// Defined only when the prior value is present and strictly positive;
/// otherwise the metric is absent (not zero, not an error).
pub fn growth_rate(current: f64, prior: Option<f64>) -> Option<f64> {
    match prior {
        Some(p) if p > 0.0 => Some((current - p) / p * 100.0),
        _ => None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        entity: &'static str,
        period: PeriodKey,
        nav: f64,
    }

    fn row(entity: &'static str, year: i32, quarter: u8, nav: f64) -> Row {
        Row {
            entity,
            period: PeriodKey::new(year, quarter).unwrap(),
            nav,
        }
    }

    #[test]
    fn test_period_key_ordering() {
        let q4_2023 = PeriodKey::new(2023, 4).unwrap();
        let q1_2024 = PeriodKey::new(2024, 1).unwrap();
        let q2_2024 = PeriodKey::new(2024, 2).unwrap();

        assert!(q4_2023 < q1_2024);
        assert!(q1_2024 < q2_2024);
    }

    #[test]
    fn test_period_key_offsets() {
        let q1_2024 = PeriodKey::new(2024, 1).unwrap();

        assert_eq!(q1_2024.year_earlier(), PeriodKey::new(2023, 1).unwrap());
        assert_eq!(q1_2024.previous_quarter(), PeriodKey::new(2023, 4).unwrap());
        assert_eq!(
            PeriodKey::new(2024, 3).unwrap().previous_quarter(),
            PeriodKey::new(2024, 2).unwrap()
        );
    }

    #[test]
    fn test_invalid_quarter_rejected() {
        assert!(PeriodKey::new(2024, 0).is_none());
        assert!(PeriodKey::new(2024, 5).is_none());
    }

    #[test]
    fn test_latest_per_entity() {
        let rows = vec![
            row("FUND-A", 2023, 4, 100.0),
            row("FUND-A", 2024, 2, 130.0),
            row("FUND-B", 2024, 1, 50.0),
            row("FUND-A", 2024, 1, 120.0),
        ];

        let latest = latest_per_entity(&rows, |r| r.entity, |r| r.period);

        assert_eq!(latest[&"FUND-A"].nav, 130.0);
        assert_eq!(latest[&"FUND-B"].nav, 50.0);
    }

    #[test]
    fn test_latest_tie_keeps_last_in_input_order() {
        let rows = vec![
            row("FUND-A", 2024, 2, 130.0),
            row("FUND-A", 2024, 2, 131.5),
        ];

        let latest = latest_per_entity(&rows, |r| r.entity, |r| r.period);

        assert_eq!(latest[&"FUND-A"].nav, 131.5);
    }

    #[test]
    fn test_prior_period_exact_match_only() {
        let rows = vec![
            row("FUND-A", 2023, 2, 100.0),
            row("FUND-A", 2023, 3, 105.0),
            row("FUND-A", 2024, 2, 130.0),
        ];
        let current = PeriodKey::new(2024, 2).unwrap();

        let prior = prior_period(
            &rows,
            &"FUND-A",
            current,
            |r| r.entity,
            |r| Some(r.period),
            PeriodKey::year_earlier,
        );
        assert_eq!(prior.map(|r| r.nav), Some(100.0));

        // 2022Q2 does not exist and 2023Q3 is no substitute
        let current_2023 = PeriodKey::new(2023, 2).unwrap();
        let none = prior_period(
            &rows,
            &"FUND-A",
            current_2023,
            |r| r.entity,
            |r| Some(r.period),
            PeriodKey::year_earlier,
        );
        assert!(none.is_none());
    }

    #[test]
    fn test_growth_rate() {
        assert_eq!(growth_rate(130.0, Some(100.0)), Some(30.0));
        assert_eq!(growth_rate(90.0, Some(100.0)), Some(-10.0));
    }

    #[test]
    fn test_growth_rate_edge_cases() {
        // Prior of zero or absent means the metric is absent, never a
        // division by zero or an infinity
        assert_eq!(growth_rate(130.0, Some(0.0)), None);
        assert_eq!(growth_rate(130.0, Some(-5.0)), None);
        assert_eq!(growth_rate(130.0, None), None);
    }
}
