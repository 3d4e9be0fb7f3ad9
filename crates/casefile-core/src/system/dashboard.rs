//! # Dashboard Aggregates
//!
//! Count tables over occurrences plus a coarse connection count over persons.
//!
//! | Table | Grouped by |
//! |-------|------------|
//! | `by_type` | `occurrenceType` |
//! | `by_severity` | `severity` |
//! | `by_status` | `status` |
//! | `by_unit` | `unit` |
//! | `by_responsible` | `responsible` |
//! | `by_month` | `YYYY-MM` prefix of `occurredAt` |
//!
//! Missing or blank group values are counted under [`UNSPECIFIED`].

use crate::{CasefileError, Occurrence, Record, RecordKind, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group label for occurrences without a value in the grouped field.
pub const UNSPECIFIED: &str = "unspecified";

/// Counts per group value. BTreeMap for deterministic ordering.
pub type CountTable = BTreeMap<String, usize>;

/// Inclusive date filter over `occurredAt` (compared as `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: String,
    to: String,
}

impl DateRange {
    /// Both ends are required and `from` must not be after `to`.
    pub fn new(from: &str, to: &str) -> Result<Self, CasefileError> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err(CasefileError::InvalidRecord(
                "both start and end dates are required".to_string(),
            ));
        }
        let (from, to) = (day(from), day(to));
        if from > to {
            return Err(CasefileError::InvalidRecord(format!(
                "start date {from} is after end date {to}"
            )));
        }
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn contains(&self, occurred_at: Option<&str>) -> bool {
        occurred_at
            .map(day)
            .is_some_and(|d| !d.is_empty() && self.from.as_str() <= d && d <= self.to.as_str())
    }
}

/// The `YYYY-MM-DD` part of a date or date-time.
fn day(s: &str) -> &str {
    s.get(..10).unwrap_or(s)
}

/// Dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAggregates {
    pub total_occurrences: usize,
    pub by_type: CountTable,
    pub by_severity: CountTable,
    pub by_status: CountTable,
    pub by_unit: CountTable,
    pub by_responsible: CountTable,
    pub by_month: CountTable,
    /// Occurrences with both coordinates set (map markers).
    pub geolocated: usize,
    pub total_persons: usize,
    /// Persons carrying a non-empty key: a coarse proxy for linkable people.
    pub connection_count: usize,
}

/// Compute aggregates over every loaded occurrence.
///
/// With no occurrences loaded the result is all zeros.
#[must_use]
pub fn compute(snapshot: &Snapshot) -> DashboardAggregates {
    aggregate(snapshot, None)
}

/// Compute aggregates over occurrences within `range`.
#[must_use]
pub fn compute_in_range(snapshot: &Snapshot, range: &DateRange) -> DashboardAggregates {
    aggregate(snapshot, Some(range))
}

fn aggregate(snapshot: &Snapshot, range: Option<&DateRange>) -> DashboardAggregates {
    if snapshot.records(RecordKind::Occurrence).is_empty() {
        return DashboardAggregates::default();
    }

    let occurrences: Vec<&Occurrence> = snapshot
        .records(RecordKind::Occurrence)
        .iter()
        .filter_map(Record::as_occurrence)
        .filter(|o| range.is_none_or(|r| r.contains(o.occurred_at.as_deref())))
        .collect();

    let persons = snapshot.records(RecordKind::Person);

    DashboardAggregates {
        total_occurrences: occurrences.len(),
        by_type: count_by(&occurrences, |o| o.occurrence_type.as_deref()),
        by_severity: count_by(&occurrences, |o| o.severity.as_deref()),
        by_status: count_by(&occurrences, |o| o.status.as_deref()),
        by_unit: count_by(&occurrences, |o| o.unit.as_deref()),
        by_responsible: count_by(&occurrences, |o| o.responsible.as_deref()),
        by_month: count_by(&occurrences, |o| {
            o.occurred_at.as_deref().and_then(|d| d.get(..7))
        }),
        geolocated: occurrences
            .iter()
            .filter(|o| o.latitude.is_some() && o.longitude.is_some())
            .count(),
        total_persons: persons.len(),
        connection_count: persons.iter().filter(|p| p.link_key().is_some()).count(),
    }
}

fn count_by<'a, F>(occurrences: &[&'a Occurrence], field: F) -> CountTable
where
    F: Fn(&'a Occurrence) -> Option<&'a str>,
{
    let mut table = CountTable::new();
    for &occurrence in occurrences {
        let group = field(occurrence)
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(UNSPECIFIED);
        *table.entry(group.to_string()).or_insert(0) += 1;
    }
    table
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn occurrence(id: u64, body: serde_json::Value) -> Record {
        let mut body = body;
        body["id"] = json!(id);
        Record::from_json(RecordKind::Occurrence, body).expect("parse")
    }

    fn person(id: u64, key: &str) -> Record {
        Record::from_json(
            RecordKind::Person,
            json!({"id": id, "key": key, "displayName": "P"}),
        )
        .expect("parse")
    }

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.push(occurrence(
            1,
            json!({"title": "Robbery", "occurrenceType": "robbery", "severity": "high",
                   "unit": "1st DP", "occurredAt": "2024-03-02", "latitude": -23.5, "longitude": -46.6}),
        ));
        snapshot.push(occurrence(
            2,
            json!({"title": "Theft", "occurrenceType": "theft", "severity": "high",
                   "unit": "1st DP", "occurredAt": "2024-04-10T08:00:00Z"}),
        ));
        snapshot.push(occurrence(
            3,
            json!({"title": "Fraud", "occurrenceType": "fraud", "severity": " ",
                   "occurredAt": "2024-04-20"}),
        ));
        snapshot.push(person(1, "111"));
        snapshot.push(person(2, " "));
        snapshot
    }

    #[test]
    fn zeroed_without_occurrences() {
        let mut snapshot = Snapshot::new();
        snapshot.push(person(1, "111"));
        assert_eq!(compute(&snapshot), DashboardAggregates::default());
    }

    #[test]
    fn groups_and_counts() {
        let aggregates = compute(&sample());
        assert_eq!(aggregates.total_occurrences, 3);
        assert_eq!(aggregates.by_severity.get("high"), Some(&2));
        assert_eq!(aggregates.by_severity.get(UNSPECIFIED), Some(&1));
        assert_eq!(aggregates.by_unit.get("1st DP"), Some(&2));
        assert_eq!(aggregates.by_responsible.get(UNSPECIFIED), Some(&3));
        assert_eq!(aggregates.by_month.get("2024-04"), Some(&2));
        assert_eq!(aggregates.geolocated, 1);
        assert_eq!(aggregates.total_persons, 2);
        assert_eq!(aggregates.connection_count, 1);
    }

    #[test]
    fn range_filters_by_day() {
        let range = DateRange::new("2024-04-01", "2024-04-10").expect("range");
        let aggregates = compute_in_range(&sample(), &range);
        assert_eq!(aggregates.total_occurrences, 1);
        assert_eq!(aggregates.by_type.get("theft"), Some(&1));
    }

    #[test]
    fn range_requires_both_ends() {
        assert!(DateRange::new("2024-01-01", "").is_err());
        assert!(DateRange::new(" ", "2024-01-01").is_err());
        assert!(DateRange::new("2024-02-01", "2024-01-01").is_err());
    }

    #[test]
    fn range_compares_days_not_timestamps() {
        let range = DateRange::new("2024-04-10T10:00:00Z", "2024-04-10").expect("same day");
        assert_eq!(range, DateRange::new("2024-04-10", "2024-04-10").expect("range"));
        assert!(DateRange::new("2024-04-11T00:00:00Z", "2024-04-10T23:59:59Z").is_err());
    }
}
