use crate::core::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A half-open `[begin, end)` timestamp range attached to each journal row
/// (§3.1). `end = None` means open-ended (`+∞`); exactly one row per work
/// package may have `end = None`, and it must be the maximum version
/// (invariant 3c, §8 #4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    pub begin: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl ValidityPeriod {
    pub fn open_ended(begin: DateTime<Utc>) -> Self {
        Self { begin, end: None }
    }

    pub fn closed(begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            begin,
            end: Some(end),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Two half-open ranges overlap iff each begins before the other ends
    /// (an open end is treated as `+∞`).
    pub fn overlaps(&self, other: &ValidityPeriod) -> bool {
        let self_end = self.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let other_end = other.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.begin < other_end && other.begin < self_end
    }
}

/// The kind of historical event a [`JournalOperation`] represents (§4.6.4
/// rule 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Comment,
    Change,
}

/// A single mapped field transition captured by a changelog event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

/// One produced operation, before timestamp-sorting and validity-period
/// assignment (§3.1, §4.6.4). `field_changes` is keyed by mapped OpenProject
/// attribute name; `state_snapshot`/`cf_state_snapshot` are the full
/// work-package/custom-field state as of this operation, computed by
/// progressively applying diffs from the creation state (rule 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalOperation {
    pub kind: OperationKind,
    pub user_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
    pub field_changes: BTreeMap<String, FieldChange>,
    pub state_snapshot: BTreeMap<String, Value>,
    pub cf_state_snapshot: BTreeMap<String, Value>,
}

impl JournalOperation {
    /// An operation with no notes and no effective field changes is a
    /// candidate for the empty-operation filter (§4.6.4 rule 4) — but only
    /// *after* the unmapped-field rescue (rule 2) has had a chance to
    /// populate `notes`.
    pub fn is_effectively_empty(&self) -> bool {
        self.notes.trim().is_empty() && self.field_changes.is_empty()
    }
}

/// One finished journal row, ready for bulk insertion by the evaluator
/// (§3.1, §4.6.4). `version` is 1-based and contiguous within a work
/// package (invariant 3a); `author_id` is always non-null (invariant 3d).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRow {
    pub version: u32,
    pub author_id: i64,
    pub notes: String,
    pub validity_period: ValidityPeriod,
    pub state_snapshot: BTreeMap<String, Value>,
    pub cf_state_snapshot: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn half_open_adjacent_periods_do_not_overlap() {
        let a = ValidityPeriod::closed(ts(0), ts(10));
        let b = ValidityPeriod::closed(ts(10), ts(20));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlapping_periods_detected() {
        let a = ValidityPeriod::closed(ts(0), ts(10));
        let b = ValidityPeriod::closed(ts(5), ts(15));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn open_ended_period_overlaps_anything_after_its_begin() {
        let a = ValidityPeriod::open_ended(ts(100));
        let b = ValidityPeriod::closed(ts(200), ts(300));
        assert!(a.overlaps(&b));
    }
}
