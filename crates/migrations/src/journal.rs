use chrono::{DateTime, Duration, Utc};
use model::{FieldChange, JournalOperation, JournalRow, OperationKind, Value, ValidityPeriod};
use std::collections::BTreeMap;

/// The synthetic bump applied on a timestamp collision (§4.6.4 rule 6).
const COLLISION_BUMP: Duration = Duration::microseconds(1);

/// An operation as produced from a single Jira changelog entry or comment,
/// before sorting, filtering, or snapshot assignment. `unmapped_notes` is
/// the rescue text from rule 2 — attached eagerly here since whether it's
/// needed depends only on this operation's own field changes, not on its
/// position in the sequence.
#[derive(Debug, Clone)]
pub struct RawOperation {
    pub kind: OperationKind,
    pub user_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
    pub field_changes: BTreeMap<String, FieldChange>,
    pub unmapped_notes: Option<String>,
}

impl RawOperation {
    fn into_operation(self) -> JournalOperation {
        let notes = if self.notes.trim().is_empty() && self.field_changes.is_empty() {
            self.unmapped_notes.unwrap_or(self.notes)
        } else {
            self.notes
        };
        JournalOperation {
            kind: self.kind,
            user_id: self.user_id,
            timestamp: self.timestamp,
            notes,
            field_changes: self.field_changes,
            state_snapshot: BTreeMap::new(),
            cf_state_snapshot: BTreeMap::new(),
        }
    }
}

/// The reconstructed history for one work package (§4.6.3 Phase 2, §4.6.4).
/// `v1_state_snapshot`/`v1_cf_state_snapshot` replace the skeleton's
/// auto-created first journal in place (rule 1); `v1_end` is the close of
/// v1's validity period (`None` when no later operation ever superseded it,
/// i.e. `appended` is empty and v1 stays open-ended). `appended` are
/// versions 2..N ready for bulk insertion.
#[derive(Debug, Clone)]
pub struct ReconstructedJournals {
    pub v1_state_snapshot: BTreeMap<String, Value>,
    pub v1_cf_state_snapshot: BTreeMap<String, Value>,
    pub v1_end: Option<DateTime<Utc>>,
    pub appended: Vec<JournalRow>,
}

/// Custom-field changes are carried under this key prefix in
/// `FieldChange::field`, mirroring the `custom_field:{name}` convention the
/// sanitizer already uses for provenance tags.
const CUSTOM_FIELD_PREFIX: &str = "custom_field:";

/// Runs the full algorithm in §4.6.4: sort, rescue-then-filter empty
/// operations, progressively build state snapshots, assign non-overlapping
/// validity periods bumping through timestamp collisions, dedupe as a
/// safety net, then resolve attribution and version numbers.
pub fn reconstruct_journals(
    creation_state: BTreeMap<String, Value>,
    creation_cf_state: BTreeMap<String, Value>,
    raw_operations: Vec<RawOperation>,
    wp_author_id: Option<i64>,
    system_deleted_user_id: i64,
) -> ReconstructedJournals {
    // rule 2: rescue unmapped-field notes before the emptiness check below,
    // independent of ordering.
    let mut operations: Vec<JournalOperation> =
        raw_operations.into_iter().map(RawOperation::into_operation).collect();

    // rule 3: producer sorts by timestamp before assigning snapshots.
    operations.sort_by_key(|op| op.timestamp);

    // rule 4: drop effectively-empty operations only after the rescue above
    // has had a chance to populate notes.
    operations.retain(|op| !op.is_effectively_empty());

    // rule 2 (progressive state building): start from the creation state
    // and apply each surviving operation's diff in timestamp order.
    let mut running_state = creation_state.clone();
    let mut running_cf = creation_cf_state.clone();
    let mut snapshotted = Vec::with_capacity(operations.len());
    for mut op in operations {
        for change in op.field_changes.values() {
            let Some(to) = &change.to else { continue };
            if let Some(cf_name) = change.field.strip_prefix(CUSTOM_FIELD_PREFIX) {
                running_cf.insert(cf_name.to_string(), to.clone());
            } else {
                running_state.insert(change.field.clone(), to.clone());
            }
        }
        op.state_snapshot = running_state.clone();
        op.cf_state_snapshot = running_cf.clone();
        snapshotted.push(op);
    }

    // rule 6: assign non-overlapping, strictly increasing validity periods.
    let mut last_end: Option<DateTime<Utc>> = None;
    let mut begins = Vec::with_capacity(snapshotted.len());
    for op in &snapshotted {
        let mut begin = op.timestamp;
        if let Some(end) = last_end
            && begin <= end
        {
            begin = end + COLLISION_BUMP;
        }
        last_end = Some(begin);
        begins.push(begin);
    }

    let mut rows = Vec::with_capacity(snapshotted.len());
    for (i, op) in snapshotted.iter().enumerate() {
        let begin = begins[i];
        let end = begins.get(i + 1).copied();
        let validity_period = match end {
            Some(end) => ValidityPeriod::closed(begin, end),
            None => ValidityPeriod::open_ended(begin),
        };

        // rule 5: attribution fallback chain. Never attribute to a user
        // with no real involvement in the operation.
        let author_id = match op.user_id {
            Some(id) if id != 0 => id,
            _ => wp_author_id.unwrap_or(system_deleted_user_id),
        };

        rows.push(JournalRow {
            version: 0, // assigned densely below, after the dedup pass
            author_id,
            notes: op.notes.clone(),
            validity_period,
            state_snapshot: op.state_snapshot.clone(),
            cf_state_snapshot: op.cf_state_snapshot.clone(),
        });
    }

    // rule 7: dedup safety net. `begins` is strictly increasing by
    // construction, so this only ever fires if a future change to the
    // bump logic regresses that invariant.
    rows.dedup_by(|a, b| a.validity_period == b.validity_period);

    for (i, row) in rows.iter_mut().enumerate() {
        row.version = (i + 2) as u32; // v1 is the skeleton's existing journal
    }

    ReconstructedJournals {
        v1_state_snapshot: creation_state,
        v1_cf_state_snapshot: creation_cf_state,
        v1_end: begins.first().copied(),
        appended: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn comment(at: DateTime<Utc>, user: Option<i64>, notes: &str) -> RawOperation {
        RawOperation {
            kind: OperationKind::Comment,
            user_id: user,
            timestamp: at,
            notes: notes.to_string(),
            field_changes: BTreeMap::new(),
            unmapped_notes: None,
        }
    }

    fn change(at: DateTime<Utc>, user: Option<i64>, field: &str, to: Value) -> RawOperation {
        let mut field_changes = BTreeMap::new();
        field_changes.insert(
            field.to_string(),
            FieldChange {
                field: field.to_string(),
                from: None,
                to: Some(to),
            },
        );
        RawOperation {
            kind: OperationKind::Change,
            user_id: user,
            timestamp: at,
            notes: String::new(),
            field_changes,
            unmapped_notes: None,
        }
    }

    #[test]
    fn journals_are_pairwise_non_overlapping_and_exactly_one_is_open_ended() {
        let ops = vec![
            change(ts(0), Some(1), "status_id", Value::Int(1)),
            change(ts(10), Some(1), "status_id", Value::Int(2)),
            change(ts(20), Some(1), "status_id", Value::Int(3)),
        ];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        let rows = &result.appended;
        assert_eq!(rows.len(), 3);
        for pair in rows.windows(2) {
            assert_eq!(pair[0].validity_period.end, Some(pair[1].validity_period.begin));
        }
        let open_ended: Vec<_> = rows.iter().filter(|r| r.validity_period.is_open_ended()).collect();
        assert_eq!(open_ended.len(), 1);
        assert_eq!(open_ended[0].version, rows.iter().map(|r| r.version).max().unwrap());
    }

    #[test]
    fn every_journal_has_a_non_null_author() {
        let ops = vec![comment(ts(5), None, "no user here")];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(42), 0);
        assert_eq!(result.appended[0].author_id, 42);
    }

    #[test]
    fn zero_user_id_falls_back_to_work_package_author_not_system_user() {
        let ops = vec![comment(ts(5), Some(0), "anonymous edit")];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(42), 999);
        assert_eq!(result.appended[0].author_id, 42);
    }

    #[test]
    fn missing_author_falls_back_to_system_deleted_user() {
        let ops = vec![comment(ts(5), None, "orphaned")];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, None, 999);
        assert_eq!(result.appended[0].author_id, 999);
    }

    #[test]
    fn colliding_timestamps_are_bumped_by_at_least_one_microsecond() {
        let same = ts(100);
        let ops = vec![
            change(same, Some(1), "status_id", Value::Int(1)),
            change(same, Some(1), "status_id", Value::Int(2)),
        ];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        let rows = &result.appended;
        assert_eq!(rows.len(), 2);
        let gap = rows[1].validity_period.begin - rows[0].validity_period.begin;
        assert!(gap >= COLLISION_BUMP);
    }

    #[test]
    fn unmapped_field_changes_are_preserved_as_a_note_instead_of_dropped() {
        let ops = vec![RawOperation {
            kind: OperationKind::Change,
            user_id: Some(1),
            timestamp: ts(1),
            notes: String::new(),
            field_changes: BTreeMap::new(),
            unmapped_notes: Some("Jira: labels changed from '' to 'backend, urgent'".to_string()),
        }];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        assert_eq!(result.appended.len(), 1);
        assert_eq!(result.appended[0].notes, "Jira: labels changed from '' to 'backend, urgent'");
    }

    #[test]
    fn truly_empty_operations_are_dropped_not_retracted() {
        let ops = vec![RawOperation {
            kind: OperationKind::Change,
            user_id: Some(1),
            timestamp: ts(1),
            notes: String::new(),
            field_changes: BTreeMap::new(),
            unmapped_notes: None,
        }];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        assert!(result.appended.is_empty());
    }

    #[test]
    fn snapshot_alignment_holds_even_when_input_order_is_not_timestamp_order() {
        let ops = vec![
            change(ts(20), Some(1), "status_id", Value::Int(3)),
            change(ts(0), Some(1), "status_id", Value::Int(1)),
            change(ts(10), Some(1), "status_id", Value::Int(2)),
        ];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        let rows = &result.appended;
        assert_eq!(rows[0].state_snapshot.get("status_id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].state_snapshot.get("status_id"), Some(&Value::Int(2)));
        assert_eq!(rows[2].state_snapshot.get("status_id"), Some(&Value::Int(3)));
    }

    #[test]
    fn custom_field_changes_land_in_the_cf_snapshot_not_the_state_snapshot() {
        let ops = vec![change(ts(1), Some(1), "custom_field:Resolution", Value::String("Fixed".into()))];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        assert_eq!(
            result.appended[0].cf_state_snapshot.get("Resolution"),
            Some(&Value::String("Fixed".into()))
        );
        assert!(!result.appended[0].state_snapshot.contains_key("custom_field:Resolution"));
    }

    #[test]
    fn v1_end_closes_at_the_first_appended_journals_begin() {
        let ops = vec![change(ts(10), Some(1), "status_id", Value::Int(2))];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        assert_eq!(result.v1_end, Some(result.appended[0].validity_period.begin));
    }

    #[test]
    fn v1_end_is_open_ended_when_nothing_ever_superseded_it() {
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), Vec::new(), Some(1), 0);
        assert!(result.appended.is_empty());
        assert_eq!(result.v1_end, None);
    }

    #[test]
    fn versions_start_at_two_since_v1_is_the_skeletons_existing_journal() {
        let ops = vec![comment(ts(1), Some(1), "a"), comment(ts(2), Some(1), "b")];
        let result = reconstruct_journals(BTreeMap::new(), BTreeMap::new(), ops, Some(1), 0);
        assert_eq!(result.appended[0].version, 2);
        assert_eq!(result.appended[1].version, 3);
    }
}
