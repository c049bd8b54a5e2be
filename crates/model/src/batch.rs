use crate::core::identifiers::BatchIndex;
use crate::mapped_record::MappedRecord;

/// An ordered list of [`MappedRecord`]s scheduled for a single remote
/// execution (§3.1). Batch size is bounded per component (§4.7: ~100 for
/// API-only components, ~200 for Rails-console components) and batches are
/// dispatched in index order within a component (§5).
#[derive(Debug, Clone)]
pub struct Batch {
    pub index: BatchIndex,
    pub records: Vec<MappedRecord>,
}

impl Batch {
    pub fn new(index: BatchIndex, records: Vec<MappedRecord>) -> Self {
        Self { index, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Splits a flat record list into fixed-size, index-ordered batches.
    pub fn chunk(records: Vec<MappedRecord>, size: usize) -> Vec<Batch> {
        assert!(size > 0, "batch size must be positive");
        records
            .chunks(size)
            .enumerate()
            .map(|(i, chunk)| Batch::new(BatchIndex(i as u64), chunk.to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::ProvenanceTag;
    use crate::source_record::SourceEntityKind;

    fn record(key: &str) -> MappedRecord {
        MappedRecord::new(
            SourceEntityKind::Issue,
            ProvenanceTag::jira(
                crate::core::identifiers::OriginId(1),
                key.into(),
                "https://jira.example/browse/".to_string() + key,
            ),
        )
    }

    #[test]
    fn chunks_preserve_order_and_index() {
        let records = vec![record("A-1"), record("A-2"), record("A-3")];
        let batches = Batch::chunk(records, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].index, BatchIndex(0));
        assert_eq!(batches[1].index, BatchIndex(1));
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
    }
}
