pub mod components;
pub mod custom_fields;
pub mod groups;
pub mod issue_types;
pub mod labels;
pub mod priorities;
pub mod projects;
pub mod statuses;
pub mod users;
pub mod versions;
pub mod work_packages;
pub mod workflows;

use model::{MappedRecord, Value};

/// Attaches the four provenance custom-field assignments every migrated
/// record carries (§4.3 rule 6). Every entity mapper in this module funnels
/// its finished record through here exactly once.
pub(crate) fn attach_provenance(mut record: MappedRecord) -> MappedRecord {
    let pairs = record.provenance.as_custom_field_pairs();
    for (field, value) in pairs {
        record.set(format!("custom_field:{field}"), Value::String(value));
    }
    record
}
