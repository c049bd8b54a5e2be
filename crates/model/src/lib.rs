pub mod batch;
pub mod core;
pub mod events;
pub mod journal;
pub mod mapped_record;
pub mod mapping_cache;
pub mod provenance;
pub mod remote_result;
pub mod remote_script;
pub mod source_record;

pub use batch::Batch;
pub use core::{BatchIndex, ComponentName, JiraKey, OriginId, RunId, Value};
pub use journal::{FieldChange, JournalOperation, JournalRow, OperationKind, ValidityPeriod};
pub use mapped_record::MappedRecord;
pub use mapping_cache::MappingCache;
pub use provenance::{OriginSystem, ProvenanceTag};
pub use remote_result::{RemoteResult, RemoteResultRow, RemoteResultStatus, ResultParseError};
pub use remote_script::RemoteScript;
pub use source_record::{SourceEntityKind, SourceRecord};
