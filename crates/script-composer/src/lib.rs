pub mod compose;
pub mod error;
pub mod escape;
pub mod head;
pub mod templates;

pub use compose::{
    ComposedScript, JournalBatchEntry, TagBatchEntry, compose_build_mapping_cache, compose_create,
    compose_ensure_tagged, compose_find_by_provenance, compose_journals_replace,
    compose_resolve_custom_field_id, compose_work_packages_content,
};
pub use error::ComposerError;
pub use escape::ruby_inspect;
pub use head::{HeadParams, compose_head};
pub use templates::{ScriptKind, target_class_for};
