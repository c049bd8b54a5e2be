use crate::error::ComposerError;

const GENERIC_CREATE: &str = include_str!("templates/generic_create.rb");
const WORK_PACKAGES_SKELETON: &str = include_str!("templates/work_packages_skeleton.rb");
const WORK_PACKAGES_CONTENT: &str = include_str!("templates/work_packages_content.rb");
const JOURNALS_REPLACE: &str = include_str!("templates/journals_replace.rb");
const FIND_BY_PROVENANCE: &str = include_str!("templates/find_by_provenance.rb");
const ENSURE_TAGGED: &str = include_str!("templates/ensure_tagged.rb");
const BUILD_MAPPING_CACHE: &str = include_str!("templates/build_mapping_cache.rb");
const RESOLVE_CUSTOM_FIELD_ID: &str = include_str!("templates/resolve_custom_field_id.rb");

/// Which literal body a composed script runs (§4.2 "body templates"). Most
/// components share the generic create-and-collect shape; work packages and
/// journals need their own, and L4's lookup/tagging scripts are bodies too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    GenericCreate,
    WorkPackagesSkeleton,
    WorkPackagesContent,
    JournalsReplace,
    FindByProvenance,
    EnsureTagged,
    BuildMappingCache,
    ResolveCustomFieldId,
}

impl ScriptKind {
    pub fn body_text(self) -> &'static str {
        match self {
            ScriptKind::GenericCreate => GENERIC_CREATE,
            ScriptKind::WorkPackagesSkeleton => WORK_PACKAGES_SKELETON,
            ScriptKind::WorkPackagesContent => WORK_PACKAGES_CONTENT,
            ScriptKind::JournalsReplace => JOURNALS_REPLACE,
            ScriptKind::FindByProvenance => FIND_BY_PROVENANCE,
            ScriptKind::EnsureTagged => ENSURE_TAGGED,
            ScriptKind::BuildMappingCache => BUILD_MAPPING_CACHE,
            ScriptKind::ResolveCustomFieldId => RESOLVE_CUSTOM_FIELD_ID,
        }
    }
}

/// Maps a component name from the dependency graph (§4.6.2) to the
/// ActiveRecord class its scripts instantiate. `remote_links` has no
/// built-in OpenProject model; it assumes a small dedicated table the
/// migration owns (documented as an open decision in the grounding ledger).
pub fn target_class_for(component: &str) -> Result<&'static str, ComposerError> {
    let class = match component {
        "users" => "User",
        "groups" => "Group",
        "projects" => "Project",
        "custom_fields" => "CustomField",
        "issue_types" => "Type",
        "statuses" => "Status",
        "workflows" => "Workflow",
        "priorities" => "IssuePriority",
        "versions" => "Version",
        "components" => "Category",
        "labels" => "Tag",
        "work_packages_skeleton" | "work_packages_content" => "WorkPackage",
        "attachments" => "Attachment",
        "time_entries" => "TimeEntry",
        "relations" => "Relation",
        "watchers" => "Watcher",
        "remote_links" => "RemoteLink",
        other => return Err(ComposerError::UnknownComponent(other.to_string())),
    };
    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_components_resolve_to_a_class() {
        assert_eq!(target_class_for("users").unwrap(), "User");
        assert_eq!(target_class_for("work_packages_skeleton").unwrap(), "WorkPackage");
    }

    #[test]
    fn unknown_components_are_rejected() {
        assert!(target_class_for("not_a_real_component").is_err());
    }
}
