use crate::core::identifiers::{JiraKey, OriginId};
use serde::{Deserialize, Serialize};

/// The kind of Jira entity a [`SourceRecord`] carries. Mirrors the component
/// graph's leaves (`4.6.2`) rather than Jira's own REST resource names, so a
/// single enum can be cached and looked up uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceEntityKind {
    User,
    Group,
    Project,
    CustomField,
    IssueType,
    Status,
    Workflow,
    Priority,
    Version,
    Component,
    Label,
    Issue,
    ChangelogEntry,
    Comment,
    Attachment,
    Worklog,
    Relation,
    Watcher,
    RemoteLink,
}

impl SourceEntityKind {
    /// Stable lowercase tag used in cache file names and content keys.
    pub fn as_tag(&self) -> &'static str {
        match self {
            SourceEntityKind::User => "user",
            SourceEntityKind::Group => "group",
            SourceEntityKind::Project => "project",
            SourceEntityKind::CustomField => "custom_field",
            SourceEntityKind::IssueType => "issue_type",
            SourceEntityKind::Status => "status",
            SourceEntityKind::Workflow => "workflow",
            SourceEntityKind::Priority => "priority",
            SourceEntityKind::Version => "version",
            SourceEntityKind::Component => "component",
            SourceEntityKind::Label => "label",
            SourceEntityKind::Issue => "issue",
            SourceEntityKind::ChangelogEntry => "changelog_entry",
            SourceEntityKind::Comment => "comment",
            SourceEntityKind::Attachment => "attachment",
            SourceEntityKind::Worklog => "worklog",
            SourceEntityKind::Relation => "relation",
            SourceEntityKind::Watcher => "watcher",
            SourceEntityKind::RemoteLink => "remote_link",
        }
    }
}

/// A raw Jira entity as fetched from the Jira client, immutable once
/// fetched (§3.1). `payload` is the entity's JSON exactly as the Jira client
/// returned it — the sanitizer is the only layer permitted to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub kind: SourceEntityKind,
    pub origin_id: OriginId,
    pub origin_key: Option<JiraKey>,
    pub payload: serde_json::Value,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl SourceRecord {
    pub fn new(
        kind: SourceEntityKind,
        origin_id: OriginId,
        origin_key: Option<JiraKey>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            origin_id,
            origin_key,
            payload,
            fetched_at: chrono::Utc::now(),
        }
    }

    /// Content key used to cache this record under the data directory:
    /// `(entity type + Jira ID)` per §3.1.
    pub fn content_key(&self) -> String {
        format!("{}:{}", self.kind.as_tag(), self.origin_id)
    }
}
