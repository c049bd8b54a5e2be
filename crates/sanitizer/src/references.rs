use crate::link_resolver::LinkResolver;
use model::{JiraKey, SourceEntityKind};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+-\d+\b").unwrap());

/// Rewrites bare Jira issue keys (`NRS-2`) embedded in free text to their
/// migrated work-package reference (`WP#456`), once every issue in scope
/// has a work-package id (§4.6.5 "Relations / inline refs", §8 #9). A key
/// that doesn't resolve is left untouched — it may reference an issue
/// outside the current migration scope, which is not an error.
pub fn rewrite_jira_keys(text: &str, resolver: &LinkResolver) -> String {
    ISSUE_KEY
        .replace_all(text, |caps: &Captures| {
            let key = &caps[0];
            match resolver.resolve(SourceEntityKind::Issue, &JiraKey::new(key)) {
                Some(wp_id) => format!("WP#{wp_id}"),
                None => key.to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::MappingCache;

    #[test]
    fn rewrites_resolved_keys_and_leaves_unresolved_ones_alone() {
        let mut cache = MappingCache::new();
        cache.insert(JiraKey::new("NRS-2"), 456);
        let resolver = LinkResolver::new().with_cache(SourceEntityKind::Issue, cache);

        let rewritten = rewrite_jira_keys("blocks NRS-2 and also OTHER-9", &resolver);
        assert_eq!(rewritten, "blocks WP#456 and also OTHER-9");
        assert!(!rewritten.contains("NRS-2"));
    }
}
