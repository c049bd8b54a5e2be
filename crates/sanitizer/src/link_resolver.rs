use model::{JiraKey, MappingCache, SourceEntityKind};
use std::collections::HashMap;

/// Read-only view over the mapping caches L4 builds from provenance tags
/// (§4.4 `build_mapping_cache`). Rule 3 ("flatten references") resolves a
/// Jira link through this instead of querying OpenProject directly — the
/// sanitizer itself performs no I/O; everything it needs has already been
/// assembled into in-memory caches by the time a `map` call happens.
#[derive(Debug, Default, Clone)]
pub struct LinkResolver {
    caches: HashMap<SourceEntityKind, MappingCache>,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, kind: SourceEntityKind, cache: MappingCache) -> Self {
        self.caches.insert(kind, cache);
        self
    }

    pub fn insert_cache(&mut self, kind: SourceEntityKind, cache: MappingCache) {
        self.caches.insert(kind, cache);
    }

    pub fn resolve(&self, kind: SourceEntityKind, key: &JiraKey) -> Option<i64> {
        self.caches.get(&kind).and_then(|cache| cache.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_the_matching_kind_cache_only() {
        let mut users = MappingCache::new();
        users.insert(JiraKey::new("jdoe"), 42);
        let resolver = LinkResolver::new().with_cache(SourceEntityKind::User, users);

        assert_eq!(
            resolver.resolve(SourceEntityKind::User, &JiraKey::new("jdoe")),
            Some(42)
        );
        assert_eq!(
            resolver.resolve(SourceEntityKind::Project, &JiraKey::new("jdoe")),
            None
        );
    }
}
