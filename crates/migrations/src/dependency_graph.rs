/// The static component dependency graph from §4.6.2, expressed as ordered
/// tiers: every component in a tier may run once every component in every
/// earlier tier has completed. Components within a tier have no ordering
/// constraint on each other.
const DEFAULT_TIERS: &[&[&str]] = &[
    &["users"],
    &["groups"],
    &["projects"],
    &[
        "custom_fields",
        "issue_types",
        "statuses",
        "workflows",
        "priorities",
        "versions",
        "components",
        "labels",
    ],
    &["work_packages_skeleton"],
    &["work_packages_content"],
    &["attachments", "time_entries", "relations", "watchers", "remote_links", "inline_refs"],
];

/// Flattens the default tiers into a single topological order, then applies
/// an optional operator override (`migration.component_order[]`, §6) and an
/// optional component allow-list (`--components`, §6). The override
/// replaces ordering only among the components it names; anything it omits
/// keeps its default relative position.
pub fn resolve_order(override_order: Option<&[String]>, only: Option<&[String]>) -> Vec<String> {
    let default_order: Vec<String> = DEFAULT_TIERS.iter().flat_map(|tier| tier.iter().map(|c| c.to_string())).collect();

    let ordered = match override_order {
        Some(order) if !order.is_empty() => {
            let mut result: Vec<String> = order.to_vec();
            for component in &default_order {
                if !result.contains(component) {
                    result.push(component.clone());
                }
            }
            result
        }
        _ => default_order,
    };

    match only {
        Some(allow) => ordered.into_iter().filter(|c| allow.contains(c)).collect(),
        None => ordered,
    }
}

/// The tier index of a component, used to validate that a dependency's
/// tier has actually completed before a downstream component is dispatched.
pub fn tier_of(component: &str) -> Option<usize> {
    DEFAULT_TIERS.iter().position(|tier| tier.contains(&component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_respects_the_four_major_tiers() {
        let order = resolve_order(None, None);
        let users_pos = order.iter().position(|c| c == "users").unwrap();
        let projects_pos = order.iter().position(|c| c == "projects").unwrap();
        let skeleton_pos = order.iter().position(|c| c == "work_packages_skeleton").unwrap();
        let content_pos = order.iter().position(|c| c == "work_packages_content").unwrap();
        assert!(users_pos < projects_pos);
        assert!(projects_pos < skeleton_pos);
        assert!(skeleton_pos < content_pos);
    }

    #[test]
    fn operator_override_reorders_named_components_but_keeps_others() {
        let override_order = vec!["projects".to_string(), "users".to_string()];
        let order = resolve_order(Some(&override_order), None);
        assert_eq!(order[0], "projects");
        assert_eq!(order[1], "users");
        assert!(order.contains(&"work_packages_skeleton".to_string()));
    }

    #[test]
    fn component_allow_list_filters_without_breaking_relative_order() {
        let only = vec!["users".to_string(), "projects".to_string()];
        let order = resolve_order(None, Some(&only));
        assert_eq!(order, vec!["users".to_string(), "projects".to_string()]);
    }

    #[test]
    fn work_packages_content_tier_is_strictly_after_skeleton_tier() {
        assert!(tier_of("work_packages_skeleton").unwrap() < tier_of("work_packages_content").unwrap());
    }
}
