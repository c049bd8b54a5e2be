use crate::escape::ruby_inspect;

/// The fixed set of named parameters a head may interpolate (§4.2). No
/// branching or loop construct is ever assembled here — just `name = value`
/// assignment lines, each value escaped through [`ruby_inspect`] or, for
/// integers, passed through verbatim since Rust's own type system is the
/// only thing that can have produced them.
#[derive(Debug, Clone, Default)]
pub struct HeadParams {
    pub input_path: Option<String>,
    pub result_path: String,
    pub target_class_name: Option<String>,
    pub origin_key_field_id: Option<i64>,
}

/// Renders [`HeadParams`] as local-variable assignments, one per line, in a
/// fixed order. This is the entire head — body templates reference these
/// locals (`input_path`, `result_path`, `target_class_name`,
/// `origin_key_field_id`) by name and never see raw Jira data directly.
pub fn compose_head(params: &HeadParams) -> String {
    let mut lines = Vec::with_capacity(4);

    if let Some(input_path) = &params.input_path {
        lines.push(format!("input_path = {}", ruby_inspect(input_path)));
    }
    lines.push(format!("result_path = {}", ruby_inspect(&params.result_path)));
    if let Some(class_name) = &params.target_class_name {
        lines.push(format!("target_class_name = {}", ruby_inspect(class_name)));
    }
    if let Some(field_id) = params.origin_key_field_id {
        lines.push(format!("origin_key_field_id = {field_id}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_only_the_parameters_that_are_present() {
        let head = compose_head(&HeadParams {
            input_path: None,
            result_path: "/tmp/out.json".to_string(),
            target_class_name: Some("User".to_string()),
            origin_key_field_id: None,
        });
        assert_eq!(
            head,
            "result_path = \"/tmp/out.json\"\ntarget_class_name = \"User\""
        );
    }

    #[test]
    fn escapes_paths_containing_quotes() {
        let head = compose_head(&HeadParams {
            input_path: Some("/tmp/\"evil\".json".to_string()),
            result_path: "/tmp/out.json".to_string(),
            target_class_name: None,
            origin_key_field_id: None,
        });
        assert!(head.contains(r#"input_path = "/tmp/\"evil\".json""#));
    }
}
