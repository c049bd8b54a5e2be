/// Renders `s` as a Ruby double-quoted string literal, the way
/// `String#inspect` would (§4.2 "escaping rule", §8 testable property 3).
/// Every dynamic string that ends up inside a composed script body must go
/// through this function — direct interpolation into a quoted Ruby string
/// is what the injection-safety property forbids.
pub fn ruby_inspect(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            '#' if matches!(chars.peek(), Some('{') | Some('@') | Some('$')) => {
                out.push_str("\\#");
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(ruby_inspect(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn escapes_interpolation_markers() {
        assert_eq!(ruby_inspect("#{system('rm -rf /')}"), r#""\#{system('rm -rf /')}""#);
    }

    #[test]
    fn escapes_newlines_so_bare_code_cannot_follow() {
        let input = "line one\nputs 1";
        let rendered = ruby_inspect(input);
        assert!(!rendered.contains('\n'));
        assert_eq!(rendered, r#""line one\nputs 1""#);
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(ruby_inspect("jdoe"), "\"jdoe\"");
    }
}
