use regex::{Captures, Regex};
use std::sync::LazyLock;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{code(?::[^}]*)?\}(.*?)\{code\}").unwrap());
static QUOTE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{quote\}(.*?)\{quote\}").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^h([1-6])\.\s*(.+)$").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\*\s+(.+)$").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^|\]\n]+)\|([^\]\n]+)\]").unwrap());
static MONOSPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([^}\n]+)\}\}").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_\n]+)_").unwrap());

/// Converts a Jira wiki-markup string to Markdown (§4.3 rule 5, §1's
/// delegated pure function). Covers the subset that shows up in practice in
/// issue descriptions and comments: headings, bold/italic/monospace, piped
/// links, bulleted/numbered lists, code blocks, and block quotes. Anything
/// outside that subset passes through unchanged rather than being rejected —
/// a best-effort rendering beats dropping the text.
pub fn jira_wiki_to_markdown(source: &str) -> String {
    let mut text = CODE_BLOCK.replace_all(source, "```\n$1\n```").into_owned();
    text = QUOTE_BLOCK.replace_all(&text, "> $1").into_owned();
    text = HEADING
        .replace_all(&text, |caps: &Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("{} {}", "#".repeat(level), &caps[2])
        })
        .into_owned();
    text = BULLET.replace_all(&text, "- $1").into_owned();
    text = NUMBERED.replace_all(&text, "1. $1").into_owned();
    text = LINK.replace_all(&text, "[$1]($2)").into_owned();
    text = MONOSPACE.replace_all(&text, "`$1`").into_owned();
    text = BOLD.replace_all(&text, "**$1**").into_owned();
    text = ITALIC.replace_all(&text, "*$1*").into_owned();
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_heading_levels() {
        assert_eq!(jira_wiki_to_markdown("h2. Scope"), "## Scope");
    }

    #[test]
    fn converts_bold_and_italic() {
        assert_eq!(jira_wiki_to_markdown("*important* and _subtle_"), "**important** and *subtle*");
    }

    #[test]
    fn converts_piped_links() {
        assert_eq!(
            jira_wiki_to_markdown("[docs|https://example.com/docs]"),
            "[docs](https://example.com/docs)"
        );
    }

    #[test]
    fn converts_code_blocks() {
        let input = "{code:java}\nint x = 1;\n{code}";
        assert_eq!(jira_wiki_to_markdown(input), "```\n\nint x = 1;\n```");
    }

    #[test]
    fn converts_bullet_list() {
        assert_eq!(jira_wiki_to_markdown("* first\n* second"), "- first\n- second");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(jira_wiki_to_markdown("nothing special here"), "nothing special here");
    }
}
