//! Rule file parser.
//!
//! Rule files carry YAML frontmatter delimited by `---` followed by a markdown
//! body. A hand-written YAML subset parser handles the keys rule files use:
//!
//! ```text
//! ---
//! description: Error handling conventions
//! globs: src/**/*.rs, tests/**/*.rs
//! ---
//! Body text.
//! ```
//!
//! `globs` accepts a comma-separated scalar, an inline array, or a multi-line
//! `- item` list. Commas inside `{...}` never split a pattern.

use crate::document::RawDocument;

/// Parse raw file content into a [`RawDocument`] addressed by `address`.
///
/// Parsing never fails: missing pieces surface as `None`/empty fields and are
/// rejected by validation at load time.
pub fn parse_rule_file(address: &str, raw_content: &str) -> RawDocument {
    let (yaml, body) = extract_frontmatter(raw_content);
    let mut doc = RawDocument::new(address, body);
    if let Some(yaml) = yaml {
        parse_frontmatter(&yaml, &mut doc);
    }
    doc
}

/// Split `---` delimited frontmatter from the body.
///
/// Both delimiters must be a line of exactly `---` (trailing whitespace
/// allowed). Returns `(yaml, body)`. Without a closing delimiter the whole
/// input is body.
fn extract_frontmatter(content: &str) -> (Option<String>, String) {
    let Some(after_open) = strip_delimiter_line(content.trim_start()) else {
        return (None, content.to_string());
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if is_delimiter(line) {
            let yaml = after_open[..offset].to_string();
            let body = after_open[offset + line.len()..].to_string();
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, content.to_string())
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Remainder after a leading delimiter line.
fn strip_delimiter_line(s: &str) -> Option<&str> {
    let end = s.find('\n').map_or(s.len(), |i| i + 1);
    is_delimiter(&s[..end]).then(|| &s[end..])
}

fn parse_frontmatter(yaml: &str, doc: &mut RawDocument) {
    let lines: Vec<&str> = yaml.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        match key.trim() {
            "description" => {
                let value = unquote(value);
                doc.description = (!value.is_empty()).then_some(value);
            }
            "globs" => doc.globs = parse_list_value(value.trim(), &lines, &mut i),
            _ => {}
        }
    }
}

/// Parse a list value: inline `[a, b]`, comma scalar `a, b`, or `- item` lines.
fn parse_list_value(value: &str, lines: &[&str], i: &mut usize) -> Vec<String> {
    if let Some(inner) = value.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        return split_top_level(inner);
    }

    if !value.is_empty() {
        return split_top_level(&unquote(value));
    }

    let mut items = Vec::new();
    while *i < lines.len() {
        let trimmed = lines[*i].trim();
        let Some(item) = trimmed.strip_prefix('-') else {
            break;
        };
        let item = unquote(item);
        if !item.is_empty() {
            items.push(item);
        }
        *i += 1;
    }
    items
}

/// Split on commas that are not inside `{...}`, dropping blank items.
fn split_top_level(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in s.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    items.push(&s[start..]);

    items
        .into_iter()
        .map(unquote)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Remove surrounding quotes from a string value.
fn unquote(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_description_and_scalar_globs() {
        let doc = parse_rule_file(
            "rust/errors.mdc",
            "---\ndescription: Error handling\nglobs: src/**/*.rs, tests/**/*.rs\n---\nUse thiserror.",
        );
        assert_eq!(doc.address, "rust/errors.mdc");
        assert_eq!(doc.description.as_deref(), Some("Error handling"));
        assert_eq!(doc.globs, vec!["src/**/*.rs", "tests/**/*.rs"]);
        assert_eq!(doc.body, "Use thiserror.");
    }

    #[test]
    fn brace_commas_do_not_split() {
        let doc = parse_rule_file(
            "web.mdc",
            "---\ndescription: Web\nglobs: **/*.{ts,tsx}, web/**\n---\nBody",
        );
        assert_eq!(doc.globs, vec!["**/*.{ts,tsx}", "web/**"]);
    }

    #[test]
    fn inline_array_globs() {
        let doc = parse_rule_file(
            "a.md",
            "---\ndescription: A\nglobs: [\"src/*.rs\", 'lib/*.{c,h}']\n---\n",
        );
        assert_eq!(doc.globs, vec!["src/*.rs", "lib/*.{c,h}"]);
        assert!(doc.body.is_empty());
    }

    #[test]
    fn multiline_globs() {
        let doc = parse_rule_file(
            "a.md",
            "---\nglobs:\n  - src/*.rs\n  - \"docs/**\"\ndescription: After list\n---\nBody",
        );
        assert_eq!(doc.globs, vec!["src/*.rs", "docs/**"]);
        assert_eq!(doc.description.as_deref(), Some("After list"));
    }

    #[test]
    fn description_may_contain_colons() {
        let doc = parse_rule_file("a.md", "---\ndescription: Note: be brief\nglobs: *\n---\n");
        assert_eq!(doc.description.as_deref(), Some("Note: be brief"));
    }

    #[test]
    fn unknown_keys_ignored() {
        let doc = parse_rule_file(
            "a.md",
            "---\ndescription: A\nalwaysApply: false\nglobs: *.rs\n---\nBody",
        );
        assert_eq!(doc.globs, vec!["*.rs"]);
    }

    #[test]
    fn blank_description_is_none() {
        let doc = parse_rule_file("a.md", "---\ndescription: \"\"\nglobs: *.rs\n---\nBody");
        assert!(doc.description.is_none());
    }

    #[test]
    fn no_frontmatter_is_all_body() {
        let content = "# Title\n\nJust a body.";
        let doc = parse_rule_file("a.md", content);
        assert!(doc.description.is_none());
        assert!(doc.globs.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn unclosed_frontmatter_is_all_body() {
        let content = "---\ndescription: Incomplete\nSome content";
        let doc = parse_rule_file("a.md", content);
        assert!(doc.description.is_none());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn dashed_line_inside_frontmatter_does_not_close_it() {
        let doc = parse_rule_file(
            "a.md",
            "---\ndescription: A\n--- notes\nglobs: src/*.rs\n---\nBody\n---- rule ----",
        );
        assert_eq!(doc.description.as_deref(), Some("A"));
        assert_eq!(doc.globs, vec!["src/*.rs"]);
        assert_eq!(doc.body, "Body\n---- rule ----");
    }

    #[test]
    fn opening_line_must_be_bare_delimiter() {
        let content = "----\nglobs: *.rs\n---\nBody";
        let doc = parse_rule_file("a.md", content);
        assert!(doc.globs.is_empty());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn empty_frontmatter_block() {
        let doc = parse_rule_file("a.md", "---\n---\nBody");
        assert!(doc.description.is_none());
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn crlf_line_endings() {
        let doc = parse_rule_file(
            "a.md",
            "---\r\ndescription: Windows\r\nglobs: *.rs\r\n---\r\nBody\r\n",
        );
        assert_eq!(doc.description.as_deref(), Some("Windows"));
        assert_eq!(doc.globs, vec!["*.rs"]);
        assert_eq!(doc.body, "Body\r\n");
    }

    #[test]
    fn split_top_level_handles_nesting() {
        assert_eq!(
            split_top_level("a/{b,{c,d}}/*, e"),
            vec!["a/{b,{c,d}}/*", "e"]
        );
        assert!(split_top_level(" , ").is_empty());
    }

    #[test]
    fn unquote_variants() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("'world'"), "world");
        assert_eq!(unquote("  plain  "), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
