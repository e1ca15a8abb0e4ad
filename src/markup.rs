//! Rendering of trusted note markup into plain display lines.
//!
//! Only [`TrustedMarkup`] is accepted. Block-level tags become line breaks, list items
//! become bullets, every other tag is dropped and common entities are decoded.

use crate::model::TrustedMarkup;

const BLOCK_TAGS: &[&str] = &[
    "br", "div", "p", "tr", "table", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6",
];

pub fn render_lines(markup: &TrustedMarkup) -> Vec<String> {
    let raw = markup.as_raw();
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        if !opens_tag(after) {
            // Bare comparison such as `HR <100`.
            out.push('<');
            rest = after;
            continue;
        }
        let Some(end) = after.find('>') else {
            // Unterminated tag: keep the text as-is.
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let tag = tag_name(&after[..end]);
        if tag == "li" && !after.starts_with('/') {
            out.push_str("\n• ");
        } else if BLOCK_TAGS.contains(&tag.as_str()) {
            out.push('\n');
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    decode_entities(&out)
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect()
}

fn opens_tag(after_lt: &str) -> bool {
    after_lt
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
}

fn tag_name(inner: &str) -> String {
    inner
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup(s: &str) -> TrustedMarkup {
        serde_json::from_value(serde_json::Value::String(s.into())).unwrap()
    }

    #[test]
    fn block_tags_split_lines_and_inline_tags_vanish() {
        let lines = render_lines(&markup(
            "<div>BP 150/90.<br/>Plan: titrate <b>lisinopril</b>.</div><p>Recheck in 4 weeks</p>",
        ));
        assert_eq!(
            lines,
            vec![
                "BP 150/90.",
                "Plan: titrate lisinopril.",
                "Recheck in 4 weeks"
            ]
        );
    }

    #[test]
    fn list_items_become_bullets_and_entities_decode() {
        let lines = render_lines(&markup(
            "<ul><li>A1c &lt; 7%</li><li>Diet &amp; exercise</li></ul>",
        ));
        assert_eq!(lines, vec!["• A1c < 7%", "• Diet & exercise"]);
    }

    #[test]
    fn plain_text_and_stray_angle_bracket_survive() {
        assert_eq!(render_lines(&markup("no tags here")), vec!["no tags here"]);
        assert_eq!(render_lines(&markup("x < y")), vec!["x < y"]);
    }

    #[test]
    fn bare_comparisons_are_not_tags() {
        assert_eq!(
            render_lines(&markup("HR <100 and SBP >140 noted")),
            vec!["HR <100 and SBP >140 noted"]
        );
        assert_eq!(
            render_lines(&markup("<p>K <3.5, replete</p><!-- cc -->")),
            vec!["K <3.5, replete"]
        );
    }
}
