//! Markdown formatter for the small subset replies use
//!
//! Each pass runs over the output of the previous one, so an earlier rule can
//! mask a later one: a line like `*item*` becomes italic and is never seen as
//! a bullet.

use std::sync::OnceLock;

use regex::Regex;

/// Class on inline code spans, picked up by the entrance stagger
pub const INLINE_CODE_CLASS: &str = "inline-code";
/// Class on list containers
pub const FADE_LIST_CLASS: &str = "fade-list";

const PASSES: [(&str, &str); 7] = [
    (r"\*\*(.*?)\*\*", "<strong>$1</strong>"),
    (r"\*(.*?)\*", "<em>$1</em>"),
    (r"`([^`]+)`", "<code class='inline-code'>$1</code>"),
    (r"\[([^\]]+)\]\(([^)]+)\)", r#"<a href="$2" target="_blank">$1</a>"#),
    // numbered items, then bullets; the newline before an item is consumed
    (r"(?:^|\n)[0-9]+\.\s+(.*)", "<li>$1</li>"),
    (r"(?:^|\n)[*-]\s+(.*)", "<li>$1</li>"),
    (r"(?s)(?:<li>.*?</li>)+", r#"<ul class="fade-list">$0</ul>"#),
];

fn passes() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PASSES
            .iter()
            .map(|(pattern, replacement)| {
                (Regex::new(pattern).expect("markdown pattern is valid"), *replacement)
            })
            .collect()
    })
}

/// Convert markdown text into markup
pub fn format(text: &str) -> String {
    passes()
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bold() {
        assert!(format("**x**").contains("<strong>x</strong>"));
        assert_eq!(format("a **b** c"), "a <strong>b</strong> c");
    }

    #[test]
    fn test_italic() {
        assert_eq!(format("an *odd* film"), "an <em>odd</em> film");
    }

    #[test]
    fn test_inline_code() {
        assert!(format("`x`").contains("<code class='inline-code'>x</code>"));
    }

    #[test]
    fn test_link() {
        assert_eq!(
            format("see [IMDb](https://imdb.com)"),
            r#"see <a href="https://imdb.com" target="_blank">IMDb</a>"#
        );
    }

    #[test]
    fn test_numbered_list() {
        assert_eq!(
            format("Top picks:\n1. Heat\n2. Ronin"),
            r#"Top picks:<ul class="fade-list"><li>Heat</li><li>Ronin</li></ul>"#
        );
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(
            format("- Alien\n- Aliens\nBoth great."),
            "<ul class=\"fade-list\"><li>Alien</li><li>Aliens</li></ul>\nBoth great."
        );
    }

    #[test]
    fn test_separate_runs_get_separate_lists() {
        let out = format("- a\nmiddle\n- b");
        assert_eq!(
            out,
            "<ul class=\"fade-list\"><li>a</li></ul>\nmiddle<ul class=\"fade-list\"><li>b</li></ul>"
        );
    }

    #[test]
    fn test_italic_masks_bullet() {
        // first match wins: italic runs before bullet detection
        assert_eq!(format("*item*"), "<em>item</em>");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "Try Arrival, it is quiet and strange.";
        assert_eq!(format(text), text);
        assert_eq!(format(&format(text)), text);
    }
}
