//! Syntax highlighting for code blocks, backed by syntect's bundled grammars
//!
//! Only the scope names matter here; colours come from the active palette,
//! so a theme switch recolours old blocks too.

use maxchat_core::code_block::{HighlightKind, HighlightSpan, Highlighter};
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Scope prefixes mapped to a highlight kind; the innermost matching scope wins
const SCOPE_KINDS: &[(&str, HighlightKind)] = &[
    ("comment", HighlightKind::Comment),
    ("string", HighlightKind::String),
    ("constant.numeric", HighlightKind::Number),
    ("keyword", HighlightKind::Keyword),
    ("storage", HighlightKind::Keyword),
];

pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    kinds: Vec<(Scope, HighlightKind)>,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        let kinds = SCOPE_KINDS
            .iter()
            .filter_map(|(name, kind)| Scope::new(name).ok().map(|scope| (scope, *kind)))
            .collect();
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            kinds,
        }
    }

    fn classify(&self, stack: &ScopeStack) -> Option<HighlightKind> {
        stack.as_slice().iter().rev().find_map(|scope| {
            self.kinds
                .iter()
                .find(|(prefix, _)| prefix.is_prefix_of(*scope))
                .map(|(_, kind)| *kind)
        })
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, language: &str, code: &str) -> Vec<HighlightSpan> {
        let Some(syntax) = self.syntaxes.find_syntax_by_token(language) else {
            return Vec::new();
        };

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut spans: Vec<HighlightSpan> = Vec::new();
        let mut offset = 0;

        let push = |spans: &mut Vec<HighlightSpan>, start: usize, end: usize, kind: Option<HighlightKind>| {
            let Some(kind) = kind else {
                return;
            };
            if start >= end {
                return;
            }
            // Merge with the previous span when it continues the same kind
            match spans.last_mut() {
                Some(last) if last.kind == kind && last.range.end == start => last.range.end = end,
                _ => spans.push(HighlightSpan {
                    range: start..end,
                    kind,
                }),
            }
        };

        for line in LinesWithEndings::from(code) {
            let Ok(ops) = state.parse_line(line, &self.syntaxes) else {
                tracing::debug!(language, "syntax parse failed, leaving the rest plain");
                break;
            };

            let mut pos = 0;
            for (index, op) in ops {
                if index > pos {
                    push(&mut spans, offset + pos, offset + index, self.classify(&stack));
                    pos = index;
                }
                if stack.apply(&op).is_err() {
                    return spans;
                }
            }
            push(&mut spans, offset + pos, offset + line.len(), self.classify(&stack));
            offset += line.len();
        }

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(code: &'a str, spans: &[HighlightSpan], kind: HighlightKind) -> Vec<&'a str> {
        spans
            .iter()
            .filter(|span| span.kind == kind)
            .map(|span| code[span.range.clone()].trim_end())
            .collect()
    }

    #[test]
    fn test_rust_scopes() {
        let code = "fn main() {\n    let n = 42; // answer\n    println!(\"hi\");\n}";
        let spans = SyntectHighlighter::new().highlight("rust", code);

        assert!(texts(code, &spans, HighlightKind::Keyword).contains(&"fn"));
        assert!(texts(code, &spans, HighlightKind::Number).contains(&"42"));
        assert!(texts(code, &spans, HighlightKind::Comment).iter().any(|t| t.contains("answer")));
        assert!(texts(code, &spans, HighlightKind::String).iter().any(|t| t.contains("hi")));
        assert!(spans.iter().all(|span| span.range.end <= code.len()));
    }

    #[test]
    fn test_language_tokens() {
        let highlighter = SyntectHighlighter::new();
        assert!(!highlighter.highlight("py", "def f():\n    return 1").is_empty());
        assert!(highlighter.highlight("plaintext-ish", "def f()").is_empty());
    }
}
