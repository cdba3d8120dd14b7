//! Reply segmentation on code fences

use crate::code_block::DEFAULT_LANGUAGE;

pub const FENCE: &str = "```";

/// A contiguous prose or code portion of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySegment {
    Prose(String),
    Code { language: String, code: String },
}

/// Split a reply on fences. Even positions are prose, odd positions code; an
/// unmatched trailing fence yields a final code segment.
pub fn segments(reply: &str) -> Vec<ReplySegment> {
    reply
        .split(FENCE)
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 0 {
                ReplySegment::Prose(part.to_string())
            } else {
                code_segment(part)
            }
        })
        .collect()
}

/// First line declares the language, the remaining lines are the body
fn code_segment(part: &str) -> ReplySegment {
    let (first, body) = part.split_once('\n').unwrap_or((part, ""));
    let language = first.trim();
    ReplySegment::Code {
        language: if language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language.to_string()
        },
        code: body.to_string(),
    }
}

/// Split formatted prose into sentences at whitespace following `.`, `!` or
/// `?`. The separating whitespace is dropped.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            out.push(&text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    out.push(&text[start..]);
    out
}
