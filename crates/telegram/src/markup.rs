//! Markup → (plain text, entity spans) serialization.
//!
//! Message templates use a small inline markup set: `**bold**`, `_italic_`,
//! `` `code` ``, and `[label](url)` links. The Bot API wants the plain text
//! plus entity spans with offsets in UTF-16 code units, so the serializer
//! strips the markers and records where each formatted range landed.

use hookflow_engine::clients::{FormatSpan, MarkupSerializer};

/// The serializer used by the chat action.
#[derive(Debug, Default)]
pub struct EntityMarkup;

impl MarkupSerializer for EntityMarkup {
    fn serialize(&self, markup: &str) -> (String, Vec<FormatSpan>) {
        parse(markup)
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn parse(input: &str) -> (String, Vec<FormatSpan>) {
    let chars: Vec<char> = input.chars().collect();
    let mut text = String::new();
    let mut spans = Vec::new();
    let mut offset = 0usize; // UTF-16 length of `text` so far
    let mut i = 0usize;

    while i < chars.len() {
        // **bold**
        if chars[i] == '*' && chars.get(i + 1) == Some(&'*') {
            if let Some(end) = find_marker(&chars, i + 2, &['*', '*']) {
                let inner: String = chars[i + 2..end].iter().collect();
                push_span(&mut spans, "bold", offset, &inner, None);
                offset += utf16_len(&inner);
                text.push_str(&inner);
                i = end + 2;
                continue;
            }
        }
        // _italic_
        if chars[i] == '_' {
            if let Some(end) = find_marker(&chars, i + 1, &['_']) {
                let inner: String = chars[i + 1..end].iter().collect();
                push_span(&mut spans, "italic", offset, &inner, None);
                offset += utf16_len(&inner);
                text.push_str(&inner);
                i = end + 1;
                continue;
            }
        }
        // `code`
        if chars[i] == '`' {
            if let Some(end) = find_marker(&chars, i + 1, &['`']) {
                let inner: String = chars[i + 1..end].iter().collect();
                push_span(&mut spans, "code", offset, &inner, None);
                offset += utf16_len(&inner);
                text.push_str(&inner);
                i = end + 1;
                continue;
            }
        }
        // [label](url)
        if chars[i] == '[' {
            if let Some((label, url, next)) = parse_link(&chars, i) {
                push_span(&mut spans, "text_link", offset, &label, Some(url));
                offset += utf16_len(&label);
                text.push_str(&label);
                i = next;
                continue;
            }
        }

        // Literal character; unclosed markers land here too.
        offset += chars[i].len_utf16();
        text.push(chars[i]);
        i += 1;
    }

    (text, spans)
}

/// Find the start of the next occurrence of `marker` at or after `from`.
fn find_marker(chars: &[char], from: usize, marker: &[char]) -> Option<usize> {
    if from >= chars.len() {
        return None;
    }
    (from..=chars.len().saturating_sub(marker.len()))
        .find(|&i| chars[i..i + marker.len()] == *marker)
}

/// Parse `[label](url)` starting at the `[`; returns (label, url, index past
/// the closing parenthesis).
fn parse_link(chars: &[char], start: usize) -> Option<(String, String, usize)> {
    let close_bracket = find_marker(chars, start + 1, &[']'])?;
    if chars.get(close_bracket + 1) != Some(&'(') {
        return None;
    }
    let close_paren = find_marker(chars, close_bracket + 2, &[')'])?;
    let label: String = chars[start + 1..close_bracket].iter().collect();
    let url: String = chars[close_bracket + 2..close_paren].iter().collect();
    if label.is_empty() || url.is_empty() {
        return None;
    }
    Some((label, url, close_paren + 1))
}

fn push_span(
    spans: &mut Vec<FormatSpan>,
    kind: &str,
    offset: usize,
    inner: &str,
    url: Option<String>,
) {
    if inner.is_empty() {
        return;
    }
    spans.push(FormatSpan {
        kind: kind.to_string(),
        offset,
        length: utf16_len(inner),
        url,
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
