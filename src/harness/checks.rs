//! Text-level document checks
//!
//! These run on the raw candidate before any browser is started. The head and
//! meta predicates are shared with normalization so a normalized body always
//! passes them.

/// Marker every page must start with
pub const DOCUMENT_MARKER: &str = "<!DOCTYPE html>";

/// Structural tags that must appear in the document (case-insensitive)
///
/// Opening tags may carry attributes. The head only counts when it opens before
/// the body, so a `"<head>"` inside a body script is not mistaken for one.
pub const REQUIRED_TAGS: [&str; 6] = ["<html>", "</html>", "<head>", "</head>", "<body>", "</body>"];

pub const CHARSET_META: &str = r#"<meta charset="UTF-8">"#;
pub const VIEWPORT_META: &str =
    r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#;

/// Case-insensitive check for the document marker, ignoring leading whitespace
pub fn starts_with_marker(body: &str) -> bool {
    let trimmed = body.trim_start();
    trimmed
        .get(..DOCUMENT_MARKER.len())
        .map(|head| head.eq_ignore_ascii_case(DOCUMENT_MARKER))
        .unwrap_or(false)
}

pub fn has_charset_meta(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    [
        r#"<meta charset="utf-8""#,
        "<meta charset='utf-8'",
        "<meta charset=utf-8",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

pub fn has_viewport_meta(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains(r#"<meta name="viewport""#) || lower.contains("<meta name='viewport'")
}

/// Byte offset just past the `>` of the first `<name ...>` (case-insensitive)
///
/// `head` must not match `<header`, so the name has to be followed by `>`, `/` or
/// whitespace.
pub fn open_tag_end(doc: &str, name: &str) -> Option<usize> {
    let lower = doc.to_ascii_lowercase();
    let tag = format!("<{}", name);
    let mut from = 0;
    while let Some(found) = lower[from..].find(&tag) {
        let after = from + found + tag.len();
        match lower[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => {
                return lower[after..].find('>').map(|close| after + close + 1);
            }
            _ => from = after,
        }
    }
    None
}

/// End of the head's opening tag, if one opens before the body
pub fn head_open_end(doc: &str) -> Option<usize> {
    let head = open_tag_end(doc, "head")?;
    match open_tag_end(doc, "body") {
        Some(body) if body < head => None,
        _ => Some(head),
    }
}

fn has_structural_tag(doc: &str, lower: &str, tag: &str) -> bool {
    if tag.starts_with("</") {
        return lower.contains(tag);
    }
    match tag.trim_start_matches('<').trim_end_matches('>') {
        "head" => head_open_end(doc).is_some(),
        name => open_tag_end(doc, name).is_some(),
    }
}

/// Steps 1-3 of validation; returns the first failure reason
pub fn check_document(body: &str) -> Result<(), String> {
    if body.trim().is_empty() {
        return Err("Empty content provided".to_string());
    }

    if !starts_with_marker(body) {
        return Err("Missing or incorrect DOCTYPE declaration".to_string());
    }

    let lower = body.to_ascii_lowercase();
    if let Some(tag) = REQUIRED_TAGS
        .iter()
        .find(|tag| !has_structural_tag(body, &lower, tag))
    {
        return Err(format!("Missing required tag: {}", tag));
    }

    if !has_charset_meta(body) {
        return Err("Missing meta charset declaration".to_string());
    }
    if !has_viewport_meta(body) {
        return Err("Missing viewport meta tag".to_string());
    }

    Ok(())
}
