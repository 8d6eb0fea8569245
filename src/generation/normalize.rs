//! Candidate clean-up between authoring and validation
//!
//! Both functions are pure. `normalize_document` is idempotent and guarantees the
//! document marker, a head section and the two required meta declarations.

use crate::harness::checks::{
    has_charset_meta, has_viewport_meta, head_open_end, open_tag_end, starts_with_marker,
    CHARSET_META, DOCUMENT_MARKER, VIEWPORT_META,
};

const HTML_FENCE: &str = "```html";
const FENCE: &str = "```";

/// Extract the body of a fenced code block
///
/// A "```html" fence anywhere in the text wins; otherwise a generic fence at the
/// very start is unwrapped. Unfenced text is returned trimmed.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();

    // ASCII lowercasing keeps byte offsets aligned with `trimmed`
    if let Some(start) = trimmed.to_ascii_lowercase().find(HTML_FENCE) {
        return fenced_body(&trimmed[start + HTML_FENCE.len()..]);
    }

    if let Some(rest) = trimmed.strip_prefix(FENCE) {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        return fenced_body(body);
    }

    trimmed.to_string()
}

fn fenced_body(after_open: &str) -> String {
    let end = after_open.find(FENCE).unwrap_or(after_open.len());
    after_open[..end].trim().to_string()
}

/// Repair the mechanical defects authors most often leave behind
pub fn normalize_document(body: &str) -> String {
    let mut doc = body.trim().to_string();

    if !starts_with_marker(&doc) {
        doc = format!("{}\n{}", DOCUMENT_MARKER, doc);
    }

    if head_open_end(&doc).is_none() {
        // The new head has to open before the body to count as one
        let at = match (open_tag_end(&doc, "html"), open_tag_end(&doc, "body")) {
            (Some(html), Some(body)) if body < html => DOCUMENT_MARKER.len(),
            (Some(html), _) => html,
            (None, _) => DOCUMENT_MARKER.len(),
        };
        doc.insert_str(at, "\n<head></head>");
    }

    let mut metas = Vec::new();
    if !has_charset_meta(&doc) {
        metas.push(CHARSET_META);
    }
    if !has_viewport_meta(&doc) {
        metas.push(VIEWPORT_META);
    }
    if !metas.is_empty() {
        if let Some(at) = head_open_end(&doc) {
            doc.insert_str(at, &format!("\n{}", metas.join("\n")));
        }
    }

    doc.trim_end().to_string()
}
