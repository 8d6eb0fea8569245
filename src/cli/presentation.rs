//! CLI presentation: text and JSON rendering for command results.

use crate::error::ApiError;
use crate::server::index::format_timestamp;
use crate::store::PageEntry;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

const PROMPT_COLUMN_WIDTH: usize = 60;

pub fn format_page_list_text(entries: &[PageEntry]) -> String {
    if entries.is_empty() {
        return "No pages published yet.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Page", "Prompt", "Created"]);
    for entry in entries {
        let prompt = entry
            .prompt
            .as_deref()
            .map(|p| truncate(p, PROMPT_COLUMN_WIDTH))
            .unwrap_or_else(|| "-".to_string());
        let created = match format_timestamp(entry.timestamp) {
            t if t.is_empty() => "-".to_string(),
            t => t,
        };
        table.add_row(vec![entry.name.to_string(), prompt, created]);
    }
    format!("{}\n{} page(s)", table, entries.len())
}

pub fn format_page_list_json(entries: &[PageEntry]) -> Result<String, ApiError> {
    serde_json::to_string_pretty(entries)
        .map_err(|e| ApiError::StorageError(crate::error::StorageError::Serialization(e)))
}

pub fn format_ping_result(provider: &str, model: &str, reply: &str) -> String {
    format!("{} ({}) replied: {}", provider, model, reply)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}
