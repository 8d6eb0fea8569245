//! Index page rendering

use crate::queue::QueueStatus;
use crate::store::PageEntry;
use chrono::{DateTime, Local};

/// Local wall-clock time, or an empty string for missing/invalid timestamps
pub fn format_timestamp(timestamp: Option<f64>) -> String {
    let Some(value) = timestamp.filter(|v| v.is_finite()) else {
        return String::new();
    };
    let secs = value.trunc() as i64;
    let nanos = ((value.fract() * 1e9) as u32).min(999_999_999);
    DateTime::from_timestamp(secs, nanos)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_index(entries: &[PageEntry], status: QueueStatus) -> String {
    let mut items = String::new();
    for entry in entries {
        let prompt = entry.prompt.as_deref().unwrap_or("(no prompt recorded)");
        items.push_str(&format!(
            "    <li><a class=\"page\" href=\"/pages/{name}\">{prompt}</a><span class=\"time\">{time}</span></li>\n",
            name = entry.name,
            prompt = escape_html(prompt),
            time = format_timestamp(entry.timestamp),
        ));
    }
    if entries.is_empty() {
        items.push_str("    <li class=\"empty\">No pages yet.</li>\n");
    }

    let queue = if status.is_processing {
        format!("Generating a page; {} waiting", status.queue_depth)
    } else {
        format!("Idle; {} waiting", status.queue_depth)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Pageforge</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }}
ul {{ list-style: none; padding: 0; }}
li {{ display: flex; justify-content: space-between; gap: 1rem; padding: .6rem 0; border-bottom: 1px solid #ddd; }}
.time {{ color: #777; white-space: nowrap; }}
.queue {{ color: #555; }}
</style>
</head>
<body>
<h1>Pageforge</h1>
<p class="queue">{queue}</p>
<ul>
{items}</ul>
</body>
</html>
"#,
        queue = queue,
        items = items,
    )
}
