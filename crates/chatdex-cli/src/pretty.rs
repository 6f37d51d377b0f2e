//! Terminal and CSV output formatting for chatdex results.

use std::path::Path;

use chatdex_core::models::SearchHit;
use console::style;

/// How much message text a console result block shows.
const SNIPPET_CHARS: usize = 500;

/// Render an optional unix-seconds timestamp as an ISO date-time, empty
/// when absent.
pub fn ts_to_iso(ts: Option<f64>) -> String {
    ts.and_then(|t| chrono::DateTime::from_timestamp_micros((t * 1_000_000.0) as i64))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Print one search result block: a header line, a body snippet with
/// newlines collapsed to spaces, and a separator.
pub fn print_hit(hit: &SearchHit) {
    let header = format!(
        "[{}] ({}) {}",
        ts_to_iso(hit.created_at),
        hit.role,
        hit.title
    );
    println!("{}", style(header).cyan());
    println!("{}", snippet(&hit.text));
    println!("{}", "-".repeat(80));
}

fn snippet(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

/// Write search hits as CSV rows (header + one row per hit).
pub fn write_csv(path: &Path, hits: &[SearchHit]) -> std::io::Result<()> {
    let mut out = String::from("message_id,conversation_id,title,role,created_at,text\r\n");
    for hit in hits {
        let row = [
            csv_field(&hit.message_id),
            csv_field(&hit.conversation_id),
            csv_field(&hit.title),
            csv_field(&hit.role.to_string()),
            csv_field(&ts_to_iso(hit.created_at)),
            csv_field(&hit.text),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    std::fs::write(path, out)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
