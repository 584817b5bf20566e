//! Comma-separated transcript export.

use serde::Serialize;

pub const HEADER: &str = "Timestamp,User,Text";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub timestamp: String,
    pub speaker: String,
    pub lines: Vec<String>,
}

impl ExportRow {
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Text fields are always quoted; other fields only when they need it.
pub fn render(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + rows.len() * 48);
    out.push_str(HEADER);
    out.push('\n');

    for row in rows {
        out.push_str(&field(&row.timestamp));
        out.push(',');
        out.push_str(&field(&row.speaker));
        out.push(',');
        out.push_str(&quoted(&row.text()));
        out.push('\n');
    }

    out
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
