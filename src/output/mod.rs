pub mod report;

use serde::Serialize;

use crate::rows::{display_value, Record, RowSet, COLUMN_TITLES};

const MAX_TEXT_CELL_WIDTH: usize = 40;
pub const DELETE_MARKER: &str = "x";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

/// What the rendered page needs to talk back to the API.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PageContext {
    pub url: String,
    pub database: String,
    pub detail_page: String,
    pub filter: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRow {
    pub id: Option<String>,
    pub cells: Vec<String>,
}

pub fn build_rows(rows: &RowSet) -> Vec<OutputRow> {
    rows.rows()
        .iter()
        .map(|r| OutputRow {
            id: r.id.as_ref().map(|id| id.to_string()),
            cells: r.cells.cells().to_vec(),
        })
        .collect()
}

fn clip(value: &str, width: usize) -> String {
    let flat = value.replace(['\n', '\r', '\t'], " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut out: String = flat.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn push_padded(out: &mut String, value: &str, width: usize) {
    out.push_str(value);
    for _ in value.chars().count()..width {
        out.push(' ');
    }
}

pub fn render_text(rows: &RowSet) -> Vec<u8> {
    let clipped: Vec<Vec<String>> = rows
        .rows()
        .iter()
        .map(|r| r.cells.iter().map(|c| clip(c, MAX_TEXT_CELL_WIDTH)).collect())
        .collect();

    let mut widths: Vec<usize> = COLUMN_TITLES.iter().map(|t| t.len()).collect();
    for row in clipped.iter() {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for (title, w) in COLUMN_TITLES.iter().zip(widths.iter()) {
        push_padded(&mut out, title, *w);
        out.push_str("  ");
    }
    out.push_str("del\n");
    for (row, src) in clipped.iter().zip(rows.rows()) {
        for (cell, w) in row.iter().zip(widths.iter()) {
            push_padded(&mut out, cell, *w);
            out.push_str("  ");
        }
        if src.id.is_some() {
            out.push_str(DELETE_MARKER);
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }
    out.into_bytes()
}

pub fn render_json(rows: &RowSet) -> Vec<u8> {
    serde_json::to_vec_pretty(&build_rows(rows)).unwrap_or_else(|_| b"[]\n".to_vec())
}

pub fn render_html(rows: &RowSet, ctx: &PageContext) -> Vec<u8> {
    report::render_index_view(&build_rows(rows), ctx)
}

pub fn render(format: OutputFormat, rows: &RowSet, ctx: &PageContext) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(rows),
        OutputFormat::Json => render_json(rows),
        OutputFormat::Html => render_html(rows, ctx),
    }
}

/// Every field of one record, one per line, for the detail view.
pub fn render_record_text(record: &Record) -> Vec<u8> {
    let mut out = String::new();
    for (idx, value) in record.fields().iter().enumerate() {
        let label = if idx == 0 {
            "id".to_string()
        } else {
            (idx - 1).to_string()
        };
        out.push_str(&format!("{:>4} : {}\n", label, display_value(Some(value))));
    }
    out.into_bytes()
}

pub fn render_record_json(record: &Record) -> Vec<u8> {
    serde_json::to_vec_pretty(record.fields()).unwrap_or_else(|_| b"[]\n".to_vec())
}
