use std::io::Write;

use colored::*;
use lanscope_common::ResolvedClient;
use lanscope_core::CacheRecord;
use serde_json::Value;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;
use crate::terminal::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 80;

const TABLE_HEADER: &str =
    "IP Address      Hostname                     MAC                MAC Vendor";

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn blank() {
    print("");
}

pub fn banner() {
    let text_content: String = format!("⟦ LANSCOPE v{} ⟧", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.color(colors::PRIMARY).bold();
    let sep: ColoredString = "═"
        .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
        .color(colors::SEPARATOR);

    print(&format!("{sep}{text}{sep}"));
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {msg} ⟧");
    let msg_len: usize = UnicodeWidthStr::width(formatted.as_str());

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: String = format!(
        "{}{}{}",
        "─".repeat(left).color(colors::SEPARATOR),
        formatted.to_uppercase().color(colors::PRIMARY),
        "─".repeat(right).color(colors::SEPARATOR)
    );

    print(&line);
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

pub fn highlight<T: ToString>(value: T) -> ColoredString {
    value.to_string().color(colors::HIGHLIGHT).bold()
}

pub fn table_header() {
    print(&TABLE_HEADER.color(colors::PRIMARY).bold().to_string());
    print(&"─".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

pub fn client_row(client: &ResolvedClient) {
    let line = client.to_string();
    if client.has_unknowns() {
        print(&line.color(colors::UNRESOLVED).to_string());
    } else {
        print(&line.color(colors::TEXT_DEFAULT).to_string());
    }
}

pub fn tree_head(idx: usize, name: &str, note: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    print(&format!(
        "{} {} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY),
        note.color(colors::SEPARATOR)
    ));
}

pub fn as_tree_one_level(key_value_pair: &[(String, String)]) {
    let width = key_value_pair
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(0);

    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let branch: ColoredString = (if last { "└─" } else { "├─" }).color(colors::SEPARATOR);
        print(&format!(
            " {} {}{}{} {}",
            branch,
            key.color(colors::TEXT_DEFAULT),
            ".".repeat(width + 1 - key.len()).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value.color(colors::HIGHLIGHT)
        ));
    }
}

/// Flattens a payload into `(field, value)` rows. Nested values are shown as
/// compact JSON.
pub fn payload_details(payload: &Value) -> Vec<(String, String)> {
    match payload {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), scalar(value)))
            .collect(),
        other => vec![("value".to_string(), scalar(other))],
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

pub fn records(records: &[&CacheRecord]) {
    if records.is_empty() {
        print(&"  No matching cache entries.".color(colors::SEPARATOR).to_string());
        return;
    }

    for (idx, record) in records.iter().enumerate() {
        let updated = record.updated_at();
        tree_head(idx, &record.key, &updated);
        as_tree_one_level(&payload_details(&record.payload));
    }
}

pub fn help_screen() {
    const ROWS: &[(&str, &str)] = &[
        ("9.9.9.9 [b]", "Enter IP address, b will bypass the cache and do a fresh lookup."),
        ("c [9.9.9.9]", "Clear cache. If IP address supplied, only that entry is deleted."),
        ("f <str>", "Search for str in cache and list entries."),
        ("h", "This help screen."),
        ("l [9.9.9.9]", "List cache. If IP address supplied, only that entry is listed."),
        ("q", "Quit."),
    ];

    blank();
    print("This utility displays IP information. It also manages the IP information");
    print("cache that discovery runs write into.");
    blank();
    print(&format!("{:14} {}", "Input", "Description").color(colors::PRIMARY).bold().to_string());
    print(&format!("{} {}", "-".repeat(14), "-".repeat(64)).color(colors::SEPARATOR).to_string());
    for (input, description) in ROWS {
        print(&format!("{} {}", format!("{input:14}").color(colors::ACCENT), description));
    }
}

/// Writes `prompt` without a newline so input lands on the same line.
pub fn prompt(prompt: &str) -> std::io::Result<()> {
    let mut out = std::io::stdout();
    write!(out, "{}", prompt.color(colors::TEXT_DEFAULT))?;
    out.flush()
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{space}{msg}"));
}

pub fn no_results() {
    centerln(&"No clients found on the local network".red().bold().to_string());
}
