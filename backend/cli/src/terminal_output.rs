//! Terminal output utilities: ANSI notes, key/value tables, stream writing,
//! and a plain-text rendering of the extraction panel.

use std::io::Write;

use photolens_client::{ExtractionView, SectionBody};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm'
            for next in chars.by_ref() {
                if next == 'm' { break; }
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Print a formatted SUCCESS note.
pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// Two aligned columns, keys padded to the widest one.
pub fn render_key_values(rows: &[(String, String)]) -> String {
    let width = rows.iter().map(|(k, _)| strip_ansi(k).chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in rows {
        let pad = width.saturating_sub(strip_ansi(key).chars().count());
        out.push_str(&format!("  {key}{}  {value}\n", " ".repeat(pad)));
    }
    out
}

/// Write chunks to a writer, flushing after each.
pub fn stream_write(writer: &mut impl Write, chunk: &[u8]) -> std::io::Result<()> {
    writer.write_all(chunk)?;
    writer.flush()
}

/// The extraction panel as indented plain text.
pub fn render_extraction(view: &ExtractionView, color: bool) -> String {
    let heading = |title: &str| {
        if color {
            format!("{BOLD}{title}{RESET}\n")
        } else {
            format!("{title}\n")
        }
    };

    match view {
        ExtractionView::Error(message) => format!("Error: {message}\n"),
        ExtractionView::Raw(raw) => format!("{raw}\n"),
        ExtractionView::Sections(sections) if sections.is_empty() => {
            if color {
                format!("{DIM}(no structured data){RESET}\n")
            } else {
                "(no structured data)\n".to_string()
            }
        }
        ExtractionView::Sections(sections) => {
            let mut out = String::new();
            for section in sections {
                out.push_str(&heading(section.title));
                match &section.body {
                    SectionBody::List(items) => {
                        for item in items {
                            out.push_str(&format!("  - {item}\n"));
                        }
                    }
                    SectionBody::Text(text) => out.push_str(&format!("  {text}\n")),
                    SectionBody::Swatches(colors) => out.push_str(&format!("  {}\n", colors.join(", "))),
                    SectionBody::Fields(fields) => {
                        let rows: Vec<(String, String)> =
                            fields.iter().map(|(k, v)| (format!("{k}:"), v.clone())).collect();
                        out.push_str(&render_key_values(&rows));
                    }
                }
            }
            out
        }
    }
}
