//! Terminal output: ANSI styling, notes, tables, and turn rendering.

use parley_core::{HistoryEntry, ToolDescriptor, NO_TOOL};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM")
            .map(|t| t != "dumb")
            .unwrap_or(false)
}

/// Wrap `text` in `style` when color is on.
pub fn paint(style: &str, text: &str) -> String {
    if supports_color() {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// Render left-aligned columns with a bold header and a dashed rule.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(strip_ansi(cell).chars().count());
        }
    }

    let line = |cells: Vec<String>| format!("  {}\n", cells.join("  ").trim_end());
    let pad = |cell: &str, width: usize| {
        let visible = strip_ansi(cell).chars().count();
        format!("{cell}{}", " ".repeat(width.saturating_sub(visible)))
    };

    let mut out = String::new();
    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    out.push_str(&paint(BOLD, &line(header)));
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        let cells = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(row.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect();
        out.push_str(&line(cells));
    }
    out
}

/// The tool label shown under a reply.
pub fn tool_label(tool_used: &str) -> String {
    if tool_used == NO_TOOL {
        paint(DIM, "(answered directly)")
    } else {
        paint(MAGENTA, &format!("[tool: {tool_used}]"))
    }
}

/// One history entry as a short transcript block.
pub fn render_entry(entry: &HistoryEntry) -> String {
    format!(
        "{} {}\n  {} {}\n  {} {}\n",
        paint(DIM, &entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        tool_label(&entry.tool_used),
        paint(CYAN, "you:"),
        entry.user,
        paint(GREEN, "bot:"),
        entry.assistant,
    )
}

pub fn render_tools(tools: &[ToolDescriptor]) -> String {
    let rows: Vec<Vec<String>> = tools
        .iter()
        .map(|t| {
            let params: Vec<String> = t
                .parameters
                .iter()
                .map(|p| {
                    if p.required {
                        p.name.clone()
                    } else {
                        format!("{}?", p.name)
                    }
                })
                .collect();
            vec![t.name.clone(), params.join(", "), t.description.clone()]
        })
        .collect();
    render_table(&["TOOL", "PARAMS", "DESCRIPTION"], &rows)
}
