//! UI utilities for terminal output.

use crossterm::style::Stylize;
use natter_console_core::render::StatusClass;
use natter_console_core::ServiceState;
use std::io::Write;

/// Calculate display width of a string (accounting for wide chars like emoji).
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// Boxed title block, returned as text so the console can print it too.
pub fn header_block(title: &str) -> String {
    let inner_width: usize = 58;
    let total_padding = inner_width.saturating_sub(display_width(title));
    let left_pad = total_padding / 2;
    let right_pad = total_padding - left_pad;

    format!(
        "{}\n{}\n{}\n",
        format!("╔{}╗", "═".repeat(inner_width)).dark_cyan(),
        format!("║{}{}{}║", " ".repeat(left_pad), title, " ".repeat(right_pad)).dark_cyan(),
        format!("╚{}╝", "═".repeat(inner_width)).dark_cyan(),
    )
}

/// Print a section header with box drawing characters.
pub fn print_header(title: &str) {
    println!();
    println!("{}", header_block(title));
}

/// Small section title as text.
pub fn section_line(title: &str) -> String {
    format!(
        "  {} {}\n  {}",
        "▸".dark_cyan(),
        title.white().bold(),
        "─".repeat(50).dark_grey()
    )
}

/// Print a small section title.
pub fn success_line(msg: &str) -> String {
    format!("  {} {}", "✓".green(), msg)
}

pub fn error_line(msg: &str) -> String {
    format!("  {} {}", "✗".red(), msg)
}

pub fn warning_line(msg: &str) -> String {
    format!("  {} {}", "⚠".yellow(), msg)
}

pub fn info_line(msg: &str) -> String {
    format!("  {} {}", "ℹ".blue(), msg)
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{}", success_line(msg));
}

/// Print an error message.
pub fn print_error(msg: &str) {
    println!("{}", error_line(msg));
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    println!("{}", warning_line(msg));
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{}", info_line(msg));
}

pub fn kv_line(key: &str, value: &str) -> String {
    format!("  {:<14} {}", format!("{}:", key).dark_grey(), value)
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("{}", kv_line(key, value));
}

/// Colour a value by its status class.
pub fn paint_class(text: &str, class: StatusClass) -> String {
    match class {
        StatusClass::Success => text.green().to_string(),
        StatusClass::Danger => text.red().to_string(),
        StatusClass::Warning => text.yellow().to_string(),
        StatusClass::Neutral => text.dark_grey().to_string(),
    }
}

/// Print a key-value pair with a status-coloured value.
pub fn print_kv_colored(key: &str, value: &str, class: StatusClass) {
    println!("{}", kv_line(key, &paint_class(value, class)));
}

/// Print a spinner-style progress message (use \r to update).
pub fn print_progress(msg: &str) {
    print!("  {} {}...", "⏳".yellow(), msg);
    let _ = std::io::stdout().flush();
}

/// Clear the progress line and print success.
pub fn finish_progress_success(msg: &str) {
    println!("\r  {} {}                    ", "✓".green(), msg);
}

/// Clear the progress line and print error.
pub fn finish_progress_error(msg: &str) {
    println!("\r  {} {}                    ", "✗".red(), msg);
}

/// Format state with color.
pub fn format_state(state: ServiceState) -> String {
    match state {
        ServiceState::Running => "● Running".green().to_string(),
        ServiceState::Stopped => "○ Stopped".red().to_string(),
        ServiceState::Waiting => "◌ Waiting".yellow().to_string(),
    }
}

/// Table header as text.
pub fn table_header(columns: &[(&str, usize)]) -> String {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join(" ");
    let separator: String = columns
        .iter()
        .map(|(_, width)| "─".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    format!("  {}\n  {}", header.white().bold(), separator.dark_grey())
}

pub fn empty_line(msg: &str) -> String {
    format!("\n  {}\n", msg.dark_grey().italic())
}

/// Print an empty state message.
pub fn hint_line(msg: &str) -> String {
    format!("  {} {}", "💡".yellow(), msg.dark_grey())
}

/// Print a hint/tip message.
pub fn print_hint(msg: &str) {
    println!("{}", hint_line(msg));
}

/// Truncate on char boundaries, appending `...` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let keep = max.saturating_sub(3);
        format!("{}...", s.chars().take(keep).collect::<String>())
    } else {
        s.to_string()
    }
}
