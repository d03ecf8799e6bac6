//! Terminal output helpers shared by the command handlers.
//!
//! Human output goes to stdout with light styling; `--json` handlers print a
//! single JSON document instead via [`json_output`]. Errors always go to
//! stderr.

use std::fmt::Display;

use owo_colors::OwoColorize;

/// Print the application header with name and version.
pub fn header(version: &str) {
    println!("{} {}", "marketsync".bold(), version.dimmed());
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

/// Print an aligned `label value` line.
pub fn field(label: &str, value: impl Display) {
    println!("  {:<14} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("  {} {}", "!".yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("  {} {}", "×".red(), message);
}

pub fn note(message: &str) {
    println!("  {}", message.dimmed());
}

/// Print pre-rendered multi-line content (tables) with the standard indent.
pub fn lines(content: &str) {
    for line in content.lines() {
        println!("  {line}");
    }
}

pub fn json_output(value: serde_json::Value) {
    println!("{value}");
}
