//! Output formatting utilities for the CLI.

use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Print a value as pretty JSON. Text output is handled by the caller.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet || format != OutputFormat::Json {
        return;
    }

    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message.
pub fn success(msg: &str, format: OutputFormat, quiet: bool) {
    if quiet || format != OutputFormat::Text {
        return;
    }
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a warning message to stderr.
pub fn warning(msg: &str, format: OutputFormat, quiet: bool) {
    if quiet || format != OutputFormat::Text {
        return;
    }
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Colored `n/5` rendering of a printability score.
pub fn score(score: u8) -> String {
    let text = format!("{}/5", score);
    match score {
        5 => text.green().bold().to_string(),
        3 | 4 => text.yellow().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}
