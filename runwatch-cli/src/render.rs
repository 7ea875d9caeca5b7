//! Terminal rendering of poll results
//!
//! The result shape belongs to the server. Objects are printed one key per
//! line; string values that look like a run status are colorized.

use colored::*;
use runwatch_core::domain::poll::PollResult;
use serde_json::Value;

/// True for the placeholder published before the first successful poll
pub fn is_empty_result(result: &PollResult) -> bool {
    matches!(result, Value::Object(map) if map.is_empty())
}

/// Print a poll result
pub fn print_statuses(result: &PollResult) {
    match result {
        Value::Object(map) if map.is_empty() => {
            println!("{}", "No status reported.".yellow());
        }
        Value::Object(map) => {
            for (run, status) in map {
                println!("  {:<40} {}", run.bold(), render_value(status));
            }
        }
        other => println!("  {}", render_value(other)),
    }
}

fn render_value(value: &Value) -> ColoredString {
    match value {
        Value::String(status) => colorize_status(status),
        other => other.to_string().normal(),
    }
}

/// Colorize a status string for display
fn colorize_status(status: &str) -> ColoredString {
    match status.to_ascii_lowercase().as_str() {
        "passed" | "success" | "succeeded" => status.green(),
        "failed" | "error" | "aborted" => status.red(),
        "running" | "created" | "queued" => status.yellow(),
        _ => status.normal(),
    }
}
