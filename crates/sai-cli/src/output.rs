//! Result/error formatting (spec §6 "--json", §7 "User-visible behaviour"):
//! human mode prints colored, readable text to stdout (errors to stderr);
//! JSON mode writes one machine-readable object to stdout. Fixed against
//! this spec's two result shapes (`ActionResult`/`SaiError`) rather than
//! a generic renderer trait, since every sai command produces one of the
//! two.

use colored::Colorize;
use sai_core::{ActionResult, SaiError};
use serde::Serialize;

#[derive(Serialize)]
struct JsonError<'a> {
    error: &'a str,
    #[serde(rename = "type")]
    kind: String,
    suggestions: &'a [String],
    context: &'a [(String, String)],
}

pub fn emit_result(result: &ActionResult, json: bool, show_commands: bool, show_exit_codes: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(body) => println!("{body}"),
            Err(e) => eprintln!("failed to serialize result: {e}"),
        }
        return;
    }

    let header = format!("{} {} via {}", result.action, result.software, result.provider);
    if result.success {
        println!("{} {}", "[OK]".green().bold(), header);
    } else {
        println!("{} {}", "[FAIL]".red().bold(), header);
    }

    if show_commands {
        for command in &result.commands {
            println!("  {} {}", "$".dimmed(), command.dimmed());
        }
    }

    if !result.output.trim().is_empty() {
        println!("{}", result.output.trim_end());
    }

    if let Some(error) = &result.error {
        println!("{} {}", "error:".red(), error);
    }

    if let Some(strategy) = &result.recovered_via {
        println!("{} recovered via {}", "note:".yellow(), strategy);
    }

    if show_exit_codes {
        println!("exit code: {}", result.exit_code);
    }

    println!("{:.2?}", result.duration);
}

pub fn emit_error(error: &SaiError, json: bool) {
    if json {
        let payload = JsonError {
            error: &error.message,
            kind: error.kind.to_string(),
            suggestions: &error.suggestions,
            context: &error.context,
        };
        match serde_json::to_string(&payload) {
            Ok(body) => println!("{body}"),
            Err(e) => eprintln!("failed to serialize error: {e}"),
        }
        return;
    }

    eprintln!("{} {}: {}", "[ERROR]".red().bold(), error.kind, error.message);
    for (key, value) in &error.context {
        eprintln!("  {key}: {value}");
    }
    for suggestion in &error.suggestions {
        eprintln!("  {} {}", "hint:".yellow(), suggestion);
    }
}
