//! Terminal rendering of summaries, notices, and pipeline failures.

use colored::Colorize;
use std::path::Path;

use crate::provider::{ErrorSummary, SummarizeError};

pub fn format_error(message: &str, tip: Option<&str>) -> String {
    let mut output = format!("{} {}", "Error:".red().bold(), message);
    if let Some(tip) = tip {
        output.push('\n');
        output.push_str(&format!("{} {}", "Tip:".blue().bold(), tip));
    }
    output
}

/// One `- ` bulleted line per suggestion, in order. Stripping the marker
/// recovers the original list.
pub fn fix_bullets(fix: &[String]) -> Vec<String> {
    fix.iter().map(|item| format!("- {item}")).collect()
}

/// Render a validated summary: the error sentence under its label, then
/// the bulleted fix list.
pub fn print_summary(summary: &ErrorSummary) {
    let width = textwrap::termwidth().min(100);

    println!();
    println!("{} {}", "▸".red(), "Error".red().bold());
    for line in textwrap::wrap(&summary.error, width.saturating_sub(2)) {
        println!("  {}", line.white().bold());
    }

    if !summary.fix.is_empty() {
        println!();
        println!("{} {}", "▸".green(), "Fix".green().bold());
        for bullet in fix_bullets(&summary.fix) {
            println!("  {bullet}");
        }
    }
    println!();
}

/// Informational notice: an empty log is not an error.
pub fn print_empty_log() {
    println!();
    println!(
        "{} {}",
        "○".blue(),
        "Log file is empty, nothing to summarize.".dimmed()
    );
    println!();
}

/// Render a pipeline failure, naming the kind. Never terminates the host.
pub fn print_failure(err: &SummarizeError) {
    let kind = match err {
        SummarizeError::MissingApiKey { .. } => "Configuration error",
        SummarizeError::Transport { .. } => "Transport failure",
        SummarizeError::Parse { .. } => "Parse failure",
        SummarizeError::Validation { .. } => "Validation failure",
    };
    eprintln!();
    eprintln!("{} {err}", format!("{kind}:").red().bold());
    eprintln!();
}

pub fn print_log_read_failure(path: &Path, err: &std::io::Error) {
    eprintln!();
    eprintln!(
        "{} failed to read log file {}: {err}",
        "Error:".red().bold(),
        path.display()
    );
    eprintln!();
}

pub fn print_error_detected() {
    eprintln!();
    eprintln!(
        "{} {}",
        "●".yellow(),
        "Error detected on stderr, summarizing log output...".yellow()
    );
}

pub fn print_summarizing(model: &str) {
    eprintln!("{}", format!("Requesting summary from {model}...").dimmed());
}

pub fn print_exited(code: Option<i32>) {
    eprintln!();
    match code {
        Some(code) => eprintln!(
            "{} Command exited with code {code} ({})",
            "●".blue(),
            interpret_exit_code(code)
        ),
        None => eprintln!("{} Command terminated by a signal", "●".blue()),
    }
}

pub fn print_spawn_failure(command: &str, err: &std::io::Error) {
    eprintln!();
    eprintln!(
        "{} failed to start `{command}`: {err}",
        "Error:".red().bold()
    );
}

/// Human-readable reading of a child exit code for the exit notice.
pub fn interpret_exit_code(code: i32) -> &'static str {
    match code {
        0 => "success",
        1 => "general error",
        2 => "shell misuse",
        126 => "not executable",
        127 => "command not found",
        130 => "interrupted",
        _ if code > 128 => "terminated by signal",
        _ => "application error",
    }
}
