//! Command-line interface definitions for the `bugsum` tool.

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Wrap a dev command and summarize its errors with an LLM
#[derive(Parser, Debug)]
#[command(name = "bugsum", version, about, long_about = None)]
#[command(
    after_help = "EXAMPLES:\n    bugsum --cmd \"next dev\"\n    bugsum --cmd \"npm run build\" --log build.log\n    bugsum --cmd \"cargo run\" -m gpt-4o-mini --tail-chars 5000"
)]
pub struct Cli {
    /// Command to run (e.g. "next dev"), executed through the shell
    #[arg(long, value_name = "CMD")]
    pub cmd: Option<String>,

    /// Path to the log file capturing interleaved stdout and stderr
    #[arg(long, value_name = "PATH", default_value = ".bugsum/dev.log")]
    pub log: PathBuf,

    /// Model used for summarization (overrides config)
    #[arg(long, short = 'm', value_name = "MODEL")]
    pub model: Option<String>,

    /// Trailing characters of the log sent to the model (overrides config)
    #[arg(long, value_name = "N")]
    pub tail_chars: Option<usize>,

    /// Additional regex pattern that triggers summarization (repeatable)
    #[arg(long, value_name = "REGEX")]
    pub pattern: Vec<String>,

    /// Suppress status messages (child output is still forwarded)
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Generate shell completions
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "bugsum", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "next dev"]);
        assert_eq!(cli.cmd.as_deref(), Some("next dev"));
        assert!(!cli.quiet);
    }

    #[test]
    fn log_path_has_a_default() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "next dev"]);
        assert_eq!(cli.log, PathBuf::from(".bugsum/dev.log"));
    }

    #[test]
    fn log_path_is_overridable() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "x", "--log", "/tmp/build.log"]);
        assert_eq!(cli.log, PathBuf::from("/tmp/build.log"));
    }

    #[test]
    fn parses_model_short_flag() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "x", "-m", "gpt-4o-mini"]);
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn parses_tail_chars() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "x", "--tail-chars", "5000"]);
        assert_eq!(cli.tail_chars, Some(5000));
    }

    #[test]
    fn collects_repeated_patterns() {
        let cli = Cli::parse_from([
            "bugsum",
            "--cmd",
            "x",
            "--pattern",
            "panicked at",
            "--pattern",
            "FATAL",
        ]);
        assert_eq!(cli.pattern, vec!["panicked at", "FATAL"]);
    }

    #[test]
    fn parses_quiet_flag() {
        let cli = Cli::parse_from(["bugsum", "--cmd", "x", "-q"]);
        assert!(cli.quiet);
    }

    #[test]
    fn parses_completions() {
        let cli = Cli::parse_from(["bugsum", "--completions", "bash"]);
        assert_eq!(cli.completions, Some(Shell::Bash));
        assert!(cli.cmd.is_none());
    }

    #[test]
    fn parses_print_config() {
        let cli = Cli::parse_from(["bugsum", "--print-config"]);
        assert!(cli.print_config);
    }
}
