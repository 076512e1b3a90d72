use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use bugsum::cli::{print_completions, Cli};
use bugsum::config::{self, Config};
use bugsum::provider::openai::OpenAiProvider;
use bugsum::report::format_error;
use bugsum::runner::{run_session, SessionOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        print_completions(shell);
        return Ok(());
    }

    if cli.print_config {
        config::print_default_config();
        return Ok(());
    }

    config::load_env_file(Path::new(".env"));
    let mut config = Config::load();
    config.apply_env_overrides();

    let Some(command) = cli.cmd else {
        bail!(format_error(
            "No command provided. Usage: bugsum --cmd \"<command>\"",
            Some("Example: bugsum --cmd \"next dev\""),
        ));
    };

    let model = cli.model.unwrap_or(config.summary.model);
    let tail_chars = cli.tail_chars.unwrap_or(config.summary.tail_chars);

    let mut patterns = config.trigger.patterns;
    patterns.extend(cli.pattern);

    let provider = OpenAiProvider::from_env(model, config.summary.max_tokens);

    let opts = SessionOptions {
        command,
        log_path: cli.log,
        tail_chars,
        patterns,
        quiet: cli.quiet,
    };

    run_session(opts, Arc::new(provider)).await
}
