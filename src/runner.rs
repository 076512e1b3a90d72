//! The run session: spawn the wrapped command, tee its output, and drive
//! the one-shot summarization pipeline.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::prompt::build_prompt;
use crate::provider::SummaryProvider;
use crate::report;
use crate::tee::{self, FanoutSink};
use crate::trigger::{ErrorTrigger, SummarizeLatch};

const CHUNK_SIZE: usize = 8192;

/// Options for one wrapped invocation.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Command string, executed through the shell
    pub command: String,
    /// Log file capturing interleaved stdout and stderr
    pub log_path: PathBuf,
    /// Trailing characters of the log included in the prompt
    pub tail_chars: usize,
    /// Trigger signature patterns
    pub patterns: Vec<String>,
    /// Suppress status messages
    pub quiet: bool,
}

/// State shared by the stderr and exit trigger paths: the pipeline inputs
/// plus the latch that makes the summarization one-shot.
struct Session {
    provider: Arc<dyn SummaryProvider>,
    log_path: PathBuf,
    tail_chars: usize,
    quiet: bool,
    latch: SummarizeLatch,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    fn new(provider: Arc<dyn SummaryProvider>, opts: &SessionOptions) -> Arc<Self> {
        Arc::new(Self {
            provider,
            log_path: opts.log_path.clone(),
            tail_chars: opts.tail_chars,
            quiet: opts.quiet,
            latch: SummarizeLatch::new(),
            pending: Mutex::new(None),
        })
    }

    /// Stderr-path trigger: claim the latch and run the pipeline on its own
    /// task so stream forwarding continues while the request is in flight.
    fn summarize_in_background(self: &Arc<Self>) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        if !self.latch.fire() {
            return;
        }
        if !self.quiet {
            report::print_error_detected();
        }
        let session = Arc::clone(self);
        *pending = Some(tokio::spawn(async move { session.run_pipeline().await }));
    }

    /// Exit-path trigger: claim the latch and run the pipeline inline, or
    /// wait out a pipeline the stderr path already started. Claiming and
    /// handle collection share one lock so a background run is never lost.
    async fn summarize_and_wait(self: &Arc<Self>) {
        enum Claim {
            Run,
            Wait(JoinHandle<()>),
            Done,
        }

        let claim = match self.pending.lock() {
            Ok(mut pending) => {
                if self.latch.fire() {
                    Claim::Run
                } else if let Some(handle) = pending.take() {
                    Claim::Wait(handle)
                } else {
                    Claim::Done
                }
            }
            Err(_) => Claim::Done,
        };

        match claim {
            Claim::Run => self.run_pipeline().await,
            Claim::Wait(handle) => {
                let _ = handle.await;
            }
            Claim::Done => {}
        }
    }

    /// Log slice, prompt, request, report. Every failure is converted to a
    /// terminal report here; nothing propagates past this boundary.
    async fn run_pipeline(&self) {
        match read_recent_log(&self.log_path, self.tail_chars) {
            Ok(Some(slice)) => {
                if !self.quiet {
                    report::print_summarizing(self.provider.model_name());
                }
                let prompt = build_prompt(&slice);
                match self.provider.summarize(&prompt).await {
                    Ok(summary) => report::print_summary(&summary),
                    Err(err) => report::print_failure(&err),
                }
            }
            Ok(None) => report::print_empty_log(),
            Err(err) => report::print_log_read_failure(&self.log_path, &err),
        }
    }
}

/// Read the trailing `max_chars` characters of the log file. `Ok(None)`
/// means the file is empty or whitespace-only: nothing to summarize.
pub fn read_recent_log(path: &Path, max_chars: usize) -> std::io::Result<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let total = content.chars().count();
    if total <= max_chars {
        return Ok(Some(content));
    }
    let skip = total - max_chars;
    let start = content
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    Ok(Some(content[start..].to_string()))
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run one wrapped invocation to completion: tee output, watch stderr for
/// signatures, and summarize at most once from either trigger path.
pub async fn run_session(opts: SessionOptions, provider: Arc<dyn SummaryProvider>) -> Result<()> {
    let log = tee::open_log_sink(&opts.log_path)?;

    let mut out_sink = FanoutSink::new();
    out_sink.push(std::io::stdout());
    out_sink.attach(Arc::clone(&log));

    let mut err_sink = FanoutSink::new();
    err_sink.push(std::io::stderr());
    err_sink.attach(log);

    let trigger = ErrorTrigger::new(&opts.patterns)?;
    let session = Session::new(provider, &opts);

    let mut child = match shell_command(&opts.command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            // Spawn failure still gets a summarization pass over whatever
            // the log holds (usually nothing).
            report::print_spawn_failure(&opts.command, &err);
            session.summarize_and_wait().await;
            return Ok(());
        }
    };

    let stdout = child.stdout.take().context("child stdout not captured")?;
    let stderr = child.stderr.take().context("child stderr not captured")?;

    let out_task = tokio::spawn(pump_stdout(stdout, out_sink));
    let err_task = tokio::spawn(pump_stderr(stderr, err_sink, trigger, Arc::clone(&session)));

    let status = child
        .wait()
        .await
        .with_context(|| format!("failed waiting for `{}`", opts.command))?;

    // Drain both pumps before reading the log so the slice sees the final
    // output in full.
    let _ = out_task.await;
    let _ = err_task.await;

    if !opts.quiet {
        report::print_exited(status.code());
    }
    session.summarize_and_wait().await;

    Ok(())
}

async fn pump_stdout(mut stream: tokio::process::ChildStdout, sink: FanoutSink) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                // A failing destination must not stop forwarding.
                let _ = sink.write_all(&buf[..n]);
            }
        }
    }
}

async fn pump_stderr(
    mut stream: tokio::process::ChildStderr,
    sink: FanoutSink,
    mut trigger: ErrorTrigger,
    session: Arc<Session>,
) {
    let mut decoder = encoding_rs::UTF_8.new_decoder();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = &buf[..n];
                let _ = sink.write_all(chunk);

                let capacity = decoder
                    .max_utf8_buffer_length(chunk.len())
                    .unwrap_or(chunk.len());
                let mut text = String::with_capacity(capacity);
                let _ = decoder.decode_to_string(chunk, &mut text, false);
                if trigger.push(&text) {
                    session.summarize_in_background();
                    trigger.reset();
                }
            }
        }
    }
}
