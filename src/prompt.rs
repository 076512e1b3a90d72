//! Prompt construction for the summarization request.

/// Instruction template; `{log}` is replaced with the log slice.
const PROMPT_TEMPLATE: &str = include_str!("prompt.txt");

/// Embed a log slice verbatim into the instruction template. The slice is
/// not trimmed, truncated, or reflowed here: the model sees exactly what
/// the log reader handed over.
pub fn build_prompt(log_slice: &str) -> String {
    PROMPT_TEMPLATE.replace("{log}", log_slice)
}
