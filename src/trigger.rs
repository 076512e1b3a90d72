//! Error detection on the stderr stream and the one-shot summarization latch.

use anyhow::{Context, Result};
use regex::RegexSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Signature patterns whose appearance on stderr indicates an error burst.
/// The active set is configurable; these are the defaults.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "ReferenceError",
    "TypeError",
    "SyntaxError",
    "Unhandled",
    "Exception",
    "Error:",
];

/// Accumulator cap. Error text routinely spans several stream writes, so
/// matching runs against accumulated text rather than single chunks; the
/// trailing window is plenty to catch any signature.
const MAX_BUFFER_BYTES: usize = 8 * 1024;

/// Accumulates stderr text and matches it against signature patterns.
/// The caller resets the accumulator after a fire so one stack trace
/// produces one fire, while a later burst in the same run can still match.
pub struct ErrorTrigger {
    buffer: String,
    patterns: RegexSet,
}

impl ErrorTrigger {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = RegexSet::new(patterns).context("invalid trigger pattern")?;
        Ok(Self {
            buffer: String::new(),
            patterns,
        })
    }

    /// Append a decoded stderr chunk. Returns true when the accumulated
    /// text now matches a signature.
    pub fn push(&mut self, chunk: &str) -> bool {
        self.buffer.push_str(chunk);
        self.trim_front();
        self.patterns.is_match(&self.buffer)
    }

    /// Empty the accumulator after a fire.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn trim_front(&mut self) {
        if self.buffer.len() <= MAX_BUFFER_BYTES {
            return;
        }
        let mut cut = self.buffer.len() - MAX_BUFFER_BYTES;
        while !self.buffer.is_char_boundary(cut) {
            cut += 1;
        }
        self.buffer.drain(..cut);
    }
}

/// One-shot gate shared by the stderr and exit trigger paths: at most one
/// summarization per session, no matter how many sources fire or how they
/// interleave. The flag stays set even when the pipeline fails.
#[derive(Debug, Default)]
pub struct SummarizeLatch(AtomicBool);

impl SummarizeLatch {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Atomically claim the single summarization slot. True for the first
    /// caller, false forever after.
    pub fn fire(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn default_trigger() -> ErrorTrigger {
        let patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect();
        ErrorTrigger::new(&patterns).unwrap()
    }

    #[test]
    fn fires_on_each_default_signature() {
        for signature in DEFAULT_PATTERNS {
            let mut trigger = default_trigger();
            assert!(
                trigger.push(&format!("some output then {signature} boom")),
                "{signature} should fire"
            );
        }
    }

    #[test]
    fn stays_quiet_on_clean_output() {
        let mut trigger = default_trigger();
        assert!(!trigger.push("compiled client and server successfully\n"));
        assert!(!trigger.push("ready on http://localhost:3000\n"));
        assert!(!trigger.push("GET / 200 in 12ms\n"));
    }

    #[test]
    fn matches_signature_split_across_chunks() {
        let mut trigger = default_trigger();
        assert!(!trigger.push("Type"));
        assert!(trigger.push("Error: Cannot read properties of undefined"));
    }

    #[test]
    fn reset_allows_detecting_a_later_burst() {
        let mut trigger = default_trigger();
        assert!(trigger.push("TypeError: boom\n"));
        trigger.reset();
        assert!(!trigger.push("recompiling...\n"));
        assert!(trigger.push("SyntaxError: unexpected token\n"));
    }

    #[test]
    fn without_reset_the_same_burst_keeps_matching() {
        let mut trigger = default_trigger();
        assert!(trigger.push("TypeError: boom\n"));
        assert!(trigger.push("    at Object.<anonymous>\n"));
    }

    #[test]
    fn accumulator_is_bounded() {
        let mut trigger = default_trigger();
        for _ in 0..100 {
            trigger.push(&"x".repeat(1024));
        }
        assert!(trigger.buffer.len() <= MAX_BUFFER_BYTES);
    }

    #[test]
    fn bounded_trim_respects_char_boundaries() {
        let mut trigger = default_trigger();
        trigger.push(&"é".repeat(MAX_BUFFER_BYTES));
        trigger.push("tail");
        assert!(trigger.buffer.ends_with("tail"));
    }

    #[test]
    fn custom_patterns_extend_detection() {
        let mut patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect();
        patterns.push("panicked at".to_string());
        let mut trigger = ErrorTrigger::new(&patterns).unwrap();
        assert!(trigger.push("thread 'main' panicked at src/main.rs:4:5"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(ErrorTrigger::new(&["[unclosed".to_string()]).is_err());
    }

    #[test]
    fn latch_fires_exactly_once() {
        let latch = SummarizeLatch::new();
        assert!(!latch.fired());
        assert!(latch.fire());
        assert!(latch.fired());
        assert!(!latch.fire());
        assert!(!latch.fire());
    }

    #[test]
    fn latch_fires_once_across_threads() {
        let latch = Arc::new(SummarizeLatch::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let latch = Arc::clone(&latch);
                std::thread::spawn(move || latch.fire())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|claimed| *claimed)
            .count();
        assert_eq!(wins, 1);
    }
}
