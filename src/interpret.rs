//! Log stream interpretation.
//!
//! The downloader emits loosely structured text on stdout/stderr. This
//! module treats that text as an untrusted event stream and recovers three
//! structured events from it: item started, item completed, and batch
//! completed. The interpreter is a pure state machine (line in, events
//! out) so it is unit-testable without spawning a process.
//!
//! Alongside the events it maintains the transcript buffer: every raw line
//! since the current item started (or since the last success), in order.
//! The transcript is what lands in the audit log when an item is evicted,
//! so it is deliberately never reset on failure.

use crate::config::MonitorConfig;
use crate::error::{Result, ShepherdError};
use regex::Regex;

/// Progress line shape: `(a/b) [===] :: Finished:`. A completion fires
/// only when the two captured integers are equal and strictly positive.
const PROGRESS_PATTERN: &str = r"\((\d+)/(\d+)\)\s*\[=*\]\s*::\s*Finished:";

/// A structured event recovered from one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// The downloader started working on an item
    ItemStarted(String),
    /// The current item finished downloading successfully
    ItemCompleted(String),
    /// The whole batch is done; the stream is terminal after this
    BatchCompleted,
}

/// Line-oriented interpreter for one downloader run.
///
/// Feed it lines in arrival order via [`observe`](Self::observe). State is
/// scoped to a single run of the child process; the supervisor creates a
/// fresh interpreter per run.
#[derive(Debug)]
pub struct LogInterpreter {
    progress: Regex,
    start_marker: String,
    success_marker: String,
    current: Option<String>,
    transcript: Vec<String>,
    finished: bool,
}

impl LogInterpreter {
    /// Create an interpreter using the configured marker strings.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let progress = Regex::new(PROGRESS_PATTERN)
            .map_err(|e| ShepherdError::config(format!("invalid progress pattern: {e}")))?;
        Ok(Self {
            progress,
            start_marker: config.start_marker.clone(),
            success_marker: config.success_marker.clone(),
            current: None,
            transcript: Vec::new(),
            finished: false,
        })
    }

    /// Process the next raw output line and return the events it carries.
    ///
    /// Every line is appended to the transcript unless an item-start or
    /// item-success just reset it. A second item-start before a completion
    /// overwrites the current item and discards the prior transcript: the
    /// downloader processes items strictly sequentially.
    pub fn observe(&mut self, line: &str) -> Vec<LogEvent> {
        if self.finished {
            return Vec::new();
        }

        let mut events = Vec::new();
        self.transcript.push(line.to_string());

        if let Some(idx) = line.find(&self.start_marker) {
            let rest = &line[idx + self.start_marker.len()..];
            if let Some(id) = rest.split_whitespace().next() {
                self.current = Some(id.to_string());
                self.transcript.clear();
                self.transcript.push(line.to_string());
                events.push(LogEvent::ItemStarted(id.to_string()));
            }
        }

        if let Some(caps) = self.progress.captures(line) {
            let done: u64 = caps[1].parse().unwrap_or(0);
            let total: u64 = caps[2].parse().unwrap_or(0);
            // (0/0) must not count as a completion
            if done > 0 && done == total {
                if let Some(id) = self.current.take() {
                    self.transcript.clear();
                    events.push(LogEvent::ItemCompleted(id));
                }
            }
        }

        if line.contains(&self.success_marker) {
            self.finished = true;
            events.push(LogEvent::BatchCompleted);
        }

        events
    }

    /// Item currently in flight, if any
    pub fn current_item(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Raw lines since the last reset point, in order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Transcript joined into one newline-separated block
    pub fn transcript_text(&self) -> String {
        self.transcript.join("\n")
    }

    /// Whether the batch-complete marker has been seen
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> LogInterpreter {
        LogInterpreter::new(&MonitorConfig::default()).unwrap()
    }

    #[test]
    fn test_item_start_sets_current_and_resets_transcript() {
        let mut interp = interpreter();
        interp.observe("some preamble");
        let events = interp.observe("--> Downloading: https://example.com/a extra tokens");

        assert_eq!(
            events,
            vec![LogEvent::ItemStarted("https://example.com/a".to_string())]
        );
        assert_eq!(interp.current_item(), Some("https://example.com/a"));
        // Transcript holds only the start line, not the preamble
        assert_eq!(interp.transcript().len(), 1);
        assert!(interp.transcript()[0].contains("--> Downloading:"));
    }

    #[test]
    fn test_start_marker_without_id_is_ignored() {
        let mut interp = interpreter();
        let events = interp.observe("--> Downloading:");
        assert!(events.is_empty());
        assert_eq!(interp.current_item(), None);
    }

    #[test]
    fn test_completion_fires_only_when_counts_match() {
        let mut interp = interpreter();
        interp.observe("--> Downloading: A");

        assert!(interp.observe("(3/5) [===] :: Finished: A").is_empty());
        assert_eq!(interp.current_item(), Some("A"));

        let events = interp.observe("(4/4) [====] :: Finished: A");
        assert_eq!(events, vec![LogEvent::ItemCompleted("A".to_string())]);
        assert_eq!(interp.current_item(), None);
        assert!(interp.transcript().is_empty());
    }

    #[test]
    fn test_zero_over_zero_does_not_complete() {
        let mut interp = interpreter();
        interp.observe("--> Downloading: A");
        let events = interp.observe("(0/0) [] :: Finished:");
        assert!(events.is_empty());
        assert_eq!(interp.current_item(), Some("A"));
    }

    #[test]
    fn test_completion_without_current_item_is_ignored() {
        let mut interp = interpreter();
        let events = interp.observe("(2/2) [==] :: Finished: A");
        assert!(events.is_empty());
        // Line still lands in the transcript
        assert_eq!(interp.transcript().len(), 1);
    }

    #[test]
    fn test_transcript_accumulates_between_resets() {
        let mut interp = interpreter();
        interp.observe("--> Downloading: A");
        interp.observe("fetching chunk 1");
        interp.observe("fetching chunk 2");

        assert_eq!(
            interp.transcript(),
            &[
                "--> Downloading: A".to_string(),
                "fetching chunk 1".to_string(),
                "fetching chunk 2".to_string(),
            ]
        );
        assert_eq!(
            interp.transcript_text(),
            "--> Downloading: A\nfetching chunk 1\nfetching chunk 2"
        );
    }

    #[test]
    fn test_second_start_overwrites_current() {
        let mut interp = interpreter();
        interp.observe("--> Downloading: A");
        interp.observe("stalled output");
        interp.observe("--> Downloading: B");

        assert_eq!(interp.current_item(), Some("B"));
        assert_eq!(interp.transcript().len(), 1);
    }

    #[test]
    fn test_batch_complete_is_terminal() {
        let mut interp = interpreter();
        let events = interp.observe("--> All downloads finished.");
        assert_eq!(events, vec![LogEvent::BatchCompleted]);
        assert!(interp.is_finished());

        // Lines after the marker are not interpreted
        assert!(interp.observe("--> Downloading: C").is_empty());
        assert_eq!(interp.current_item(), None);
    }

    #[test]
    fn test_failure_keeps_transcript() {
        let mut interp = interpreter();
        interp.observe("--> Downloading: A");
        interp.observe("error: connection reset");
        // No completion, no reset: the crash context is preserved
        assert_eq!(interp.transcript().len(), 2);
        assert!(interp.transcript_text().contains("connection reset"));
    }

    #[test]
    fn test_custom_markers() {
        let config = MonitorConfig {
            start_marker: ">>> GET".to_string(),
            success_marker: ">>> DONE".to_string(),
            ..Default::default()
        };
        let mut interp = LogInterpreter::new(&config).unwrap();

        let events = interp.observe(">>> GET item-7");
        assert_eq!(events, vec![LogEvent::ItemStarted("item-7".to_string())]);

        let events = interp.observe(">>> DONE");
        assert_eq!(events, vec![LogEvent::BatchCompleted]);
    }
}
