//! Aggregate run log
//!
//! Every line produced during a run passes through [`RunLog::push`], which
//! redacts registered secrets before the line is stored, traced or handed to
//! a live [`LogSink`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

const REDACTED: &str = "********";

/// Live observer of a run's log lines.
///
/// Lines arrive already redacted and in the same order as they are stored.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn line(&self, line: &str);
}

#[async_trait]
impl LogSink for mpsc::Sender<String> {
    async fn line(&self, line: &str) {
        // 受信側が閉じていてもパイプラインは止めない
        let _ = self.send(line.to_string()).await;
    }
}

#[async_trait]
impl LogSink for mpsc::UnboundedSender<String> {
    async fn line(&self, line: &str) {
        let _ = self.send(line.to_string());
    }
}

/// Append-only log of one pipeline run.
pub struct RunLog {
    lines: Vec<String>,
    secrets: Vec<String>,
    sink: Option<Arc<dyn LogSink>>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RunLog {
    pub fn new(sink: Option<Arc<dyn LogSink>>) -> Self {
        Self {
            lines: Vec::new(),
            secrets: Vec::new(),
            sink,
        }
    }

    /// Registers a value that must never appear in the log.
    pub fn add_secret(&mut self, secret: &str) {
        if !secret.is_empty() && !self.secrets.iter().any(|s| s == secret) {
            self.secrets.push(secret.to_string());
            // 長いものから置換して部分一致の取りこぼしを防ぐ
            self.secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        }
    }

    /// Replaces every registered secret in `text`.
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for secret in &self.secrets {
            if redacted.contains(secret.as_str()) {
                redacted = redacted.replace(secret.as_str(), REDACTED);
            }
        }
        redacted
    }

    /// Appends a line, splitting embedded newlines into separate entries.
    pub async fn push(&mut self, line: impl AsRef<str>) {
        let redacted = self.redact(line.as_ref());
        for part in redacted.split('\n') {
            let part = part.trim_end_matches('\r');
            tracing::trace!(target: "dockhand::run", "{}", part);
            if let Some(sink) = &self.sink {
                sink.line(part).await;
            }
            self.lines.push(part.to_string());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines appended since index `start`.
    pub fn since(&self, start: usize) -> &[String] {
        self.lines.get(start..).unwrap_or_default()
    }

    /// Last `n` lines appended since index `start`.
    pub fn tail_since(&self, start: usize, n: usize) -> Vec<String> {
        let lines = self.since(start);
        lines[lines.len().saturating_sub(n)..].to_vec()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_redacts_secrets() {
        let mut log = RunLog::default();
        log.add_secret("ghp_abc123");
        log.push("login with ghp_abc123 ok").await;
        assert_eq!(log.lines(), ["login with ******** ok"]);
    }

    #[tokio::test]
    async fn test_overlapping_secrets_longest_first() {
        let mut log = RunLog::default();
        log.add_secret("abc");
        log.add_secret("abcdef");
        log.push("token=abcdef").await;
        assert_eq!(log.lines(), ["token=********"]);
    }

    #[tokio::test]
    async fn test_empty_secret_ignored() {
        let mut log = RunLog::default();
        log.add_secret("");
        log.push("nothing to hide").await;
        assert_eq!(log.lines(), ["nothing to hide"]);
    }

    #[tokio::test]
    async fn test_multiline_push_is_split() {
        let mut log = RunLog::default();
        log.push("one\r\ntwo\nthree").await;
        assert_eq!(log.lines(), ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_sink_receives_redacted_lines_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut log = RunLog::new(Some(Arc::new(tx)));
        log.add_secret("hunter2");
        log.push("first").await;
        log.push("second hunter2").await;

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second ********");
    }

    #[tokio::test]
    async fn test_tail_since() {
        let mut log = RunLog::default();
        for i in 0..5 {
            log.push(format!("line {i}")).await;
        }
        assert_eq!(log.tail_since(1, 2), ["line 3", "line 4"]);
        assert_eq!(log.tail_since(3, 10), ["line 3", "line 4"]);
        assert!(log.tail_since(9, 3).is_empty());
        assert_eq!(log.since(4), ["line 4"]);
    }
}
