//! Progress-reporting interface.
//!
//! Library code never prints. It reports leveled messages, sections, spinners
//! and progress through a [`Reporter`] handed in by the caller. The CLI plugs
//! in a terminal implementation; [`TracingReporter`] suits embedders that only
//! want structured logs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of a reported message. Domain levels only change presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Neutral information.
    Info,
    /// A step completed.
    Success,
    /// Something was skipped or degraded; execution continues.
    Warning,
    /// Something failed.
    Error,
    /// A download-related message.
    Download,
    /// An extraction-related message.
    Extract,
    /// A container-runtime message.
    Docker,
    /// An application-level message.
    Odoo,
}

/// What a progress bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Transferred bytes.
    Bytes,
    /// Processed items.
    Items,
}

/// A running spinner. Must be finished before the next result is reported.
pub trait Task {
    /// Stops the spinner and optionally prints a closing message.
    fn finish(self: Box<Self>, ok: bool, message: Option<&str>);
}

/// A running progress bar.
pub trait Progress {
    /// Advances the bar by `delta` units.
    fn advance(&self, delta: u64);
    /// Completes the bar.
    fn finish(self: Box<Self>);
}

/// Sink for user-facing progress information.
pub trait Reporter {
    /// Reports a single message.
    fn message(&self, level: Level, text: &str);

    /// Opens a titled section.
    fn section(&self, title: &str);

    /// Starts a spinner labelled `text`.
    fn spinner(&self, text: &str) -> Box<dyn Task>;

    /// Starts a progress bar. `total` is `None` when the size is unknown.
    fn progress(&self, label: &str, total: Option<u64>, unit: Unit) -> Box<dyn Progress>;

    /// Shorthand for [`Level::Info`].
    fn info(&self, text: &str) {
        self.message(Level::Info, text);
    }

    /// Shorthand for [`Level::Success`].
    fn success(&self, text: &str) {
        self.message(Level::Success, text);
    }

    /// Shorthand for [`Level::Warning`].
    fn warning(&self, text: &str) {
        self.message(Level::Warning, text);
    }

    /// Shorthand for [`Level::Error`].
    fn error(&self, text: &str) {
        self.message(Level::Error, text);
    }
}

/// Reporter forwarding everything to `tracing`, for callers without a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn message(&self, level: Level, text: &str) {
        match level {
            Level::Warning => tracing::warn!(message = text),
            Level::Error => tracing::error!(message = text),
            _ => tracing::info!(?level, message = text),
        }
    }

    fn section(&self, title: &str) {
        tracing::info!(section = title);
    }

    fn spinner(&self, text: &str) -> Box<dyn Task> {
        tracing::debug!(task = text, "started");
        Box::new(TracingTask {
            label: text.to_string(),
        })
    }

    fn progress(&self, label: &str, total: Option<u64>, unit: Unit) -> Box<dyn Progress> {
        tracing::debug!(label, ?total, ?unit, "progress started");
        Box::new(TracingProgress {
            label: label.to_string(),
            done: AtomicU64::new(0),
        })
    }
}

struct TracingTask {
    label: String,
}

impl Task for TracingTask {
    fn finish(self: Box<Self>, ok: bool, message: Option<&str>) {
        let message = message.unwrap_or_default();
        if ok {
            tracing::info!(task = %self.label, detail = message, "done");
        } else {
            tracing::warn!(task = %self.label, detail = message, "failed");
        }
    }
}

struct TracingProgress {
    label: String,
    done: AtomicU64,
}

impl Progress for TracingProgress {
    fn advance(&self, delta: u64) {
        let _ = self.done.fetch_add(delta, Ordering::Relaxed);
    }

    fn finish(self: Box<Self>) {
        tracing::debug!(label = %self.label, done = self.done.load(Ordering::Relaxed), "progress finished");
    }
}

/// Reporter that keeps every message in memory.
///
/// Used when embedding the generator and by tests asserting on warnings.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded message.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the texts recorded at `level`.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text)
            .collect()
    }

    fn push(&self, level: Level, text: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((level, text.to_string()));
        }
    }
}

impl Reporter for MemoryReporter {
    fn message(&self, level: Level, text: &str) {
        self.push(level, text);
    }

    fn section(&self, title: &str) {
        self.push(Level::Info, title);
    }

    fn spinner(&self, _text: &str) -> Box<dyn Task> {
        Box::new(NoopHandle)
    }

    fn progress(&self, _label: &str, _total: Option<u64>, _unit: Unit) -> Box<dyn Progress> {
        Box::new(NoopHandle)
    }
}

struct NoopHandle;

impl Task for NoopHandle {
    fn finish(self: Box<Self>, _ok: bool, _message: Option<&str>) {}
}

impl Progress for NoopHandle {
    fn advance(&self, _delta: u64) {}

    fn finish(self: Box<Self>) {}
}
