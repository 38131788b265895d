//! Terminal output for the CLI.
//!
//! [`TerminalReporter`] renders library progress with colored status
//! symbols, indicatif spinners and progress bars. Everything goes to stderr.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use odoogen_common::report::{Level, Progress, Reporter, Task, Unit};

const TICK: Duration = Duration::from_millis(100);

/// Reporter writing colored lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter;

impl TerminalReporter {
    /// Creates a terminal reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Symbol and styled text for a message line.
fn decorate(level: Level, text: &str) -> String {
    match level {
        Level::Info => format!("{} {text}", "ℹ".blue()),
        Level::Success => format!("{} {}", "✓".green(), text.green()),
        Level::Warning => format!("{} {}", "⚠".yellow(), text.yellow()),
        Level::Error => format!("{} {}", "✗".red(), text.red()),
        Level::Download => format!("{} {text}", "↓".cyan()),
        Level::Extract => format!("{} {text}", "📦".cyan()),
        Level::Docker => format!("{} {text}", "🐳".blue()),
        Level::Odoo => format!("{} {text}", "●".magenta()),
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl Reporter for TerminalReporter {
    #[allow(clippy::print_stderr)]
    fn message(&self, level: Level, text: &str) {
        eprintln!("  {}", decorate(level, text));
    }

    #[allow(clippy::print_stderr)]
    fn section(&self, title: &str) {
        eprintln!();
        eprintln!("  {}", title.bold());
    }

    fn spinner(&self, text: &str) -> Box<dyn Task> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(style("  {spinner:.green} {msg}"));
        bar.set_message(text.to_string());
        bar.enable_steady_tick(TICK);
        Box::new(SpinnerTask {
            bar,
            label: text.to_string(),
        })
    }

    fn progress(&self, label: &str, total: Option<u64>, unit: Unit) -> Box<dyn Progress> {
        let bar = match (total, unit) {
            (Some(len), Unit::Bytes) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    style("  {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                        .progress_chars("=> "),
                );
                bar
            }
            (Some(len), Unit::Items) => {
                let bar = ProgressBar::new(len);
                bar.set_style(style("  {msg} [{bar:30.cyan/blue}] {pos}/{len}").progress_chars("=> "));
                bar
            }
            (None, Unit::Bytes) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(style("  {spinner:.green} {msg} {bytes}"));
                bar.enable_steady_tick(TICK);
                bar
            }
            (None, Unit::Items) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(style("  {spinner:.green} {msg} {pos}"));
                bar.enable_steady_tick(TICK);
                bar
            }
        };
        bar.set_message(label.to_string());
        Box::new(BarProgress { bar })
    }
}

struct SpinnerTask {
    bar: ProgressBar,
    label: String,
}

impl Task for SpinnerTask {
    #[allow(clippy::print_stderr)]
    fn finish(self: Box<Self>, ok: bool, message: Option<&str>) {
        self.bar.finish_and_clear();
        let text = message.unwrap_or(&self.label);
        let level = if ok { Level::Success } else { Level::Error };
        eprintln!("  {}", decorate(level, text));
    }
}

impl Drop for SpinnerTask {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

struct BarProgress {
    bar: ProgressBar,
}

impl Progress for BarProgress {
    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(self: Box<Self>) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_displays_bytes() {
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn format_bytes_displays_mib() {
        assert_eq!(format_bytes(134_217_728), "128.0 MiB");
    }

    #[test]
    fn format_bytes_displays_gib() {
        assert_eq!(format_bytes(2_147_483_648), "2.0 GiB");
    }

    #[test]
    fn decorate_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(decorate(Level::Warning, "careful"), "⚠ careful");
        assert_eq!(decorate(Level::Success, "done"), "✓ done");
    }

    #[test]
    fn progress_and_spinner_finish_cleanly() {
        let reporter = TerminalReporter::new();
        let bar = reporter.progress("download", Some(10), Unit::Bytes);
        bar.advance(4);
        bar.advance(6);
        bar.finish();
        let unknown = reporter.progress("extract", None, Unit::Items);
        unknown.advance(1);
        unknown.finish();
        reporter.spinner("working").finish(true, None);
    }
}
