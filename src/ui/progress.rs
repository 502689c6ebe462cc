//! Progress reporting for long file loads
//!
//! The library emits [`ProgressEvent`]s through caller-supplied closures and
//! never prints. [`ProgressPrinter`] renders them on stderr with `indicatif`,
//! keeping stdout for reports.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Typed progress events for UI rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Work under way; `percent` of the whole run is done
    Step { percent: u8, message: String },
    /// Permanent informational line (one per processed file)
    Info { message: String },
    /// Permanent warning line
    Warning { message: String },
    /// Run finished
    Done { message: String },
}

impl ProgressEvent {
    pub fn step(percent: usize, message: impl Into<String>) -> Self {
        ProgressEvent::Step {
            percent: percent.min(100) as u8,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressEvent::Step { message, .. }
            | ProgressEvent::Info { message }
            | ProgressEvent::Warning { message }
            | ProgressEvent::Done { message } => message,
        }
    }
}

/// Percent done after `done` of `total` units
pub fn percent_of(done: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        done.saturating_mul(100) / total
    }
}

/// Renders progress on stderr; hidden when stderr is not a terminal
pub struct ProgressPrinter {
    bar: ProgressBar,
}

impl ProgressPrinter {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr())
        };
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        if !bar.is_hidden() {
            bar.enable_steady_tick(Duration::from_millis(120));
        }
        Self { bar }
    }

    pub fn update(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Print a permanent line above the bar
    pub fn persist(&self, message: &str) {
        if self.bar.is_hidden() {
            eprintln!("{}", message);
        } else {
            self.bar.println(message);
        }
    }

    pub fn finish(&self, success: bool, message: &str) {
        self.bar.finish_and_clear();
        let mark = if success { "✓" } else { "✗" };
        eprintln!("{} {}", mark, message);
    }

    pub fn handle_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Step { percent, message } => {
                self.bar.set_position(u64::from(*percent));
                self.update(message);
            }
            ProgressEvent::Info { message } | ProgressEvent::Warning { message } => {
                self.persist(message)
            }
            ProgressEvent::Done { message } => {
                self.bar.set_position(100);
                self.finish(true, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_clamps_percent() {
        assert_eq!(
            ProgressEvent::step(250, "Lendo"),
            ProgressEvent::Step {
                percent: 100,
                message: "Lendo".to_string()
            }
        );
        assert_eq!(ProgressEvent::Info { message: "ok".into() }.message(), "ok");
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(1, 4), 25);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_hidden_printer_accepts_events() {
        let printer = ProgressPrinter::new(true);
        printer.handle_event(&ProgressEvent::step(50, "Identificando"));
        printer.handle_event(&ProgressEvent::Done { message: "Concluído".into() });
    }
}
