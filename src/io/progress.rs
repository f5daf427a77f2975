//! Ingestion progress reporting.
//!
//! [`ConsoleProgress`] draws a single-line bar on stderr: redrawn in place on a
//! TTY, one line per 10% step otherwise (logs, CI). [`NoProgress`] discards
//! updates and [`RecordingProgress`] keeps them for inspection.

use std::fmt::{self, Display};
use std::io::Write;
use std::time::Instant;

use parking_lot::Mutex;

const DEFAULT_BAR_WIDTH: usize = 24;

const ERASE_LINE: &str = "\x1b[2K";
const CURSOR_LEFT: &str = "\r";

/// Receives `(done, total)` after every inserted record.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, done: usize, total: usize);

    /// Called once when the run ends, successful or not.
    fn finish(&self, done: usize, total: usize);
}

/// Glyph palettes for the bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarStyle {
    /// `█` on `░`
    FullBlock,
    /// `▓` on `░`
    DarkShade,
    /// `⣿` on blank
    Braille,
}

impl BarStyle {
    fn filled_cell(self) -> &'static str {
        match self {
            BarStyle::FullBlock => "█",
            BarStyle::DarkShade => "▓",
            BarStyle::Braille => "⣿",
        }
    }

    fn empty_cell(self) -> &'static str {
        match self {
            BarStyle::FullBlock | BarStyle::DarkShade => "░",
            BarStyle::Braille => " ",
        }
    }
}

/// One rendered frame of the bar.
#[derive(Debug, Clone)]
pub struct ProgressLine {
    pub label: String,
    pub done: usize,
    pub total: usize,
    pub elapsed_secs: f64,
    pub style: BarStyle,
    pub width: usize,
}

impl ProgressLine {
    fn ratio(&self) -> f64 {
        if self.total > 0 {
            (self.done as f64 / self.total as f64).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn percent(&self) -> u8 {
        (self.ratio() * 100.0).round() as u8
    }
}

impl Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width.max(1);
        let filled = ((self.ratio() * width as f64).round() as usize).min(width);
        let bar = format!(
            "{}{}",
            self.style.filled_cell().repeat(filled),
            self.style.empty_cell().repeat(width - filled)
        );
        let rate = if self.elapsed_secs > 0.0 {
            self.done as f64 / self.elapsed_secs
        } else {
            0.0
        };

        write!(
            f,
            "{}: [{bar}] {:3}% {}/{} | {rate:.0}/s | {:.1}s",
            self.label,
            self.percent(),
            self.done,
            self.total,
            self.elapsed_secs
        )
    }
}

#[derive(Default)]
struct ConsoleState {
    started: Option<Instant>,
    last_step: Option<u8>,
}

/// Progress bar on stderr.
pub struct ConsoleProgress {
    label: String,
    style: BarStyle,
    width: usize,
    ansi: bool,
    state: Mutex<ConsoleState>,
}

impl ConsoleProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            style: BarStyle::FullBlock,
            width: DEFAULT_BAR_WIDTH,
            ansi: is_terminal::is_terminal(std::io::stderr()),
            state: Mutex::new(ConsoleState::default()),
        }
    }

    pub fn with_style(mut self, style: BarStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    fn line(&self, done: usize, total: usize, started: Instant) -> ProgressLine {
        ProgressLine {
            label: self.label.clone(),
            done,
            total,
            elapsed_secs: started.elapsed().as_secs_f64(),
            style: self.style,
            width: self.width,
        }
    }

    fn draw(&self, line: &ProgressLine) {
        let mut stderr = std::io::stderr().lock();
        // Write errors are ignored.
        let _ = if self.ansi {
            write!(stderr, "{ERASE_LINE}{CURSOR_LEFT}{line}")
        } else {
            writeln!(stderr, "{line}")
        };
        let _ = stderr.flush();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new("Ingesting")
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, done: usize, total: usize) {
        let mut state = self.state.lock();
        let started = *state.started.get_or_insert_with(Instant::now);
        let line = self.line(done, total, started);

        if !self.ansi {
            let step = line.percent() / 10;
            if state.last_step == Some(step) {
                return;
            }
            state.last_step = Some(step);
        }
        self.draw(&line);
    }

    fn finish(&self, done: usize, total: usize) {
        let mut state = self.state.lock();
        let started = state.started.take().unwrap_or_else(Instant::now);
        state.last_step = None;

        self.draw(&self.line(done, total, started));
        if self.ansi {
            let _ = writeln!(std::io::stderr());
        }
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _done: usize, _total: usize) {}

    fn finish(&self, _done: usize, _total: usize) {}
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<(usize, usize)>>,
    finished: Mutex<Option<(usize, usize)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(usize, usize)> {
        self.reports.lock().clone()
    }

    /// Arguments of the last `finish` call.
    pub fn finished(&self) -> Option<(usize, usize)> {
        *self.finished.lock()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, done: usize, total: usize) {
        self.reports.lock().push((done, total));
    }

    fn finish(&self, done: usize, total: usize) {
        *self.finished.lock() = Some((done, total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(done: usize, total: usize) -> ProgressLine {
        ProgressLine {
            label: "Ingesting".to_string(),
            done,
            total,
            elapsed_secs: 2.5,
            style: BarStyle::FullBlock,
            width: 10,
        }
    }

    #[test]
    fn test_progress_line_renders_bar() {
        let rendered = line(5, 10).to_string();
        assert_eq!(rendered, "Ingesting: [█████░░░░░]  50% 5/10 | 2/s | 2.5s");
    }

    #[test]
    fn test_zero_total_is_empty_bar() {
        let rendered = line(0, 0).to_string();
        assert!(rendered.contains("[░░░░░░░░░░]   0%"));
    }

    #[test]
    fn test_recording_progress() {
        let progress = RecordingProgress::new();
        progress.report(1, 2);
        progress.report(2, 2);
        progress.finish(2, 2);
        assert_eq!(progress.reports(), [(1, 2), (2, 2)]);
        assert_eq!(progress.finished(), Some((2, 2)));
    }
}
