//! Terminal output.
//!
//! - `log!("module"; ...)` prints a line behind a colored `[module]` tag
//! - `debug!` does the same only under `--verbose`
//! - [`WatchStatus`] keeps one status block on screen in watch mode,
//!   rewriting it after each reload
//!
//! ```ignore
//! log!("reload"; "{} ready (generation {})", type_name, generation);
//! debug!("watch"; "{} {}", origin.label(), path.display());
//! ```

use std::io::{Write, stdout};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossterm::cursor::MoveUp;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Print a line tagged with a colored `[module]` prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like `log!`, but silent unless `--verbose` was given.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let tag = format!("[{module}]");
    let mut out = stdout().lock();
    // a status block may have left the cursor mid-line
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{} {message}", tag.style(tag_style(module))).ok();
    out.flush().ok();
}

/// Tag color per module: lifecycle blue, watching green, failures red.
fn tag_style(module: &str) -> Style {
    let style = Style::new().bold();
    match module.to_ascii_lowercase().as_str() {
        "reload" | "registry" => style.bright_blue(),
        "watch" => style.bright_green(),
        "compile" | "error" => style.bright_red(),
        _ => style.bright_yellow(),
    }
}

// ============================================================================
// watch status block
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Ok,
    Fail,
    Warn,
}

impl Mark {
    fn render(self) -> String {
        match self {
            Self::Ok => "✓".green().to_string(),
            Self::Fail => "✗".red().to_string(),
            Self::Warn => "⚠".yellow().to_string(),
        }
    }
}

/// The latest reload outcome, redrawn in place.
///
/// A new message erases the rows the previous one occupied, so a burst of
/// reloads leaves only the last result on screen.
#[derive(Debug, Default)]
pub struct WatchStatus {
    /// Rows drawn by the previous message
    rows: u16,
}

static STATUS: LazyLock<Mutex<WatchStatus>> = LazyLock::new(Mutex::default);

impl WatchStatus {
    pub const fn new() -> Self {
        Self { rows: 0 }
    }

    pub fn success(&mut self, message: &str) {
        self.draw(Mark::Ok, message);
    }

    /// `summary` on the first row, `detail` (if any) below it.
    pub fn error(&mut self, summary: &str, detail: &str) {
        if detail.is_empty() {
            self.draw(Mark::Fail, summary);
        } else {
            self.draw(Mark::Fail, &format!("{summary}\n{detail}"));
        }
    }

    pub fn warning(&mut self, message: &str) {
        self.draw(Mark::Warn, message);
    }

    fn draw(&mut self, mark: Mark, body: &str) {
        let mut out = stdout().lock();
        if self.rows > 0 {
            execute!(out, MoveUp(self.rows), Clear(ClearType::FromCursorDown)).ok();
        }
        writeln!(out, "{} {} {body}", clock().dimmed(), mark.render()).ok();
        out.flush().ok();
        self.rows = rows(body);
    }
}

/// Rows a message occupies, ignoring terminal wrapping.
fn rows(body: &str) -> u16 {
    let lines = body.lines().count().max(1);
    u16::try_from(lines).unwrap_or(u16::MAX)
}

/// `[HH:MM:SS]` in UTC.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() % 86_400);
    format!("[{:02}:{:02}:{:02}]", secs / 3600, secs / 60 % 60, secs % 60)
}

pub fn status_success(message: &str) {
    STATUS.lock().success(message);
}

pub fn status_error(summary: &str, detail: &str) {
    STATUS.lock().error(summary, detail);
}

pub fn status_warning(message: &str) {
    STATUS.lock().warning(message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows() {
        assert_eq!(rows(""), 1);
        assert_eq!(rows("reloaded Counter (generation 2)"), 1);
        assert_eq!(
            rows("failed to compile `Scripts.Counter`\nCounter.brew:1:1: expected `;`\nCounter.brew:2:5: unknown variable `y`"),
            3
        );
    }

    #[test]
    fn test_clock_format() {
        let text = clock();
        assert_eq!(text.len(), 10);
        assert!(text.starts_with('[') && text.ends_with(']'));
        assert_eq!(&text[3..4], ":");
        assert_eq!(&text[6..7], ":");
    }

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_status_starts_empty() {
        assert_eq!(WatchStatus::new().rows, 0);
    }
}
