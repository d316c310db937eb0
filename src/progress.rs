//! Pipeline progress reporting.
//!
//! Progress is emitted on **stderr** so stdout stays parseable for scripts.
//! The orchestrator calls the reporter once per item per stage with a fixed
//! phase label.

use std::io::Write;

/// Reports per-item progress. Implementations write to stderr (or nowhere).
pub trait ProgressReporter: Send + Sync {
    /// Called with the 1-based item index, the stage total, and the phase
    /// label.
    fn report(&self, current: usize, total: usize, phase: &str);
}

/// Human-friendly progress: a carriage-return updated percentage line,
/// completed with a newline when the stage finishes.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, current: usize, total: usize, phase: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", render_line(current, total, phase));
        if current == total {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

/// No-op reporter for tests and quiet runs.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _current: usize, _total: usize, _phase: &str) {}
}

fn render_line(current: usize, total: usize, phase: &str) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        current as f64 / total as f64 * 100.0
    };
    format!("{:<20}: [{:>3.0}%] {}/{}", phase, percent, current, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_line_shape() {
        assert_eq!(
            render_line(1, 4, "Extracting notes"),
            "Extracting notes    : [ 25%] 1/4"
        );
        assert_eq!(
            render_line(4, 4, "Extracting notes"),
            "Extracting notes    : [100%] 4/4"
        );
    }

    #[test]
    fn test_render_line_zero_total() {
        assert_eq!(render_line(0, 0, "x"), "x                   : [100%] 0/0");
    }
}
