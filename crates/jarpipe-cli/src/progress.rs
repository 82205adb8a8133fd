//! Progress bar implementation for multi-archive operations.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use jarpipe_core::ProgressCallback;
use std::fmt::Write;

/// CLI progress bar wrapper implementing `ProgressCallback`.
///
/// Shows one tick per archive, the archive being read, the running entry
/// count and the elapsed time. Cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    entries: usize,
}

impl CliProgress {
    /// Creates a new CLI progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of archives in the batch
    /// * `message` - Verb to display (e.g., "Reading", "Merging")
    #[must_use]
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);

        // Template: "Merging [████████░░░░] 2/4 jars (3s) lib.jar"
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {pos}/{len} jars ({elapsed_h}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .with_key("elapsed_h", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.elapsed())).unwrap_or(());
                })
                .progress_chars("█▓░"),
        );

        bar.set_prefix(message.to_string());

        Self { bar, entries: 0 }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_archive_start(&mut self, name: &str, _total: usize, _current: usize) {
        self.bar.set_message(name.to_string());
    }

    fn on_archive_complete(&mut self, name: &str, entries: usize) {
        self.entries += entries;
        self.bar
            .set_message(format!("{name} ({} entries so far)", self.entries));
        self.bar.inc(1);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
