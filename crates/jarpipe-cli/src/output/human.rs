//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::RepackSummary;
use anyhow::Result;
use console::Term;
use console::style;
use jarpipe_core::Entry;
use jarpipe_core::EntryKind;
use jarpipe_core::Generation;
use jarpipe_core::MergeReport;
use jarpipe_core::ReadReport;
use std::io::Write;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn header(&self, text: &str) {
        if self.use_colors {
            self.line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            self.line(text);
        }
    }

    fn warning_block(&self, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        self.line("");
        if self.use_colors {
            self.line(&format!("{}", style("Warnings:").yellow().bold()));
        } else {
            self.line("Warnings:");
        }
        for warning in warnings {
            self.line(&format!("  - {warning}"));
        }
    }

    fn read_warnings(read: &ReadReport) -> Vec<String> {
        read.failures.iter().map(ToString::to_string).collect()
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_listing(
        &self,
        _name: &str,
        generation: &Generation,
        read: &ReadReport,
        long: bool,
        human_readable: bool,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let entries = generation
            .classes()
            .sorted()
            .into_iter()
            .chain(generation.resources().sorted());

        if long {
            for entry in entries {
                let size = entry.bytes().len() as u64;
                let size_str = if human_readable {
                    Self::format_size(size)
                } else {
                    size.to_string()
                };
                let kind_char = match entry.kind() {
                    EntryKind::Class => "C",
                    EntryKind::Resource => "R",
                };
                self.line(&format!("{kind_char} {size_str:>10}  {}", entry.name()));
            }

            self.line("");
            self.line(&format!(
                "Total: {} classes, {} resources, {}",
                Self::format_number(generation.classes().len()),
                Self::format_number(generation.resources().len()),
                Self::format_size(read.bytes_read)
            ));
        } else {
            for entry in entries {
                self.line(entry.name());
            }
        }

        self.warning_block(&Self::read_warnings(read));
        Ok(())
    }

    fn format_repack_result(&self, summary: &RepackSummary<'_>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.header(&format!("Archive written: {}", summary.output.display()));
        self.line("");
        self.line(&format!(
            "  Entries read:     {}",
            Self::format_number(summary.read.entries_read())
        ));
        self.line(&format!(
            "  Entries written:  {}",
            Self::format_number(summary.entries_written)
        ));
        if summary.transform.entries_removed > 0 {
            self.line(&format!(
                "  Removed:          {}",
                Self::format_number(summary.transform.entries_removed)
            ));
        }
        if summary.transform.entries_renamed > 0 {
            self.line(&format!(
                "  Renamed:          {}",
                Self::format_number(summary.transform.entries_renamed)
            ));
        }
        self.line(&format!(
            "  Output size:      {}",
            Self::format_size(summary.bytes_written)
        ));

        if self.verbose {
            self.line(&format!(
                "  Stages applied:   {}",
                summary.transform.stages_applied
            ));
            self.line(&format!(
                "  Read time:        {:?}",
                summary.read.duration
            ));
            self.line(&format!(
                "  Transform time:   {:?}",
                summary.transform.duration
            ));
        }

        let mut warnings = Self::read_warnings(summary.read);
        warnings.extend(
            summary
                .transform
                .collisions
                .iter()
                .map(|name| format!("two entries were renamed to '{name}'; kept the last one")),
        );
        self.warning_block(&warnings);
        Ok(())
    }

    fn format_merge_result(
        &self,
        output: &Path,
        report: &MergeReport,
        bytes_written: u64,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.header(&format!("Merged archive written: {}", output.display()));
        self.line("");
        self.line(&format!("  Sources:          {}", report.sources));
        self.line(&format!(
            "  Entries:          {}",
            Self::format_number(report.entries_merged)
        ));
        if report.duplicates_dropped > 0 {
            self.line(&format!(
                "  Duplicates:       {}",
                Self::format_number(report.duplicates_dropped)
            ));
        }
        match (&report.main_class, &report.main_class_source) {
            (Some(main_class), Some(source)) => {
                self.line(&format!("  Main-Class:       {main_class} (from {source})"));
            }
            (Some(main_class), None) => {
                self.line(&format!("  Main-Class:       {main_class}"));
            }
            _ => self.line("  Main-Class:       -"),
        }
        self.line(&format!(
            "  Output size:      {}",
            Self::format_size(bytes_written)
        ));

        if self.verbose {
            self.line(&format!(
                "  Manifest:         {}",
                if report.manifest_rewritten {
                    "rewritten"
                } else {
                    "unchanged"
                }
            ));
            self.line(&format!("  Duration:         {:?}", report.duration));
        }

        self.warning_block(&report.warnings);
        Ok(())
    }

    fn format_entry(&self, entry: &Entry, written_to: Option<&Path>) -> Result<()> {
        match written_to {
            Some(path) => {
                if !self.quiet {
                    self.header(&format!(
                        "Wrote {} ({}) to {}",
                        entry.name(),
                        Self::format_size(entry.bytes().len() as u64),
                        path.display()
                    ));
                }
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(entry.bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            self.line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            self.line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }
}
