//! Find command implementation.

use crate::cli::FindArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use jarpipe_core::find_entry;

pub fn execute(args: &FindArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let entry = add_archive_context(find_entry(&args.jar, &args.entry), &args.jar)?
        .with_context(|| {
            format!(
                "Entry '{}' not found in '{}'",
                args.entry,
                args.jar.display()
            )
        })?;

    if let Some(path) = &args.output {
        std::fs::write(path, entry.bytes())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }

    formatter.format_entry(&entry, args.output.as_deref())
}
