//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use jarpipe_core::ArchiveReader;
use jarpipe_core::PipelineConfig;

pub fn execute(
    args: &ListArgs,
    config: &PipelineConfig,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    let reader = add_archive_context(ArchiveReader::with_config(config.clone()), &args.jar)?;
    let (archive, report) = add_archive_context(reader.read(&args.jar), &args.jar)?;

    let generation = archive.snapshot();
    if generation.is_empty() {
        formatter.format_warning(&format!("'{}' contains no entries", args.jar.display()));
    }

    let name = archive.source_name().unwrap_or_default();
    formatter.format_listing(
        name,
        &generation,
        &report,
        args.long,
        args.human_readable,
    )
}
