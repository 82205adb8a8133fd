//! Merge command implementation.

use crate::cli::MergeArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use jarpipe_core::ManifestPolicy;
use jarpipe_core::MergeCoordinator;
use jarpipe_core::NoopProgress;
use jarpipe_core::OutputFile;
use jarpipe_core::PipelineConfig;

pub fn execute(
    args: &MergeArgs,
    config: PipelineConfig,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Output file '{}' already exists. Use --force to overwrite.",
            args.output.display()
        );
    }

    let merged_name = args
        .output
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid output path '{}'", args.output.display()))?;

    let policy = if args.preserve_manifest {
        ManifestPolicy::Preserve
    } else {
        ManifestPolicy::Rewrite
    };
    let mut coordinator = add_archive_context(
        MergeCoordinator::with_config(merged_name, config.with_manifest_policy(policy)),
        &args.output,
    )?;

    let result = if show_progress && CliProgress::should_show() {
        let mut progress = CliProgress::new(args.jars.len(), "Merging");
        coordinator.merge_files_with_progress(&args.jars, &mut progress)
    } else {
        let mut noop = NoopProgress;
        coordinator.merge_files_with_progress(&args.jars, &mut noop)
    };
    let (merged, report) = add_archive_context(result, &args.output)?;

    let output = OutputFile::from_archive(&merged).context("merged archive has no name")?;
    let bytes_written = add_archive_context(output.write_to(&args.output, args.level), &args.output)?;

    formatter.format_merge_result(&args.output, &report, bytes_written)?;

    coordinator.close();
    Ok(())
}
