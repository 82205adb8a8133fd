//! Repack command implementation.

use crate::cli::RepackArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::output::RepackSummary;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use jarpipe_core::ChangeFunction;
use jarpipe_core::ChangeResult;
use jarpipe_core::Entry;
use jarpipe_core::JarManager;
use jarpipe_core::Payload;
use jarpipe_core::PipelineConfig;
use std::sync::Arc;
use tracing::debug;

pub fn execute(
    args: &RepackArgs,
    config: &PipelineConfig,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Output file '{}' already exists. Use --force to overwrite.",
            args.output.display()
        );
    }

    let mut manager = add_archive_context(JarManager::with_config(config.clone()), &args.jar)?;
    add_archive_context(manager.read_jar(&args.jar), &args.jar)?;

    let changes = build_changes(args);
    debug!(stages = changes.len(), jar = %args.jar.display(), "change chain built");
    let transform = add_archive_context(manager.apply(&changes), &args.jar)?;

    let output = manager.output_file().context("no archive is loaded")?;
    let bytes = add_archive_context(output.to_bytes(args.level), &args.output)?;
    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;

    let read = manager.last_read_report().context("no read report available")?;
    formatter.format_repack_result(&RepackSummary {
        output: &args.output,
        read,
        transform: &transform,
        entries_written: output.generation().entry_count(),
        bytes_written: bytes.len() as u64,
    })?;

    manager.close();
    Ok(())
}

/// Builds the change chain for the repack flags.
///
/// Stages run in this order: class strip, resource strip, exclusions,
/// relocations.
fn build_changes(args: &RepackArgs) -> Vec<ChangeFunction> {
    let mut changes = Vec::new();

    if args.strip_classes {
        changes.push(ChangeFunction::class(
            |_: &str, _: &Payload| -> ChangeResult { Ok(None) },
        ));
    }
    if args.strip_resources {
        changes.push(ChangeFunction::resource(
            |_: &str, _: &Payload| -> ChangeResult { Ok(None) },
        ));
    }

    if !args.exclude.is_empty() {
        let prefixes: Arc<[String]> = args.exclude.clone().into();
        let class_prefixes = Arc::clone(&prefixes);
        changes.push(ChangeFunction::class(
            move |name: &str, payload: &Payload| -> ChangeResult {
                Ok(keep_unless_excluded(&class_prefixes, name, payload, Entry::class))
            },
        ));
        changes.push(ChangeFunction::resource(
            move |name: &str, payload: &Payload| -> ChangeResult {
                Ok(keep_unless_excluded(&prefixes, name, payload, Entry::resource))
            },
        ));
    }

    for (from, to) in &args.relocate {
        let from = from.clone();
        let to = to.clone();
        changes.push(ChangeFunction::class(
            move |name: &str, payload: &Payload| -> ChangeResult {
                let name = match name.strip_prefix(from.as_str()) {
                    Some(rest) => format!("{to}{rest}"),
                    None => name.to_string(),
                };
                Ok(Some(Entry::class(name, Payload::clone(payload))))
            },
        ));
    }

    changes
}

fn keep_unless_excluded(
    prefixes: &[String],
    name: &str,
    payload: &Payload,
    make: fn(String, Payload) -> Entry,
) -> Option<Entry> {
    if prefixes.iter().any(|p| name.starts_with(p.as_str())) {
        None
    } else {
        Some(make(name.to_string(), Payload::clone(payload)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jarpipe_core::EntryKind;
    use std::path::PathBuf;

    fn args() -> RepackArgs {
        RepackArgs {
            jar: PathBuf::from("in.jar"),
            output: PathBuf::from("out.jar"),
            level: 6,
            strip_classes: false,
            strip_resources: false,
            exclude: Vec::new(),
            relocate: Vec::new(),
            force: false,
        }
    }

    #[test]
    fn test_no_flags_no_stages() {
        assert!(build_changes(&args()).is_empty());
    }

    #[test]
    fn test_stage_kinds() {
        let mut a = args();
        a.strip_resources = true;
        a.exclude = vec!["META-INF/".into()];
        a.relocate = vec![("com/".into(), "shaded/com/".into())];

        let kinds: Vec<_> = build_changes(&a).iter().map(ChangeFunction::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntryKind::Resource,
                EntryKind::Class,
                EntryKind::Resource,
                EntryKind::Class
            ]
        );
    }

    #[test]
    fn test_keep_unless_excluded() {
        let prefixes = vec!["META-INF/".to_string()];
        let payload: Payload = Arc::from(b"x".as_slice());

        assert!(keep_unless_excluded(&prefixes, "META-INF/A.SF", &payload, Entry::resource).is_none());
        let kept = keep_unless_excluded(&prefixes, "app.properties", &payload, Entry::resource).unwrap();
        assert_eq!(kept.name(), "app.properties");
        assert_eq!(kept.bytes(), b"x");
    }
}
