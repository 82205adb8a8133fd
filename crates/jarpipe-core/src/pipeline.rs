//! Ordered application of change chains.
//!
//! A chain is a fold over stages. Stage *i* reads the collection produced by
//! stage *i-1*, offers every entry to its change function on the worker pool,
//! and materializes a complete new collection before stage *i+1* starts.
//!
//! Fan-in walks the stage's results in ascending order of the input entry
//! name and inserts them with [`CollisionPolicy::StageLastWins`]. When two
//! entries are renamed onto the same name, the one produced from the greatest
//! input name therefore survives, independent of thread scheduling.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;
use tracing::warn;

use crate::PipelineConfig;
use crate::PipelineError;
use crate::Result;
use crate::change::ChangeFunction;
use crate::report::TransformReport;
use crate::types::Archive;
use crate::types::CollisionPolicy;
use crate::types::Entry;
use crate::types::EntryCollection;
use crate::types::EntryKind;
use crate::types::Generation;

/// Runs change chains over entry collections.
///
/// # Examples
///
/// ```
/// use jarpipe_core::ChangeFunction;
/// use jarpipe_core::ChangeResult;
/// use jarpipe_core::CollisionPolicy;
/// use jarpipe_core::Entry;
/// use jarpipe_core::EntryCollection;
/// use jarpipe_core::EntryKind;
/// use jarpipe_core::Payload;
/// use jarpipe_core::TransformPipeline;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut classes = EntryCollection::new();
/// classes.insert(Entry::class("a/B.class", vec![1, 2, 3]), CollisionPolicy::IngestFirstWins);
///
/// let relocate = ChangeFunction::class(|name: &str, payload: &Payload| -> ChangeResult {
///     Ok(Some(Entry::class(format!("shaded/{name}"), Payload::clone(payload))))
/// });
///
/// let pipeline = TransformPipeline::new()?;
/// let (classes, report) = pipeline.apply(&classes, EntryKind::Class, &[relocate])?;
/// assert!(classes.contains("shaded/a/B.class"));
/// assert_eq!(report.entries_renamed, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TransformPipeline {
    pool: rayon::ThreadPool,
}

impl TransformPipeline {
    /// Creates a pipeline with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&PipelineConfig::default())
    }

    /// Creates a pipeline whose worker pool is sized by `config`.
    pub fn with_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            pool: config.build_pool()?,
        })
    }

    /// Applies the stages of `changes` that target `kind`, in order, to
    /// `collection`.
    ///
    /// Stages for the other kind are ignored. With no matching stage, or an
    /// empty collection, the input is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChangeFunctionFailure`] if any change function returns
    /// an error. Nothing is returned from a partially applied chain.
    pub fn apply(
        &self,
        collection: &EntryCollection,
        kind: EntryKind,
        changes: &[ChangeFunction],
    ) -> Result<(EntryCollection, TransformReport)> {
        let start = Instant::now();
        let mut report = TransformReport {
            entries_in: collection.len(),
            entries_out: collection.len(),
            ..TransformReport::default()
        };

        let stages: Vec<&ChangeFunction> = changes.iter().filter(|c| c.kind() == kind).collect();
        if stages.is_empty() || collection.is_empty() {
            return Ok((collection.clone(), report));
        }

        let mut current: Option<EntryCollection> = None;
        for (index, stage) in stages.iter().enumerate() {
            let input = current.as_ref().unwrap_or(collection);
            let next = self.run_stage(input, stage, kind, &mut report)?;
            debug!(
                kind = %kind,
                stage = index,
                entries_in = input.len(),
                entries_out = next.len(),
                "stage complete"
            );
            current = Some(next);
            report.stages_applied += 1;
        }

        let result = current.unwrap_or_else(|| collection.clone());
        report.entries_out = result.len();
        report.duration = start.elapsed();
        Ok((result, report))
    }

    /// Applies `changes` to an archive and publishes the new generation.
    ///
    /// Class stages run over the class collection and resource stages over the
    /// resource collection, each in list order. The computation works on a
    /// snapshot without blocking readers; the new generation is swapped in
    /// only if every stage succeeded. Concurrent transforms of one archive
    /// run one after the other, each on the generation the previous one
    /// published.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChangeFunctionFailure`] if any change function fails.
    /// The archive is left untouched in that case.
    pub fn transform(
        &self,
        archive: &Archive,
        changes: &[ChangeFunction],
    ) -> Result<TransformReport> {
        let _writes = archive.lock_writes();
        let snapshot = archive.snapshot();
        let mut report = TransformReport::new();

        let classes = self.apply_if_targeted(snapshot.classes(), EntryKind::Class, changes)?;
        let resources =
            self.apply_if_targeted(snapshot.resources(), EntryKind::Resource, changes)?;

        match (classes, resources) {
            (Some((classes, c)), Some((resources, r))) => {
                report.absorb(c);
                report.absorb(r);
                archive.publish(Generation::new(classes, resources));
            }
            (Some((classes, c)), None) => {
                report.absorb(c);
                archive.swap_classes(classes);
            }
            (None, Some((resources, r))) => {
                report.absorb(r);
                archive.swap_resources(resources);
            }
            (None, None) => {}
        }

        Ok(report)
    }

    fn apply_if_targeted(
        &self,
        collection: &EntryCollection,
        kind: EntryKind,
        changes: &[ChangeFunction],
    ) -> Result<Option<(EntryCollection, TransformReport)>> {
        if collection.is_empty() || !changes.iter().any(|c| c.kind() == kind) {
            return Ok(None);
        }
        self.apply(collection, kind, changes).map(Some)
    }

    fn run_stage(
        &self,
        input: &EntryCollection,
        stage: &ChangeFunction,
        kind: EntryKind,
        report: &mut TransformReport,
    ) -> Result<EntryCollection> {
        let entries = input.sorted();

        let outputs: Vec<Option<Entry>> = self.pool.install(|| {
            entries
                .par_iter()
                .map(|entry| apply_one(stage, entry, kind))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut next = EntryCollection::with_capacity(entries.len());
        for (entry, output) in entries.iter().zip(outputs) {
            let Some(produced) = output else {
                report.entries_removed += 1;
                continue;
            };
            if produced.name() != entry.name() {
                report.entries_renamed += 1;
            }
            if next.contains(produced.name()) {
                warn!(
                    name = produced.name(),
                    from = entry.name(),
                    "two entries of one stage produced the same name; keeping the later one"
                );
                report.collisions.push(produced.name().to_owned());
            }
            next.insert(produced, CollisionPolicy::StageLastWins);
        }
        Ok(next)
    }
}

fn apply_one(stage: &ChangeFunction, entry: &Entry, kind: EntryKind) -> Result<Option<Entry>> {
    // Entries without a payload have nothing to transform and are carried over.
    let Some(payload) = entry.payload() else {
        return Ok(Some(entry.clone()));
    };
    stage
        .apply_change(entry.name(), payload)
        .map(|produced| produced.map(|e| e.into_kind(kind)))
        .map_err(|source| PipelineError::ChangeFunctionFailure {
            entry: entry.name().to_owned(),
            source,
        })
}
