//! Concurrent JAR/ZIP transformation pipeline.
//!
//! `jarpipe-core` reads JAR archives into memory, splits their entries into
//! classes and resources, runs ordered chains of caller-supplied change
//! functions over them on a worker pool, and writes the result back out. It
//! can also merge several archives into one, keeping at most one
//! `Main-Class`.
//!
//! Every transform publishes a new immutable generation of the archive, so
//! readers holding a snapshot never observe a half-applied chain.
//!
//! # Examples
//!
//! ```no_run
//! use jarpipe_core::ArchiveReader;
//! use jarpipe_core::ChangeFunction;
//! use jarpipe_core::ChangeResult;
//! use jarpipe_core::OutputFile;
//! use jarpipe_core::Payload;
//! use jarpipe_core::TransformPipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (archive, report) = ArchiveReader::new()?.read("app.jar")?;
//! println!("read {} entries", report.entries_read());
//!
//! // Strip every class, keep resources.
//! let strip = ChangeFunction::class(|_: &str, _: &Payload| -> ChangeResult { Ok(None) });
//! TransformPipeline::new()?.transform(&archive, &[strip])?;
//!
//! if let Some(output) = OutputFile::from_archive(&archive) {
//!     output.write_to("resources-only.jar", 9)?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod assembler;
mod central_directory;
pub mod change;
pub mod config;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod search;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

pub use assembler::OutputAssembler;
pub use assembler::OutputFile;
pub use change::ChangeFunction;
pub use change::ChangeResult;
pub use change::ClassChange;
pub use change::Identity;
pub use change::ResourceChange;
pub use config::ManifestPolicy;
pub use config::PipelineConfig;
pub use error::BoxError;
pub use error::PipelineError;
pub use error::Result;
pub use manager::JarManager;
pub use manager::MultiJarManager;
pub use manifest::MAIN_CLASS;
pub use manifest::MANIFEST_PATH;
pub use manifest::Manifest;
pub use merge::MergeCoordinator;
pub use pipeline::TransformPipeline;
pub use reader::ArchiveReader;
pub use report::LoadReport;
pub use report::MergeReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use report::ReadReport;
pub use report::TransformReport;
pub use search::find_entry;

pub use types::Archive;
pub use types::CLASS_MARKER;
pub use types::CollisionPolicy;
pub use types::Entry;
pub use types::EntryCollection;
pub use types::EntryKind;
pub use types::Generation;
pub use types::InsertOutcome;
pub use types::Payload;
