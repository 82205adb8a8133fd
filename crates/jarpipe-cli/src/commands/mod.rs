//! Subcommand implementations.

pub mod completion;
pub mod find;
pub mod list;
pub mod merge;
pub mod repack;
