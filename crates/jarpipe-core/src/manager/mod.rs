//! Stateful front ends over the reader, pipeline, and assembler.
//!
//! [`JarManager`] holds one archive at a time. [`MultiJarManager`] keeps a
//! registry of archives keyed by file name and can target changes and output
//! at one of them or at all of them.

mod multi;
mod single;

pub use multi::MultiJarManager;
pub use single::JarManager;
