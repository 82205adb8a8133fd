//! Core data types: entries, collections, and archive generations.

pub mod archive;
pub mod collection;
pub mod entry;

pub use archive::Archive;
pub use archive::Generation;
pub use collection::CollisionPolicy;
pub use collection::EntryCollection;
pub use collection::InsertOutcome;
pub use entry::CLASS_MARKER;
pub use entry::Entry;
pub use entry::EntryKind;
pub use entry::Payload;
