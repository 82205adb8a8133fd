//! Change functions applied by the transform pipeline.
//!
//! A change function receives an entry's name and payload and returns the
//! entry that should take its place in the next generation:
//!
//! - `Ok(Some(entry))` keeps the entry, possibly renamed or with new bytes,
//! - `Ok(None)` removes it,
//! - `Err(_)` aborts the whole transform.
//!
//! Change functions run concurrently on the worker pool and must not rely on
//! shared mutable state. Closures with the matching signature implement both
//! traits.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use jarpipe_core::ChangeFunction;
//! use jarpipe_core::ChangeResult;
//! use jarpipe_core::Entry;
//! use jarpipe_core::Payload;
//!
//! // Move every class under a `shaded/` prefix.
//! let shade = ChangeFunction::class(|name: &str, payload: &Payload| -> ChangeResult {
//!     Ok(Some(Entry::class(format!("shaded/{name}"), Payload::clone(payload))))
//! });
//!
//! // Drop signature files.
//! let strip = ChangeFunction::resource(|name: &str, payload: &Payload| -> ChangeResult {
//!     if name.ends_with(".SF") {
//!         Ok(None)
//!     } else {
//!         Ok(Some(Entry::resource(name, Payload::clone(payload))))
//!     }
//! });
//!
//! let changes = [shade, strip];
//! assert_eq!(changes.len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::types::Entry;
use crate::types::EntryKind;
use crate::types::Payload;

/// Result of applying a change function to one entry.
pub type ChangeResult = std::result::Result<Option<Entry>, BoxError>;

/// A change applied to class entries.
pub trait ClassChange: Send + Sync {
    /// Produces the replacement for the class `name`.
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult;
}

/// A change applied to resource entries.
pub trait ResourceChange: Send + Sync {
    /// Produces the replacement for the resource `name`.
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult;
}

impl<F> ClassChange for F
where
    F: Fn(&str, &Payload) -> ChangeResult + Send + Sync,
{
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult {
        self(name, payload)
    }
}

impl<F> ResourceChange for F
where
    F: Fn(&str, &Payload) -> ChangeResult + Send + Sync,
{
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult {
        self(name, payload)
    }
}

/// One stage of a transform chain.
#[derive(Clone)]
pub enum ChangeFunction {
    /// Applied to class entries.
    Class(Arc<dyn ClassChange>),
    /// Applied to resource entries.
    Resource(Arc<dyn ResourceChange>),
}

impl ChangeFunction {
    /// Wraps a class change.
    pub fn class(change: impl ClassChange + 'static) -> Self {
        Self::Class(Arc::new(change))
    }

    /// Wraps a resource change.
    pub fn resource(change: impl ResourceChange + 'static) -> Self {
        Self::Resource(Arc::new(change))
    }

    /// The kind of entry this stage transforms.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Class(_) => EntryKind::Class,
            Self::Resource(_) => EntryKind::Resource,
        }
    }

    pub(crate) fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult {
        match self {
            Self::Class(change) => change.apply_change(name, payload),
            Self::Resource(change) => change.apply_change(name, payload),
        }
    }
}

impl fmt::Debug for ChangeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChangeFunction").field(&self.kind()).finish()
    }
}

/// A change that keeps every entry as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ClassChange for Identity {
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult {
        Ok(Some(Entry::class(name, Payload::clone(payload))))
    }
}

impl ResourceChange for Identity {
    fn apply_change(&self, name: &str, payload: &Payload) -> ChangeResult {
        Ok(Some(Entry::resource(name, Payload::clone(payload))))
    }
}
