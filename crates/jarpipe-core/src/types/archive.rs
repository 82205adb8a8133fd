//! In-memory archive and its generations.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use super::collection::EntryCollection;
use super::entry::Entry;

/// The state of an archive's two collections after some pipeline stage.
///
/// A generation is immutable once published. Each collection sits behind its
/// own `Arc`, so replacing one of them leaves the other shared with the
/// previous generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    classes: Arc<EntryCollection>,
    resources: Arc<EntryCollection>,
}

impl Generation {
    /// Creates a generation from two collections.
    #[must_use]
    pub fn new(classes: EntryCollection, resources: EntryCollection) -> Self {
        Self {
            classes: Arc::new(classes),
            resources: Arc::new(resources),
        }
    }

    /// Class entries.
    #[must_use]
    pub fn classes(&self) -> &EntryCollection {
        &self.classes
    }

    /// Resource entries.
    #[must_use]
    pub fn resources(&self) -> &EntryCollection {
        &self.resources
    }

    /// Looks up an entry by name, classes first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.classes.get(name).or_else(|| self.resources.get(name))
    }

    /// Total number of entries across both collections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.classes.len() + self.resources.len()
    }

    /// Returns `true` if both collections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.resources.is_empty()
    }

    pub(crate) fn with_classes(&self, classes: EntryCollection) -> Self {
        Self {
            classes: Arc::new(classes),
            resources: Arc::clone(&self.resources),
        }
    }

    pub(crate) fn with_resources(&self, resources: EntryCollection) -> Self {
        Self {
            classes: Arc::clone(&self.classes),
            resources: Arc::new(resources),
        }
    }
}

/// An archive loaded into memory.
///
/// The current generation lives behind a single exclusive lock that is held
/// only to clone or replace an `Arc`. Transform work runs on a snapshot with
/// that lock released, and readers never see a half-replaced generation.
///
/// Writers are serialized by a second lock held from snapshot to publish, so
/// two transforms on the same archive compose instead of one overwriting the
/// other's result.
///
/// # Examples
///
/// ```
/// use jarpipe_core::Archive;
/// use jarpipe_core::CollisionPolicy;
/// use jarpipe_core::Entry;
/// use jarpipe_core::EntryCollection;
///
/// let mut resources = EntryCollection::new();
/// resources.insert(Entry::resource("data.txt", b"hello".to_vec()), CollisionPolicy::IngestFirstWins);
///
/// let archive = Archive::new("app.jar", EntryCollection::new(), resources);
/// let snapshot = archive.snapshot();
/// assert_eq!(archive.source_name(), Some("app.jar"));
/// assert!(snapshot.resources().contains("data.txt"));
/// ```
#[derive(Debug)]
pub struct Archive {
    source_name: Option<String>,
    current: Mutex<Arc<Generation>>,
    writer: Mutex<()>,
}

impl Archive {
    /// Creates an archive holding the given collections as its first
    /// generation.
    pub fn new(
        source_name: impl Into<String>,
        classes: EntryCollection,
        resources: EntryCollection,
    ) -> Self {
        Self::from_generation(source_name, Generation::new(classes, resources))
    }

    /// Creates an archive from an existing generation.
    pub fn from_generation(source_name: impl Into<String>, generation: Generation) -> Self {
        Self {
            source_name: Some(source_name.into()),
            current: Mutex::new(Arc::new(generation)),
            writer: Mutex::new(()),
        }
    }

    /// Name of the source archive, or `None` once closed.
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Returns the current generation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.lock())
    }

    /// Publishes `next` as the current generation and returns the previous
    /// one.
    ///
    /// Waits for any transform in progress on this archive to publish first.
    pub fn swap(&self, next: Generation) -> Arc<Generation> {
        let _writes = self.lock_writes();
        self.publish(next)
    }

    /// Excludes other writers until the guard is dropped. Readers are not
    /// blocked.
    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the current generation. Callers hold [`Archive::lock_writes`].
    pub(crate) fn publish(&self, next: Generation) -> Arc<Generation> {
        let next = Arc::new(next);
        std::mem::replace(&mut *self.lock(), next)
    }

    /// Publishes a new class collection, keeping the current resources.
    /// Callers hold [`Archive::lock_writes`].
    pub(crate) fn swap_classes(&self, classes: EntryCollection) {
        let mut current = self.lock();
        let next = current.with_classes(classes);
        *current = Arc::new(next);
    }

    /// Publishes a new resource collection, keeping the current classes.
    /// Callers hold [`Archive::lock_writes`].
    pub(crate) fn swap_resources(&self, resources: EntryCollection) {
        let mut current = self.lock();
        let next = current.with_resources(resources);
        *current = Arc::new(next);
    }

    /// Releases both collections and resets the source name.
    pub fn close(&mut self) {
        self.source_name = None;
        *self.current.get_mut().unwrap_or_else(PoisonError::into_inner) =
            Arc::new(Generation::default());
    }

    // The guarded values are always valid, so a poisoned lock is recovered
    // rather than propagated.
    fn lock(&self) -> MutexGuard<'_, Arc<Generation>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
