//! Keyed entry collections and their collision policies.

use std::collections::HashMap;
use std::collections::hash_map;

use super::entry::Entry;

/// How a write that collides with an existing name is resolved.
///
/// Each pipeline stage resolves collisions differently, and the difference is
/// deliberate. The policies are kept as distinct variants so a call site
/// always names the rule it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Ingestion: the first decoded occurrence of a name is kept.
    IngestFirstWins,
    /// Transform fan-in: the entry inserted last replaces earlier ones.
    StageLastWins,
    /// Merge: an entry from an earlier source archive is kept.
    MergeFirstArchiveWins,
}

/// Result of inserting an entry into a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The name was free.
    Inserted,
    /// The new entry replaced an existing one.
    Replaced,
    /// The new entry was dropped in favor of the existing one.
    Discarded,
}

impl InsertOutcome {
    /// Returns `true` if the insert hit an existing name.
    #[must_use]
    pub const fn collided(self) -> bool {
        !matches!(self, Self::Inserted)
    }
}

/// Mapping from entry name to entry. Names are unique.
///
/// # Examples
///
/// ```
/// use jarpipe_core::CollisionPolicy;
/// use jarpipe_core::Entry;
/// use jarpipe_core::EntryCollection;
/// use jarpipe_core::InsertOutcome;
///
/// let mut resources = EntryCollection::new();
/// resources.insert(Entry::resource("a.txt", b"one".to_vec()), CollisionPolicy::IngestFirstWins);
/// let outcome = resources.insert(
///     Entry::resource("a.txt", b"two".to_vec()),
///     CollisionPolicy::IngestFirstWins,
/// );
/// assert_eq!(outcome, InsertOutcome::Discarded);
/// assert_eq!(resources.get("a.txt").map(|e| e.bytes()), Some(&b"one"[..]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryCollection {
    entries: HashMap<String, Entry>,
}

impl EntryCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts `entry` under its own name, resolving collisions with `policy`.
    pub fn insert(&mut self, entry: Entry, policy: CollisionPolicy) -> InsertOutcome {
        match self.entries.entry(entry.name().to_owned()) {
            hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                InsertOutcome::Inserted
            }
            hash_map::Entry::Occupied(mut slot) => match policy {
                CollisionPolicy::StageLastWins => {
                    slot.insert(entry);
                    InsertOutcome::Replaced
                }
                CollisionPolicy::IngestFirstWins | CollisionPolicy::MergeFirstArchiveWins => {
                    InsertOutcome::Discarded
                }
            },
        }
    }

    /// Returns the entry stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Returns `true` if an entry is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes and returns the entry stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Returns the entries sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        entries
    }

    /// Returns the entry names sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.sorted().into_iter().map(Entry::name).collect()
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.bytes().len() as u64).sum()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
