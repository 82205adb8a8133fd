//! Archive entry type.

use std::fmt;
use std::sync::Arc;

/// Immutable, shareable entry payload.
///
/// Cloning a payload only bumps a reference count, so generations produced by
/// the pipeline share unchanged buffers with their predecessors.
pub type Payload = Arc<[u8]>;

/// Marker an entry name must contain to be treated as a class entry.
pub const CLASS_MARKER: &str = ".class";

/// Classification of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Compiled class file.
    Class,
    /// Any other file (manifests, properties, images, ...).
    Resource,
}

impl EntryKind {
    /// Classifies an entry by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use jarpipe_core::EntryKind;
    ///
    /// assert_eq!(EntryKind::classify("com/x/Y.class"), EntryKind::Class);
    /// assert_eq!(EntryKind::classify("META-INF/MANIFEST.MF"), EntryKind::Resource);
    /// ```
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name.contains(CLASS_MARKER) {
            Self::Class
        } else {
            Self::Resource
        }
    }

    /// Returns a lowercase label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, immutable payload inside an archive.
///
/// Entries are values: a transform never edits one in place, it returns a
/// new entry (possibly under a new name).
///
/// # Examples
///
/// ```
/// use jarpipe_core::Entry;
/// use jarpipe_core::EntryKind;
///
/// let entry = Entry::class("com/x/Y.class", vec![0xCA, 0xFE, 0xBA, 0xBE]);
/// assert_eq!(entry.kind(), EntryKind::Class);
/// assert_eq!(entry.bytes(), &[0xCA, 0xFE, 0xBA, 0xBE]);
///
/// let renamed = entry.renamed("com/x/Z.class");
/// assert_eq!(renamed.name(), "com/x/Z.class");
/// assert_eq!(renamed.bytes(), entry.bytes());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    payload: Option<Payload>,
    kind: EntryKind,
}

impl Entry {
    /// Creates an entry of the given kind.
    pub fn new(name: impl Into<String>, payload: impl Into<Payload>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload.into()),
            kind,
        }
    }

    /// Creates a class entry.
    pub fn class(name: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(name, payload, EntryKind::Class)
    }

    /// Creates a resource entry.
    pub fn resource(name: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(name, payload, EntryKind::Resource)
    }

    /// Creates a resource entry that carries no payload.
    ///
    /// Such entries survive transformation but are skipped when an output
    /// archive is assembled.
    pub fn resource_without_payload(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            kind: EntryKind::Resource,
        }
    }

    /// Returns the archive-relative name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the payload, if present.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Returns the payload bytes, or an empty slice if there is no payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }

    /// Returns `true` if the entry carries a payload.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns the entry kind.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Returns a copy of this entry under a different name, sharing the
    /// payload.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: self.payload.clone(),
            kind: self.kind,
        }
    }

    /// Returns this entry tagged with `kind`.
    #[must_use]
    pub(crate) fn into_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("len", &self.payload.as_ref().map(|p| p.len()))
            .finish()
    }
}
