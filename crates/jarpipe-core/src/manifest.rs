//! Minimal JAR manifest model.
//!
//! Only the main section is interpreted. Per-entry sections (everything after
//! the first blank line) are carried through as raw bytes.

/// Path of the manifest inside a JAR.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Main-section attribute naming the entry point class.
pub const MAIN_CLASS: &str = "Main-Class";

const MAX_LINE_BYTES: usize = 72;

/// A parsed `META-INF/MANIFEST.MF`.
///
/// # Examples
///
/// ```
/// use jarpipe_core::Manifest;
///
/// let mut manifest = Manifest::parse(b"Manifest-Version: 1.0\r\nMain-Class: app.Main\r\n\r\n");
/// assert_eq!(manifest.main_class(), Some("app.Main"));
///
/// manifest.remove_main_class();
/// assert_eq!(manifest.to_bytes(), b"Manifest-Version: 1.0\r\n\r\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Vec<(String, String)>,
    sections: Vec<u8>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses manifest bytes.
    ///
    /// Parsing is lenient: CRLF and LF line endings are both accepted, a line
    /// starting with a single space continues the previous value, and lines
    /// without a `:` separator are ignored.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut main: Vec<(String, String)> = Vec::new();
        let mut consumed = 0usize;

        for raw in text.split_inclusive('\n') {
            consumed += raw.len();
            let line = raw.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if main.is_empty() {
                    continue;
                }
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                if let Some((_, value)) = main.last_mut() {
                    value.push_str(rest);
                }
                continue;
            }

            if let Some((name, value)) = line.split_once(':') {
                let value = value.strip_prefix(' ').unwrap_or(value);
                main.push((name.trim().to_owned(), value.to_owned()));
            }
        }

        let sections = text.as_bytes()[consumed.min(text.len())..].to_vec();
        Self { main, sections }
    }

    /// Returns the value of a main-section attribute (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a main-section attribute, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .main
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.main.push((name.to_owned(), value)),
        }
    }

    /// Removes a main-section attribute. Returns the removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .main
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.main.remove(index).1)
    }

    /// Returns the declared main class.
    #[must_use]
    pub fn main_class(&self) -> Option<&str> {
        self.get(MAIN_CLASS)
    }

    /// Declares `class` as the main class.
    pub fn set_main_class(&mut self, class: impl Into<String>) {
        self.set(MAIN_CLASS, class);
    }

    /// Removes the main class declaration.
    pub fn remove_main_class(&mut self) -> Option<String> {
        self.remove(MAIN_CLASS)
    }

    /// Main-section attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.main.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the manifest with CRLF line endings.
    ///
    /// Lines longer than 72 bytes are wrapped onto continuation lines.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.main {
            write_wrapped(&mut out, &format!("{name}: {value}"));
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.sections);
        out
    }
}

fn write_wrapped(out: &mut Vec<u8>, line: &str) {
    let mut rest = line;
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.extend_from_slice(rest.as_bytes());
            out.extend_from_slice(b"\r\n");
            return;
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.extend_from_slice(&rest.as_bytes()[..split]);
        out.extend_from_slice(b"\r\n ");
        rest = &rest[split..];
        // Continuation lines start with a space.
        limit = MAX_LINE_BYTES - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_section() {
        let manifest = Manifest::parse(
            b"Manifest-Version: 1.0\r\nCreated-By: test\r\nMain-Class: app.Main\r\n\r\n",
        );
        assert_eq!(manifest.get("manifest-version"), Some("1.0"));
        assert_eq!(manifest.main_class(), Some("app.Main"));
        assert_eq!(manifest.attributes().count(), 3);
    }

    #[test]
    fn test_parse_lf_and_continuations() {
        let manifest = Manifest::parse(b"Manifest-Version: 1.0\nClass-Path: a.jar\n  b.jar\n");
        assert_eq!(manifest.get("Class-Path"), Some("a.jar b.jar"));
    }

    #[test]
    fn test_sections_kept_verbatim() {
        let input = b"Manifest-Version: 1.0\r\n\r\nName: a/B.class\r\nSHA-256-Digest: xyz\r\n\r\n";
        let manifest = Manifest::parse(input);
        assert_eq!(manifest.attributes().count(), 1);
        assert_eq!(manifest.to_bytes(), input.to_vec());
    }

    #[test]
    fn test_set_and_remove_main_class() {
        let mut manifest = Manifest::parse(b"Manifest-Version: 1.0\r\nmain-class: old.Main\r\n\r\n");
        manifest.set_main_class("new.Main");
        assert_eq!(manifest.main_class(), Some("new.Main"));
        assert_eq!(manifest.attributes().count(), 2);

        assert_eq!(manifest.remove_main_class().as_deref(), Some("new.Main"));
        assert_eq!(manifest.main_class(), None);
        assert_eq!(manifest.remove_main_class(), None);
    }

    #[test]
    fn test_long_lines_wrap() {
        let mut manifest = Manifest::new();
        let long = "x".repeat(150);
        manifest.set("Class-Path", long.clone());
        let bytes = manifest.to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap_or_default();
        for line in text.split("\r\n") {
            assert!(line.len() <= MAX_LINE_BYTES, "line too long: {line}");
        }
        assert_eq!(Manifest::parse(&bytes).get("Class-Path"), Some(long.as_str()));
    }

    #[test]
    fn test_parse_ignores_garbage() {
        let manifest = Manifest::parse(b"not a header\r\nMain-Class: a.B\r\n");
        assert_eq!(manifest.main_class(), Some("a.B"));
        assert_eq!(manifest.attributes().count(), 1);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse(b"");
        assert_eq!(manifest, Manifest::new());
        assert_eq!(manifest.to_bytes(), b"\r\n");
    }
}
