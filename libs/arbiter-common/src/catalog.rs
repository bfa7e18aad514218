// Language catalog
// Static mapping from backend language id to canonical language name

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    pub id: u32,
    pub name: &'static str,
}

const fn entry(id: u32, name: &'static str) -> LanguageEntry {
    LanguageEntry { id, name }
}

/// Sorted by id so lookups can binary search
const ENTRIES: &[LanguageEntry] = &[
    entry(50, "c"),
    entry(51, "csharp"),
    entry(54, "cpp17"),
    entry(62, "java"),
    entry(63, "javascript"),
    entry(71, "python3"),
    entry(73, "rust"),
    entry(74, "typescript"),
    entry(75, "go"),
    entry(76, "kotlin"),
    entry(77, "swift"),
    entry(78, "php"),
    entry(79, "ruby"),
    entry(80, "scala"),
    entry(81, "dart"),
    entry(82, "elixir"),
    entry(83, "erlang"),
    entry(84, "haskell"),
    entry(85, "clojure"),
    entry(86, "lua"),
    entry(87, "perl"),
    entry(88, "r"),
    entry(89, "sql"),
    entry(90, "bash"),
    entry(91, "powershell"),
    entry(92, "cobol"),
    entry(93, "fortran"),
    entry(94, "pascal"),
    entry(95, "prolog"),
    entry(96, "scheme"),
    entry(97, "smalltalk"),
    entry(98, "tcl"),
    entry(99, "whitespace"),
    entry(100, "brainfuck"),
];

static GLOBAL: LanguageCatalog = LanguageCatalog { entries: ENTRIES };

/// Registry of languages the backend is asked to run.
/// This is the authoritative source for which language ids are accepted.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct LanguageCatalog {
    entries: &'static [LanguageEntry],
}

impl LanguageCatalog {
    /// Process-wide catalog, shared read-only by every task
    pub fn global() -> &'static LanguageCatalog {
        &GLOBAL
    }

    pub fn name(&self, id: u32) -> Option<&'static str> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| self.entries[idx].name)
    }

    pub fn is_supported(&self, id: u32) -> bool {
        self.name(id).is_some()
    }

    /// Reverse lookup, case-insensitive
    pub fn id_for(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn entries(&self) -> &'static [LanguageEntry] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sorted_and_unique() {
        let ids = LanguageCatalog::global().ids();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len(), 34);
    }

    #[test]
    fn test_lookup() {
        let catalog = LanguageCatalog::global();
        assert_eq!(catalog.name(71), Some("python3"));
        assert_eq!(catalog.name(63), Some("javascript"));
        assert_eq!(catalog.name(54), Some("cpp17"));
        assert!(!catalog.is_supported(1));
        assert!(!catalog.is_supported(101));
    }

    #[test]
    fn test_reverse_lookup() {
        let catalog = LanguageCatalog::global();
        assert_eq!(catalog.id_for("Rust"), Some(73));
        assert_eq!(catalog.id_for("cobol"), Some(92));
        assert_eq!(catalog.id_for("fortran77"), None);
    }
}
