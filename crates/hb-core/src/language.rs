//! Language classification from file suffixes.
//!
//! A mapping key such as `ts` or `test.ts` matches an entity ending in
//! `.ts` / `.test.ts`. Keys with more `.` characters are more specific and
//! win; equal specificity falls back to the lexicographically smallest key,
//! so resolution never depends on the order the table was built in.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::heartbeat::Heartbeat;

/// One suffix mapping, pre-computed for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Mapping {
    suffix: String,
    /// `suffix` with a leading `.`.
    dotted: String,
    /// Number of `.` characters in `suffix`.
    precision: usize,
    language: String,
}

/// An immutable suffix → language table in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageMappings {
    entries: Vec<Mapping>,
}

impl LanguageMappings {
    pub fn new<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<Mapping> = mappings
            .into_iter()
            .filter_map(|(suffix, language)| {
                let suffix = suffix.into();
                if suffix.is_empty() {
                    return None;
                }
                Some(Mapping {
                    dotted: format!(".{suffix}"),
                    precision: suffix.matches('.').count(),
                    suffix,
                    language: language.into(),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.precision
                .cmp(&a.precision)
                .then_with(|| a.suffix.cmp(&b.suffix))
        });
        // Later duplicates of the same suffix override earlier ones.
        entries.reverse();
        entries.dedup_by(|later, earlier| later.suffix == earlier.suffix);
        entries.reverse();

        Self { entries }
    }

    /// Returns the language of the most specific suffix matching `entity`.
    pub fn resolve(&self, entity: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|mapping| entity.ends_with(&mapping.dotted))
            .map(|mapping| mapping.language.as_str())
    }

    /// Iterates `(suffix, language)` pairs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|mapping| (mapping.suffix.as_str(), mapping.language.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LanguageMappings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<BTreeMap<String, String>> for LanguageMappings {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::new(map)
    }
}

impl<S: std::hash::BuildHasher> From<HashMap<String, String, S>> for LanguageMappings {
    fn from(map: HashMap<String, String, S>) -> Self {
        Self::new(map)
    }
}

impl Heartbeat {
    /// Sets `language` from the entity's suffix when a mapping matches.
    ///
    /// A match overwrites any language the client reported; no match leaves
    /// the field as it was.
    pub fn augment(&mut self, mappings: &LanguageMappings) -> &mut Self {
        if let Some(language) = mappings.resolve(&self.entity) {
            language.clone_into(&mut self.language);
        }
        self
    }
}

/// A language table that can be swapped at runtime.
///
/// Readers take an [`Arc`] snapshot and keep using it for as long as they
/// need; [`replace`](Self::replace) swaps in a whole new table, so no reader
/// ever sees a half-updated one.
#[derive(Debug, Default)]
pub struct SharedLanguageMappings {
    current: RwLock<Arc<LanguageMappings>>,
}

impl SharedLanguageMappings {
    pub fn new(mappings: LanguageMappings) -> Self {
        Self {
            current: RwLock::new(Arc::new(mappings)),
        }
    }

    pub fn snapshot(&self) -> Arc<LanguageMappings> {
        // The guarded value is a single Arc; a poisoned lock still holds a
        // complete table.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, mappings: LanguageMappings) {
        let next = Arc::new(mappings);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = next;
        tracing::debug!(entries = current.len(), "language mappings replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typescript_pairs() -> Vec<(&'static str, &'static str)> {
        vec![("ts", "TypeScript"), ("test.ts", "TypeScript-Test")]
    }

    fn heartbeat(entity: &str) -> Heartbeat {
        Heartbeat {
            entity: entity.to_string(),
            ..Heartbeat::default()
        }
    }

    #[test]
    fn more_specific_suffix_wins_in_any_order() {
        let forward: LanguageMappings = typescript_pairs().into_iter().collect();
        let backward: LanguageMappings = typescript_pairs().into_iter().rev().collect();

        for mappings in [&forward, &backward] {
            let mut hb = heartbeat("foo.test.ts");
            hb.augment(mappings);
            assert_eq!(hb.language, "TypeScript-Test");
        }
        assert_eq!(forward, backward);
    }

    #[test]
    fn hash_map_input_is_deterministic() {
        let map: HashMap<String, String> = typescript_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mappings = LanguageMappings::from(map);
        assert_eq!(mappings.resolve("src/app.test.ts"), Some("TypeScript-Test"));
        assert_eq!(mappings.resolve("src/app.ts"), Some("TypeScript"));
    }

    #[test]
    fn resolution_order_is_precision_then_key() {
        let mappings = LanguageMappings::new([
            ("c", "Plain"),
            ("b.c", "Second"),
            ("zz", "Z"),
            ("a.b.c", "Deep"),
            ("z", "Shorter"),
        ]);
        assert_eq!(mappings.resolve("x.a.b.c"), Some("Deep"));
        assert_eq!(mappings.resolve("x.b.c"), Some("Second"));
        assert_eq!(mappings.resolve("file.zz"), Some("Z"));
        assert_eq!(mappings.resolve("file.z"), Some("Shorter"));

        let ordered: Vec<_> = mappings.iter().map(|(suffix, _)| suffix).collect();
        assert_eq!(ordered, vec!["a.b.c", "b.c", "c", "z", "zz"]);
    }

    #[test]
    fn suffix_must_follow_a_dot() {
        let mappings = LanguageMappings::new([("vue", "Vue")]);
        assert_eq!(mappings.resolve("App.vue"), Some("Vue"));
        assert_eq!(mappings.resolve("preview"), None);
        assert_eq!(mappings.resolve("vue"), None);
    }

    #[test]
    fn no_match_keeps_existing_language() {
        let mappings = LanguageMappings::new([("vue", "Vue")]);
        let mut hb = heartbeat("main.rs");
        hb.language = "Rust".to_string();
        hb.augment(&mappings);
        assert_eq!(hb.language, "Rust");

        let mut hb = heartbeat("main.rs");
        hb.augment(&mappings);
        assert_eq!(hb.language, "");
    }

    #[test]
    fn match_overrides_client_language() {
        let mappings = LanguageMappings::new([("ipynb", "Python")]);
        let mut hb = heartbeat("notebook.ipynb");
        hb.language = "JSON".to_string();
        hb.augment(&mappings);
        assert_eq!(hb.language, "Python");
    }

    #[test]
    fn empty_keys_are_dropped_and_duplicates_keep_last() {
        let mappings = LanguageMappings::new([("", "Nothing"), ("js", "JavaScript"), ("js", "JS")]);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings.resolve("file."), None);
        assert_eq!(mappings.resolve("index.js"), Some("JS"));
    }

    #[test]
    fn shared_snapshot_survives_replace() {
        let shared = SharedLanguageMappings::new(LanguageMappings::new([("vue", "Vue")]));
        let before = shared.snapshot();

        shared.replace(LanguageMappings::new([("vue", "Vue.js"), ("svelte", "Svelte")]));
        let after = shared.snapshot();

        assert_eq!(before.len(), 1);
        assert_eq!(before.resolve("a.vue"), Some("Vue"));
        assert_eq!(after.len(), 2);
        assert_eq!(after.resolve("a.vue"), Some("Vue.js"));
    }

    #[test]
    fn concurrent_readers_see_whole_tables() {
        let shared = Arc::new(SharedLanguageMappings::new(LanguageMappings::new([
            ("a", "A"),
            ("b", "A"),
        ])));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let shared = Arc::clone(&shared);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let table = shared.snapshot();
                        let languages: Vec<_> = table.iter().map(|(_, lang)| lang).collect();
                        assert_eq!(languages.len(), 2);
                        assert!(languages.windows(2).all(|w| w[0] == w[1]));
                    }
                });
            }
            for round in 0..50 {
                let lang = if round % 2 == 0 { "B" } else { "A" };
                shared.replace(LanguageMappings::new([("a", lang), ("b", lang)]));
            }
        });
    }
}
