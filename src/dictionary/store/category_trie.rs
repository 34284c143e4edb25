use std::{borrow::Cow, sync::Arc};

use tracing::debug;

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::store::{
    checked_count, validate_increment, BackendKind, Enumerable, TermIter, TermStore,
};
use crate::error::Result;
use crate::utils::datastruct::trie::CharTrie;

/// CategoryTrieStore
/// One character trie per category, each node holding a single count.
///
/// Lookups probe every trie, so this layout pays off with few categories
/// and large, category-specific vocabularies.
#[derive(Debug, Clone, Default)]
pub struct CategoryTrieStore {
    tries: Vec<(Arc<str>, CharTrie<u32>)>,
    unique_terms: usize,
}

impl CategoryTrieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains_term(&self, term: &str) -> bool {
        self.tries.iter().any(|(_, trie)| trie.get(term).is_some())
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.tries.iter().position(|(name, _)| name.as_ref() == category)
    }

    fn count_at(&self, idx: Option<usize>, term: &str) -> u64 {
        idx.and_then(|idx| self.tries[idx].1.get(term))
            .map_or(0, |&count| u64::from(count))
    }

    /// Number of nodes summed over all tries
    pub fn node_count(&self) -> usize {
        self.tries.iter().map(|(_, trie)| trie.node_count()).sum()
    }
}

impl TermStore for CategoryTrieStore {
    fn kind(&self) -> BackendKind {
        BackendKind::CategoryTrie
    }

    fn get(&self, term: &str) -> Cow<'_, CategoryEntries> {
        let mut entries = CategoryEntries::new();
        for (name, trie) in &self.tries {
            if let Some(&count) = trie.get(term) {
                entries.append_unique(Arc::clone(name), u64::from(count));
            }
        }
        Cow::Owned(entries)
    }

    fn count(&self, term: &str, category: &str) -> u64 {
        self.count_at(self.position(category), term)
    }

    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()> {
        validate_increment(term, category)?;
        let idx = self.position(category);
        let current = self.count_at(idx, term);
        let updated = checked_count(category, current, delta)?;
        if delta == 0 {
            return Ok(());
        }
        // the other tries only matter the first time this pair is seen
        let new_term = current == 0 && !self.contains_term(term);
        let idx = match idx {
            Some(idx) => idx,
            None => {
                self.tries.push((Arc::clone(category), CharTrie::new()));
                self.tries.len() - 1
            }
        };
        *self.tries[idx].1.get_or_insert(term)? = updated;
        if new_term {
            self.unique_terms += 1;
        }
        Ok(())
    }

    fn unique_terms(&self) -> usize {
        self.unique_terms
    }

    fn entries(&self) -> Result<TermIter<'_>> {
        Ok(self.iter())
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&CategoryEntries) -> bool) -> usize {
        let rejected: Vec<String> = self
            .iter()
            .filter(|(_, entries)| !keep(&**entries))
            .map(|(term, _)| term.into_owned())
            .collect();
        for term in &rejected {
            for (_, trie) in self.tries.iter_mut() {
                if let Some(count) = trie.get_mut(term) {
                    *count = 0;
                }
            }
        }
        self.unique_terms -= rejected.len();
        rejected.len()
    }

    fn term_totals(&self) -> CategoryEntries {
        let mut totals = CategoryEntries::with_capacity(self.tries.len());
        for (name, trie) in &self.tries {
            let sum = trie.iter().map(|(_, &count)| u64::from(count)).sum();
            totals.append_unique(Arc::clone(name), sum);
        }
        totals
    }

    fn compact(&mut self) {
        let removed: usize = self.tries.iter_mut().map(|(_, trie)| trie.compact()).sum();
        self.tries.retain(|(_, trie)| trie.iter().next().is_some());
        debug!(removed, tries = self.tries.len(), "compacted category trie store");
    }
}

impl Enumerable for CategoryTrieStore {
    /// Terms of the first trie first, then the terms each later trie adds
    fn iter(&self) -> TermIter<'_> {
        Box::new(self.tries.iter().enumerate().flat_map(move |(idx, (_, trie))| {
            let earlier = &self.tries[..idx];
            trie.iter()
                .filter(move |(term, _)| earlier.iter().all(|(_, other)| other.get(term).is_none()))
                .map(move |(term, _)| {
                    let entries = self.get(&term).into_owned();
                    (Cow::Owned(term), Cow::Owned(entries))
                })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::store::tests::{check_contract, name};

    #[test]
    fn satisfies_store_contract() {
        check_contract(CategoryTrieStore::new());
    }

    #[test]
    fn terms_shared_by_categories_are_listed_once() {
        let mut store = CategoryTrieStore::new();
        let x = name("X");
        let y = name("Y");
        store.increment("a", &x, 1).unwrap();
        store.increment("b", &y, 1).unwrap();
        store.increment("a", &y, 2).unwrap();

        assert_eq!(store.unique_terms(), 2);
        let listed: Vec<(String, u64)> = store
            .iter()
            .map(|(term, entries)| (term.into_owned(), entries.total()))
            .collect();
        assert_eq!(listed, vec![("a".to_string(), 3), ("b".to_string(), 1)]);
    }

    #[test]
    fn repeated_pairs_count_one_term() {
        let mut store = CategoryTrieStore::new();
        let x = name("X");
        let y = name("Y");
        for _ in 0..3 {
            store.increment("a", &x, 1).unwrap();
        }
        store.increment("a", &y, 1).unwrap();
        store.increment("a", &y, 4).unwrap();
        store.increment("b", &y, 0).unwrap();

        assert_eq!(store.unique_terms(), 1);
        assert_eq!(store.count("a", "X"), 3);
        assert_eq!(store.count("a", "Y"), 5);
        assert_eq!(store.count("a", "Z"), 0);
    }

    #[test]
    fn compact_drops_emptied_tries() {
        let mut store = CategoryTrieStore::new();
        store.increment("a", &name("X"), 1).unwrap();
        store.increment("b", &name("Y"), 5).unwrap();
        assert_eq!(store.retain(&mut |entries| entries.total() > 1), 1);
        store.compact();
        // only the Y trie is left: root + b
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.term_totals().len(), 1);
    }
}
