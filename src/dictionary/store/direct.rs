use std::{borrow::Cow, sync::Arc};

use ahash::RandomState;
use indexmap::IndexMap;

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::store::{
    checked_count, validate_increment, BackendKind, Enumerable, TermIter, TermStore, EMPTY_ENTRIES,
};
use crate::error::Result;

/// DirectStore
/// Term -> `CategoryEntries` in an insertion-ordered hash map.
/// The simplest encoding with the most overhead per term; it serves as the
/// reference the other stores are checked against.
#[derive(Debug, Clone, Default)]
pub struct DirectStore {
    terms: IndexMap<Box<str>, CategoryEntries, RandomState>,
}

impl DirectStore {
    pub fn new() -> Self {
        Self {
            terms: IndexMap::with_hasher(RandomState::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            terms: IndexMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }
}

impl TermStore for DirectStore {
    fn kind(&self) -> BackendKind {
        BackendKind::DirectMap
    }

    fn get(&self, term: &str) -> Cow<'_, CategoryEntries> {
        match self.terms.get(term) {
            Some(entries) => Cow::Borrowed(entries),
            None => Cow::Borrowed(&EMPTY_ENTRIES),
        }
    }

    fn count(&self, term: &str, category: &str) -> u64 {
        self.terms.get(term).map_or(0, |entries| entries.get(category))
    }

    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()> {
        validate_increment(term, category)?;
        checked_count(category, self.count(term, category), delta)?;
        if delta == 0 {
            return Ok(());
        }
        match self.terms.get_mut(term) {
            Some(entries) => entries.increment_shared(category, delta),
            None => {
                let mut entries = CategoryEntries::with_capacity(1);
                entries.increment_shared(category, delta)?;
                self.terms.insert(term.into(), entries);
                Ok(())
            }
        }
    }

    fn unique_terms(&self) -> usize {
        self.terms.len()
    }

    fn entries(&self) -> Result<TermIter<'_>> {
        Ok(self.iter())
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&CategoryEntries) -> bool) -> usize {
        let before = self.terms.len();
        self.terms.retain(|_, entries| keep(entries));
        before - self.terms.len()
    }

    fn term_totals(&self) -> CategoryEntries {
        let mut sums: IndexMap<&Arc<str>, u64, RandomState> = IndexMap::default();
        for entries in self.terms.values() {
            for category in entries {
                let sum = sums.entry(&category.name).or_insert(0);
                *sum = sum.saturating_add(category.count);
            }
        }
        let mut totals = CategoryEntries::with_capacity(sums.len());
        for (name, sum) in sums {
            totals.append_unique(Arc::clone(name), sum);
        }
        totals
    }

    fn sort_entries(&mut self) {
        for entries in self.terms.values_mut() {
            entries.sort_by_count();
        }
    }

    fn compact(&mut self) {
        self.terms.shrink_to_fit();
    }
}

impl Enumerable for DirectStore {
    fn iter(&self) -> TermIter<'_> {
        Box::new(
            self.terms
                .iter()
                .map(|(term, entries)| (Cow::Borrowed(term.as_ref()), Cow::Borrowed(entries))),
        )
    }
}
