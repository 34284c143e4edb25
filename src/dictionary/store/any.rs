use std::{borrow::Cow, sync::Arc};

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::store::{
    BackendKind, CategoryTrieStore, DirectStore, HashedStore, TermIter, TermStore, TrieStore,
};
use crate::error::Result;

/// Store picked at runtime, e.g. from a `DictionaryConfig`.
///
/// Whether the terms can be listed is only known at runtime here:
/// `entries` on the hashed variant fails with `UnsupportedOperation`.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Direct(DirectStore),
    Trie(TrieStore),
    CategoryTrie(CategoryTrieStore),
    Hashed(HashedStore),
}

macro_rules! dispatch {
    ($self:expr, $store:ident => $body:expr) => {
        match $self {
            AnyStore::Direct($store) => $body,
            AnyStore::Trie($store) => $body,
            AnyStore::CategoryTrie($store) => $body,
            AnyStore::Hashed($store) => $body,
        }
    };
}

impl AnyStore {
    /// Empty store of the given kind
    pub fn new(kind: BackendKind) -> Self {
        match kind {
            BackendKind::DirectMap => AnyStore::Direct(DirectStore::new()),
            BackendKind::Trie => AnyStore::Trie(TrieStore::new()),
            BackendKind::CategoryTrie => AnyStore::CategoryTrie(CategoryTrieStore::new()),
            BackendKind::Hashed => AnyStore::Hashed(HashedStore::new()),
        }
    }
}

impl Default for AnyStore {
    fn default() -> Self {
        AnyStore::new(BackendKind::default())
    }
}

impl From<DirectStore> for AnyStore {
    fn from(store: DirectStore) -> Self {
        AnyStore::Direct(store)
    }
}

impl From<TrieStore> for AnyStore {
    fn from(store: TrieStore) -> Self {
        AnyStore::Trie(store)
    }
}

impl From<CategoryTrieStore> for AnyStore {
    fn from(store: CategoryTrieStore) -> Self {
        AnyStore::CategoryTrie(store)
    }
}

impl From<HashedStore> for AnyStore {
    fn from(store: HashedStore) -> Self {
        AnyStore::Hashed(store)
    }
}

impl TermStore for AnyStore {
    fn kind(&self) -> BackendKind {
        dispatch!(self, s => s.kind())
    }

    fn get(&self, term: &str) -> Cow<'_, CategoryEntries> {
        dispatch!(self, s => s.get(term))
    }

    fn count(&self, term: &str, category: &str) -> u64 {
        dispatch!(self, s => s.count(term, category))
    }

    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()> {
        dispatch!(self, s => s.increment(term, category, delta))
    }

    fn check_categories(&self, categories: &[&str]) -> Result<()> {
        dispatch!(self, s => s.check_categories(categories))
    }

    fn unique_terms(&self) -> usize {
        dispatch!(self, s => s.unique_terms())
    }

    fn entries(&self) -> Result<TermIter<'_>> {
        dispatch!(self, s => s.entries())
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&CategoryEntries) -> bool) -> usize {
        dispatch!(self, s => s.retain(keep))
    }

    fn term_totals(&self) -> CategoryEntries {
        dispatch!(self, s => s.term_totals())
    }

    fn sort_entries(&mut self) {
        dispatch!(self, s => s.sort_entries())
    }

    fn compact(&mut self) {
        dispatch!(self, s => s.compact())
    }

    fn as_hashed(&self) -> Option<&HashedStore> {
        dispatch!(self, s => s.as_hashed())
    }
}
