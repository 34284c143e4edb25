use std::{borrow::Cow, collections::HashMap, sync::Arc};

use ahash::RandomState;
use tracing::debug;

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::store::{
    checked_count, validate_increment, BackendKind, Enumerable, TermIter, TermStore,
};
use crate::error::{DictionaryError, Result};
use crate::utils::datastruct::trie::CharTrie;

/// Category id with its count, packed into 8 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CategoryCount {
    category: u32,
    count: u32,
}

type Slot = Box<[CategoryCount]>;

/// TrieStore
/// One character trie whose nodes carry the counts of every category.
///
/// Category names are interned once and referenced by a `u32` id from the
/// nodes, so a term costs a handful of nodes plus 8 bytes per category.
#[derive(Debug, Clone, Default)]
pub struct TrieStore {
    trie: CharTrie<Slot>,
    categories: Vec<Arc<str>>,
    category_ids: HashMap<Arc<str>, u32, RandomState>,
    unique_terms: usize,
}

impl TrieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trie nodes, root included
    pub fn node_count(&self) -> usize {
        self.trie.node_count()
    }

    fn category_id(&mut self, category: &Arc<str>) -> Result<u32> {
        if let Some(&id) = self.category_ids.get(category.as_ref()) {
            return Ok(id);
        }
        let id = u32::try_from(self.categories.len())
            .map_err(|_| DictionaryError::CapacityExceeded("trie store holds at most u32::MAX categories"))?;
        self.categories.push(Arc::clone(category));
        self.category_ids.insert(Arc::clone(category), id);
        Ok(id)
    }
}

fn materialize(categories: &[Arc<str>], slot: &[CategoryCount]) -> CategoryEntries {
    let mut entries = CategoryEntries::with_capacity(slot.len());
    for cc in slot {
        if let Some(name) = categories.get(cc.category as usize) {
            entries.append_unique(Arc::clone(name), u64::from(cc.count));
        }
    }
    entries
}

impl TermStore for TrieStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Trie
    }

    fn get(&self, term: &str) -> Cow<'_, CategoryEntries> {
        match self.trie.get(term) {
            Some(slot) => Cow::Owned(materialize(&self.categories, slot)),
            None => Cow::Owned(CategoryEntries::new()),
        }
    }

    fn count(&self, term: &str, category: &str) -> u64 {
        let Some(&id) = self.category_ids.get(category) else {
            return 0;
        };
        self.trie
            .get(term)
            .and_then(|slot| slot.iter().find(|cc| cc.category == id))
            .map_or(0, |cc| u64::from(cc.count))
    }

    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()> {
        validate_increment(term, category)?;
        let updated = checked_count(category, self.count(term, category), delta)?;
        if delta == 0 {
            return Ok(());
        }
        let id = self.category_id(category)?;
        let slot = self.trie.get_or_insert(term)?;
        let was_vacant = slot.is_empty();
        match slot.iter_mut().find(|cc| cc.category == id) {
            Some(cc) => cc.count = updated,
            None => {
                let mut grown = std::mem::take(slot).into_vec();
                grown.push(CategoryCount {
                    category: id,
                    count: updated,
                });
                *slot = grown.into_boxed_slice();
            }
        }
        if was_vacant {
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
        let categories = &self.categories;
        let mut removed = 0;
        for slot in self.trie.values_mut() {
            if slot.is_empty() {
                continue;
            }
            if !keep(&materialize(categories, slot)) {
                *slot = Box::new([]);
                removed += 1;
            }
        }
        self.unique_terms -= removed;
        removed
    }

    fn term_totals(&self) -> CategoryEntries {
        let mut sums = vec![0u64; self.categories.len()];
        for (_, slot) in self.trie.iter() {
            for cc in slot.iter() {
                sums[cc.category as usize] += u64::from(cc.count);
            }
        }
        let mut totals = CategoryEntries::with_capacity(sums.len());
        for (name, sum) in self.categories.iter().zip(sums) {
            totals.append_unique(Arc::clone(name), sum);
        }
        totals
    }

    fn sort_entries(&mut self) {
        let categories = &self.categories;
        for slot in self.trie.values_mut() {
            slot.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| categories[a.category as usize].cmp(&categories[b.category as usize]))
            });
        }
    }

    fn compact(&mut self) {
        let removed = self.trie.compact();
        debug!(removed, remaining = self.trie.node_count(), "compacted trie store");
    }
}

impl Enumerable for TrieStore {
    fn iter(&self) -> TermIter<'_> {
        let categories = &self.categories;
        Box::new(
            self.trie
                .iter()
                .map(move |(term, slot)| (Cow::Owned(term), Cow::Owned(materialize(categories, slot)))),
        )
    }
}
