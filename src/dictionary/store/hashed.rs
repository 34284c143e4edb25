use std::{borrow::Cow, collections::HashMap, hash::Hasher, sync::Arc};

use ahash::RandomState;
use tracing::warn;
use twox_hash::XxHash32;

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::store::{
    checked_count, validate_increment, BackendKind, TermIter, TermStore,
};
use crate::error::{DictionaryError, Result};

/// 32-bit xxHash of a term or category name
#[inline]
pub fn hash32(value: &str) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(value.as_bytes());
    hasher.finish() as u32
}

fn collision(known: &str, category: &str, hash: u32) -> DictionaryError {
    warn!(%known, %category, hash, "category hash collision");
    DictionaryError::InvalidArgument(format!(
        "category `{category}` collides with `{known}` (hash {hash:#010x})"
    ))
}

#[inline]
fn pack(category: u32, count: u32) -> u64 {
    (u64::from(category) << 32) | u64::from(count)
}

#[inline]
fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// HashedStore
/// Terms and categories reduced to 32-bit hashes; each term keeps an array
/// of 64-bit words packing `category hash << 32 | count`.
///
/// Term strings are never stored, so the store cannot list its terms and
/// `entries` fails with `UnsupportedOperation`. Distinct terms that collide
/// share one record. Category names are kept in a small reverse table.
#[derive(Debug, Clone, Default)]
pub struct HashedStore {
    terms: HashMap<u32, Box<[u64]>, RandomState>,
    categories: HashMap<u32, Arc<str>, RandomState>,
}

impl HashedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category name under its hash.
    ///
    /// # Errors
    /// `InvalidArgument` if a different name already owns the hash
    pub(crate) fn register_category(&mut self, category: &Arc<str>) -> Result<u32> {
        let hash = hash32(category);
        match self.categories.get(&hash) {
            Some(known) if known.as_ref() == category.as_ref() => Ok(hash),
            Some(known) => Err(collision(known, category, hash)),
            None => {
                self.categories.insert(hash, Arc::clone(category));
                Ok(hash)
            }
        }
    }

    /// Category name table, ordered by name
    pub(crate) fn category_table(&self) -> Vec<(u32, &Arc<str>)> {
        let mut table: Vec<(u32, &Arc<str>)> =
            self.categories.iter().map(|(&hash, name)| (hash, name)).collect();
        table.sort_by(|a, b| a.1.cmp(b.1));
        table
    }

    /// Packed term records, ordered by term hash
    pub(crate) fn packed_terms(&self) -> Vec<(u32, &[u64])> {
        let mut terms: Vec<(u32, &[u64])> =
            self.terms.iter().map(|(&hash, words)| (hash, words.as_ref())).collect();
        terms.sort_unstable_by_key(|&(hash, _)| hash);
        terms
    }

    /// Inserts a decoded record.
    ///
    /// # Errors
    /// `Corrupt` on a duplicate term hash, an unregistered category hash or
    /// a zero count
    pub(crate) fn insert_packed(&mut self, term_hash: u32, words: Vec<u64>) -> Result<()> {
        if self.terms.contains_key(&term_hash) {
            return Err(DictionaryError::Corrupt(format!(
                "duplicate term hash {term_hash:#010x}"
            )));
        }
        for &word in &words {
            let (category, count) = unpack(word);
            if !self.categories.contains_key(&category) || count == 0 {
                return Err(DictionaryError::Corrupt(format!(
                    "invalid packed entry {word:#018x} for term hash {term_hash:#010x}"
                )));
            }
        }
        if !words.is_empty() {
            self.terms.insert(term_hash, words.into_boxed_slice());
        }
        Ok(())
    }

    /// Same term hashes with the same counts, in any word order
    pub(crate) fn same_records(&self, other: &HashedStore) -> bool {
        self.terms.len() == other.terms.len()
            && self.terms.iter().all(|(hash, words)| {
                other
                    .terms
                    .get(hash)
                    .is_some_and(|theirs| self.materialize(words) == other.materialize(theirs))
            })
    }

    fn materialize(&self, words: &[u64]) -> CategoryEntries {
        let mut entries = CategoryEntries::with_capacity(words.len());
        for &word in words {
            let (category, count) = unpack(word);
            if let Some(name) = self.categories.get(&category) {
                entries.append_unique(Arc::clone(name), u64::from(count));
            }
        }
        entries
    }
}

impl TermStore for HashedStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Hashed
    }

    fn get(&self, term: &str) -> Cow<'_, CategoryEntries> {
        match self.terms.get(&hash32(term)) {
            Some(words) => Cow::Owned(self.materialize(words)),
            None => Cow::Owned(CategoryEntries::new()),
        }
    }

    fn count(&self, term: &str, category: &str) -> u64 {
        let category_hash = hash32(category);
        if self
            .categories
            .get(&category_hash)
            .map_or(true, |known| known.as_ref() != category)
        {
            return 0;
        }
        self.terms
            .get(&hash32(term))
            .and_then(|words| {
                words
                    .iter()
                    .map(|&word| unpack(word))
                    .find(|&(hash, _)| hash == category_hash)
            })
            .map_or(0, |(_, count)| u64::from(count))
    }

    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()> {
        validate_increment(term, category)?;
        let updated = checked_count(category, self.count(term, category), delta)?;
        if delta == 0 {
            return Ok(());
        }
        let category_hash = self.register_category(category)?;
        let words = self.terms.entry(hash32(term)).or_default();
        match words.iter_mut().find(|word| unpack(**word).0 == category_hash) {
            Some(word) => *word = pack(category_hash, updated),
            None => {
                let mut grown = std::mem::take(words).into_vec();
                grown.push(pack(category_hash, updated));
                *words = grown.into_boxed_slice();
            }
        }
        Ok(())
    }

    fn check_categories(&self, categories: &[&str]) -> Result<()> {
        let mut pending: HashMap<u32, &str, RandomState> = HashMap::default();
        for &category in categories {
            let hash = hash32(category);
            let known = self
                .categories
                .get(&hash)
                .map(|known| known.as_ref())
                .or_else(|| pending.get(&hash).copied());
            match known {
                Some(known) if known == category => {}
                Some(known) => return Err(collision(known, category, hash)),
                None => {
                    pending.insert(hash, category);
                }
            }
        }
        Ok(())
    }

    fn unique_terms(&self) -> usize {
        self.terms.len()
    }

    fn entries(&self) -> Result<TermIter<'_>> {
        Err(DictionaryError::UnsupportedOperation(
            "the hashed store does not keep its terms and cannot enumerate them".to_string(),
        ))
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&CategoryEntries) -> bool) -> usize {
        let before = self.terms.len();
        let categories = &self.categories;
        self.terms.retain(|_, words| {
            let mut entries = CategoryEntries::with_capacity(words.len());
            for &word in words.iter() {
                let (category, count) = unpack(word);
                if let Some(name) = categories.get(&category) {
                    entries.append_unique(Arc::clone(name), u64::from(count));
                }
            }
            keep(&entries)
        });
        before - self.terms.len()
    }

    fn term_totals(&self) -> CategoryEntries {
        let mut sums: HashMap<u32, u64, RandomState> = HashMap::default();
        for words in self.terms.values() {
            for &word in words.iter() {
                let (category, count) = unpack(word);
                *sums.entry(category).or_default() += u64::from(count);
            }
        }
        let mut totals = CategoryEntries::with_capacity(sums.len());
        for (hash, name) in self.category_table() {
            totals.append_unique(Arc::clone(name), sums.get(&hash).copied().unwrap_or(0));
        }
        totals
    }

    fn sort_entries(&mut self) {
        let categories = &self.categories;
        for words in self.terms.values_mut() {
            words.sort_by(|&a, &b| {
                let (cat_a, count_a) = unpack(a);
                let (cat_b, count_b) = unpack(b);
                count_b
                    .cmp(&count_a)
                    .then_with(|| categories.get(&cat_a).cmp(&categories.get(&cat_b)))
            });
        }
    }

    fn compact(&mut self) {
        self.terms.shrink_to_fit();
    }

    fn as_hashed(&self) -> Option<&HashedStore> {
        Some(self)
    }
}
