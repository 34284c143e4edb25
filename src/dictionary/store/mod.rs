pub mod any;
pub mod category_trie;
pub mod direct;
pub mod hashed;
pub mod trie;

use std::{borrow::Cow, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::dictionary::category::{validate_category, CategoryEntries};
use crate::error::{DictionaryError, Result};

pub use any::AnyStore;
pub use category_trie::CategoryTrieStore;
pub use direct::DirectStore;
pub use hashed::HashedStore;
pub use trie::TrieStore;

/// Largest count a single (term, category) pair can reach in any store.
/// Every store enforces the same bound so all of them fail alike.
pub const MAX_TERM_COUNT: u64 = u32::MAX as u64;

/// A term with its category counts, borrowed when the store keeps them as is
pub type TermEntry<'a> = (Cow<'a, str>, Cow<'a, CategoryEntries>);

pub type TermIter<'a> = Box<dyn Iterator<Item = TermEntry<'a>> + 'a>;

pub(crate) static EMPTY_ENTRIES: CategoryEntries = CategoryEntries::new();

/// Physical encoding of the term index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// hash map term -> counts
    DirectMap,
    /// one character trie carrying the counts of every category
    #[default]
    Trie,
    /// one character trie per category
    CategoryTrie,
    /// 32-bit term/category hashes, terms cannot be listed
    Hashed,
}

impl BackendKind {
    pub fn is_enumerable(self) -> bool {
        !matches!(self, BackendKind::Hashed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::DirectMap => "direct_map",
            BackendKind::Trie => "trie",
            BackendKind::CategoryTrie => "category_trie",
            BackendKind::Hashed => "hashed",
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            BackendKind::DirectMap => 0,
            BackendKind::Trie => 1,
            BackendKind::CategoryTrie => 2,
            BackendKind::Hashed => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(BackendKind::DirectMap),
            1 => Some(BackendKind::Trie),
            2 => Some(BackendKind::CategoryTrie),
            3 => Some(BackendKind::Hashed),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TermStore trait
/// The logical contract shared by every encoding of "term -> category counts".
///
/// All stores give identical answers for `get`, `count` and `unique_terms`
/// given the same sequence of increments. They differ in memory layout and
/// in whether they can list their terms (`entries`).
pub trait TermStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Counts of `term`, an empty set if the term is unknown
    fn get(&self, term: &str) -> Cow<'_, CategoryEntries>;

    /// Count of one (term, category) pair
    fn count(&self, term: &str, category: &str) -> u64 {
        self.get(term).get(category)
    }

    /// Adds `delta` to (term, category), creating the record if needed.
    ///
    /// # Errors
    /// * `InvalidArgument` for an empty term or category
    /// * `Overflow` if the pair would exceed `MAX_TERM_COUNT`; nothing changes then
    fn increment(&mut self, term: &str, category: &Arc<str>, delta: u64) -> Result<()>;

    /// Checks that every name in `categories` could be added without a
    /// conflict. Called before a batch of increments so a failing batch
    /// leaves the store untouched.
    ///
    /// # Errors
    /// * `InvalidArgument` if a name cannot live next to the known categories
    fn check_categories(&self, _categories: &[&str]) -> Result<()> {
        Ok(())
    }

    /// Number of terms with at least one count
    fn unique_terms(&self) -> usize;

    fn is_enumerable(&self) -> bool {
        self.kind().is_enumerable()
    }

    /// All term records.
    ///
    /// # Errors
    /// * `UnsupportedOperation` if the store does not keep the term strings
    fn entries(&self) -> Result<TermIter<'_>>;

    /// Keeps the records for which `keep` returns true.
    ///
    /// # Returns
    /// * number of removed records
    fn retain(&mut self, keep: &mut dyn FnMut(&CategoryEntries) -> bool) -> usize;

    /// Per-category sum over all records
    fn term_totals(&self) -> CategoryEntries;

    /// Orders the counts of each record by descending count
    fn sort_entries(&mut self) {}

    /// Releases memory left behind by removed records
    fn compact(&mut self) {}

    fn as_hashed(&self) -> Option<&HashedStore> {
        None
    }
}

/// Stores that keep their terms and can always list them.
/// Gates the infallible `iter` accessors at compile time.
pub trait Enumerable: TermStore {
    fn iter(&self) -> TermIter<'_>;
}

pub(crate) fn validate_term(term: &str) -> Result<()> {
    if term.is_empty() {
        return Err(DictionaryError::InvalidArgument(
            "term must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_increment(term: &str, category: &str) -> Result<()> {
    validate_term(term)?;
    validate_category(category)
}

/// `current + delta`, bounded by `MAX_TERM_COUNT`
pub(crate) fn checked_count(category: &str, current: u64, delta: u64) -> Result<u32> {
    current
        .checked_add(delta)
        .filter(|&sum| sum <= MAX_TERM_COUNT)
        .map(|sum| sum as u32)
        .ok_or_else(|| DictionaryError::Overflow {
            category: category.to_string(),
            current,
            delta,
        })
}
