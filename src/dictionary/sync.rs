use std::{path::Path, sync::Arc};

use parking_lot::Mutex;

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::model::DictionaryModel;
use crate::dictionary::scoring::{CategoryScores, Scorer};
use crate::dictionary::store::{TermStore, TrieStore};
use crate::error::Result;

/// SynchronizedModel
/// A model behind one mutex. Every accessor takes the lock for the
/// duration of the call, so the model can be swapped (`replace`) while
/// other threads keep classifying.
#[derive(Debug)]
pub struct SynchronizedModel<S: TermStore = TrieStore> {
    inner: Mutex<DictionaryModel<S>>,
}

impl<S: TermStore> SynchronizedModel<S> {
    pub fn new(model: DictionaryModel<S>) -> Self {
        Self {
            inner: Mutex::new(model),
        }
    }

    pub fn classify<I, T, C>(&self, terms: I, scorer: &C) -> CategoryScores
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
        C: Scorer + ?Sized,
    {
        self.inner.lock().classify(terms, scorer)
    }

    /// Owned copy of a term's category counts
    pub fn category_entries(&self, term: &str) -> CategoryEntries {
        self.inner.lock().category_entries(term).into_owned()
    }

    pub fn num_terms(&self) -> usize {
        self.inner.lock().num_terms()
    }

    pub fn num_documents(&self) -> u64 {
        self.inner.lock().num_documents()
    }

    pub fn categories(&self) -> Vec<Arc<str>> {
        self.inner.lock().categories()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.inner.lock().save(path)
    }

    /// Swaps in a new model and returns the old one
    pub fn replace(&self, model: DictionaryModel<S>) -> DictionaryModel<S> {
        std::mem::replace(&mut *self.inner.lock(), model)
    }

    /// Runs `f` with the lock held
    pub fn with<R>(&self, f: impl FnOnce(&DictionaryModel<S>) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn into_inner(self) -> DictionaryModel<S> {
        self.inner.into_inner()
    }
}

impl<S: TermStore> From<DictionaryModel<S>> for SynchronizedModel<S> {
    fn from(model: DictionaryModel<S>) -> Self {
        Self::new(model)
    }
}
