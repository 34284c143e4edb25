use std::sync::Arc;

use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::dictionary::category::{validate_category, CategoryEntries};
use crate::dictionary::feature::FeatureSetting;
use crate::dictionary::model::{DictionaryModel, DEFAULT_NAME};
use crate::dictionary::pruning::{PruningContext, PruningStrategy};
use crate::dictionary::store::{checked_count, validate_term, TermStore, TrieStore};
use crate::error::{DictionaryError, Result};

/// Insertions between two re-sorts of the term records
pub const DEFAULT_HOUSEKEEPING_INTERVAL: u64 = 100_000;

/// Where a builder stands; a frozen dictionary is a `DictionaryModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Accumulating,
}

/// DictionaryBuilder
/// Accumulates documents into a store and the category priors, then
/// freezes everything into a `DictionaryModel` with `build`.
///
/// Single writer; wrap it yourself or shard by term and merge with
/// `add_dictionary` to train from several threads.
///
/// # Examples
/// ```
/// use category_dictionary::{DictionaryBuilder, TrieStore};
///
/// let mut builder = DictionaryBuilder::new(TrieStore::new());
/// builder.add_document(["a", "b"], "X").unwrap();
/// builder.add_document(["a", "c"], "Y").unwrap();
/// let model = builder.build().unwrap();
///
/// assert_eq!(model.category_entries("a").total(), 2);
/// assert_eq!(model.num_documents(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DictionaryBuilder<S: TermStore = TrieStore> {
    store: S,
    document_counts: CategoryEntries,
    term_counts: CategoryEntries,
    /// interned category names shared by every record
    categories: IndexSet<Arc<str>, RandomState>,
    pruning: Option<PruningStrategy>,
    housekeeping_interval: u64,
    insertions: u64,
    name: String,
    features: Option<FeatureSetting>,
}

impl<S: TermStore + Default> Default for DictionaryBuilder<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: TermStore> DictionaryBuilder<S> {
    /// Builder over an empty store
    pub fn new(store: S) -> Self {
        Self {
            store,
            document_counts: CategoryEntries::new(),
            term_counts: CategoryEntries::new(),
            categories: IndexSet::default(),
            pruning: None,
            housekeeping_interval: DEFAULT_HOUSEKEEPING_INTERVAL,
            insertions: 0,
            name: DEFAULT_NAME.to_string(),
            features: None,
        }
    }

    /// Turns a frozen model back into a builder so it can be trained further
    pub fn from_model(model: DictionaryModel<S>) -> Self {
        let (store, document_counts, term_counts, name, features) = model.into_parts();
        let categories = document_counts
            .names()
            .chain(term_counts.names())
            .cloned()
            .collect();
        Self {
            store,
            document_counts,
            term_counts,
            categories,
            pruning: None,
            housekeeping_interval: DEFAULT_HOUSEKEEPING_INTERVAL,
            insertions: 0,
            name,
            features,
        }
    }

    pub fn with_pruning(mut self, strategy: PruningStrategy) -> Self {
        self.pruning = Some(strategy);
        self
    }

    /// 0 disables the periodic re-sort
    pub fn with_housekeeping_interval(mut self, interval: u64) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_features(mut self, features: FeatureSetting) -> Self {
        self.features = Some(features);
        self
    }

    pub fn state(&self) -> BuilderState {
        if self.document_counts.is_empty() && self.store.unique_terms() == 0 {
            BuilderState::Empty
        } else {
            BuilderState::Accumulating
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn document_counts(&self) -> &CategoryEntries {
        &self.document_counts
    }

    pub fn term_counts(&self) -> &CategoryEntries {
        &self.term_counts
    }

    fn intern(&mut self, category: &str) -> Arc<str> {
        match self.categories.get(category) {
            Some(name) => Arc::clone(name),
            None => {
                let name: Arc<str> = Arc::from(category);
                self.categories.insert(Arc::clone(&name));
                name
            }
        }
    }

    /// Adds a document with weight 1; see `add_weighted_document`
    pub fn add_document<I, T>(&mut self, terms: I, category: &str) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.add_weighted_document(terms, category, 1)
    }

    /// Adds one labelled document.
    ///
    /// Every occurrence of a term adds `weight` to (term, category), so a
    /// term repeated in the document counts once per occurrence. The
    /// document adds `weight` to the document priors.
    ///
    /// # Errors
    /// * `InvalidArgument` for an empty category or term, or a zero weight
    /// * `Overflow` if any count would overflow
    ///
    /// Nothing is changed when an error is returned.
    pub fn add_weighted_document<I, T>(&mut self, terms: I, category: &str, weight: u64) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        validate_category(category)?;
        if weight == 0 {
            return Err(DictionaryError::InvalidArgument(
                "document weight must be at least 1".to_string(),
            ));
        }

        let terms: Vec<T> = terms.into_iter().collect();
        let mut deltas: IndexMap<&str, u64, RandomState> = IndexMap::default();
        for term in &terms {
            let term = term.as_ref();
            validate_term(term)?;
            *deltas.entry(term).or_insert(0) += 1;
        }

        let overflow = |current: u64, delta: u64| DictionaryError::Overflow {
            category: category.to_string(),
            current,
            delta,
        };
        let mut total = 0u64;
        for (term, delta) in deltas.iter_mut() {
            let multiplicity = *delta;
            *delta = multiplicity
                .checked_mul(weight)
                .ok_or_else(|| overflow(multiplicity, weight))?;
            checked_count(category, self.store.count(term, category), *delta)?;
            total = total
                .checked_add(*delta)
                .ok_or_else(|| overflow(total, *delta))?;
        }
        self.term_counts.check_increment(category, total)?;
        self.document_counts.check_increment(category, weight)?;
        self.store.check_categories(&[category])?;

        let category = self.intern(category);
        for (term, delta) in &deltas {
            self.store.increment(term, &category, *delta)?;
        }
        self.term_counts.increment_shared(&category, total)?;
        self.document_counts.increment_shared(&category, weight)?;

        self.housekeeping(terms.len() as u64);
        Ok(())
    }

    fn housekeeping(&mut self, inserted: u64) {
        let before = self.insertions;
        self.insertions = self.insertions.saturating_add(inserted);
        let interval = self.housekeeping_interval;
        if interval > 0 && self.insertions / interval > before / interval {
            self.store.sort_entries();
            debug!(
                insertions = self.insertions,
                terms = self.store.unique_terms(),
                "sorted term records"
            );
        }
    }

    /// Merges another model's term records and priors into this builder.
    ///
    /// # Errors
    /// * `UnsupportedOperation` if `other` cannot enumerate its terms
    /// * `Overflow` if any merged count would overflow
    /// * `InvalidArgument` if an incoming category conflicts with the store
    ///
    /// Nothing is changed when an error is returned.
    pub fn add_dictionary<T: TermStore>(&mut self, other: &DictionaryModel<T>) -> Result<()> {
        let records: Vec<_> = other.entries()?.collect();

        let mut document_counts = self.document_counts.clone();
        document_counts.merge(other.document_counts())?;
        let mut term_counts = self.term_counts.clone();
        term_counts.merge(other.term_counts())?;
        for (term, entries) in &records {
            for category in entries.iter() {
                checked_count(
                    &category.name,
                    self.store.count(term, &category.name),
                    category.count,
                )?;
            }
        }
        let incoming: IndexSet<&str, RandomState> = records
            .iter()
            .flat_map(|(_, entries)| entries.names().map(|name| &**name))
            .collect();
        let incoming: Vec<&str> = incoming.into_iter().collect();
        self.store.check_categories(&incoming)?;

        for (term, entries) in &records {
            for category in entries.iter() {
                let name = self.intern(&category.name);
                self.store.increment(term, &name, category.count)?;
            }
        }
        for name in document_counts.names().chain(term_counts.names()) {
            self.intern(name);
        }
        self.document_counts = document_counts;
        self.term_counts = term_counts;
        if self.features.is_none() {
            self.features = other.features.clone();
        }
        debug!(
            merged = records.len(),
            terms = self.store.unique_terms(),
            "merged dictionary"
        );
        Ok(())
    }

    /// Freezes the builder into a model, pruning first if a strategy is set.
    /// Term totals are recomputed from the surviving records; document
    /// priors are never pruned.
    ///
    /// # Errors
    /// * `InvalidArgument` if the pruning strategy has an invalid threshold
    #[doc(alias = "create")]
    pub fn build(mut self) -> Result<DictionaryModel<S>> {
        if let Some(strategy) = self.pruning.take() {
            strategy.validate()?;
            let context = PruningContext::new(&self.document_counts);
            let before = self.store.unique_terms();
            let removed = self
                .store
                .retain(&mut |entries| strategy.accept(entries, &context));
            self.store.compact();
            self.term_counts = self.store.term_totals();
            info!(
                ?strategy,
                before,
                removed,
                remaining = self.store.unique_terms(),
                "pruned dictionary"
            );
        }
        info!(
            backend = %self.store.kind(),
            terms = self.store.unique_terms(),
            documents = self.document_counts.total(),
            "built dictionary"
        );
        Ok(DictionaryModel::from_parts(
            self.store,
            self.document_counts,
            self.term_counts,
            self.name,
            self.features,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::store::{AnyStore, BackendKind, DirectStore, HashedStore, MAX_TERM_COUNT};

    #[test]
    fn unigram_example() {
        let mut builder = DictionaryBuilder::new(DirectStore::new());
        assert_eq!(builder.state(), BuilderState::Empty);
        builder.add_document(["a", "b"], "X").unwrap();
        builder.add_document(["a", "c"], "Y").unwrap();
        assert_eq!(builder.state(), BuilderState::Accumulating);
        let model = builder.build().unwrap();

        let a = model.category_entries("a");
        assert_eq!(a.get("X"), 1);
        assert_eq!(a.get("Y"), 1);
        assert_eq!(model.document_counts().get("X"), 1);
        assert_eq!(model.document_counts().get("Y"), 1);
        assert_eq!(model.term_counts().get("X"), 2);
        assert_eq!(model.term_counts().get("Y"), 2);
    }

    #[test]
    fn repeated_terms_and_weights() {
        let mut builder: DictionaryBuilder = DictionaryBuilder::default();
        builder.add_weighted_document(["a", "a", "b"], "X", 3).unwrap();
        let model = builder.build().unwrap();
        assert_eq!(model.count("a", "X"), 6);
        assert_eq!(model.count("b", "X"), 3);
        assert_eq!(model.term_counts().get("X"), 9);
        assert_eq!(model.document_counts().get("X"), 3);
    }

    #[test]
    fn invalid_documents_change_nothing() {
        let mut builder = DictionaryBuilder::new(TrieStore::new());
        assert!(matches!(
            builder.add_document(["a"], ""),
            Err(DictionaryError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder.add_weighted_document(["a"], "X", 0),
            Err(DictionaryError::InvalidArgument(_))
        ));
        assert!(matches!(
            builder.add_document(["a", ""], "X"),
            Err(DictionaryError::InvalidArgument(_))
        ));
        assert_eq!(builder.state(), BuilderState::Empty);
    }

    #[test]
    fn overflowing_document_is_atomic() {
        let mut builder = DictionaryBuilder::new(TrieStore::new());
        builder
            .add_weighted_document(["big"], "X", MAX_TERM_COUNT - 1)
            .unwrap();
        let err = builder.add_weighted_document(["fresh", "big"], "X", 2);
        assert!(matches!(err, Err(DictionaryError::Overflow { .. })));
        assert_eq!(builder.store().count("fresh", "X"), 0);
        assert_eq!(builder.store().unique_terms(), 1);
        assert_eq!(builder.document_counts().get("X"), MAX_TERM_COUNT - 1);
    }

    #[test]
    fn pruning_recomputes_term_totals_but_keeps_priors() {
        let mut builder = DictionaryBuilder::new(TrieStore::new())
            .with_pruning(PruningStrategy::term_count(2));
        builder.add_document(["a", "b"], "X").unwrap();
        builder.add_document(["a", "c"], "Y").unwrap();
        let model = builder.build().unwrap();

        assert_eq!(model.num_terms(), 1);
        assert_eq!(model.term_counts().get("X"), 1);
        assert_eq!(model.term_counts().get("Y"), 1);
        assert_eq!(model.document_counts().total(), 2);
    }

    #[test]
    fn invalid_pruning_fails_at_build() {
        let builder = DictionaryBuilder::new(DirectStore::new())
            .with_pruning(PruningStrategy::min_probability(2.0));
        assert!(builder.build().is_err());
    }

    #[test]
    fn add_dictionary_merges_counts_and_priors() {
        let mut first = DictionaryBuilder::new(DirectStore::new()).with_name("first");
        first.add_document(["a", "b"], "X").unwrap();
        let first = first.build().unwrap();

        let mut merged = DictionaryBuilder::new(TrieStore::new());
        merged.add_document(["a"], "Y").unwrap();
        merged.add_dictionary(&first).unwrap();
        let model = merged.build().unwrap();

        assert_eq!(model.category_entries("a").total(), 2);
        assert_eq!(model.count("b", "X"), 1);
        assert_eq!(model.num_documents(), 2);
        assert_eq!(model.term_counts().get("X"), 2);
        assert_eq!(model.name(), DEFAULT_NAME);
    }

    #[test]
    fn add_dictionary_needs_enumerable_source() {
        let mut hashed = DictionaryBuilder::new(HashedStore::new());
        hashed.add_document(["a"], "X").unwrap();
        let hashed = hashed.build().unwrap();

        let mut builder = DictionaryBuilder::new(DirectStore::new());
        assert!(matches!(
            builder.add_dictionary(&hashed),
            Err(DictionaryError::UnsupportedOperation(_))
        ));
        assert_eq!(builder.state(), BuilderState::Empty);
    }

    #[test]
    fn overflowing_merge_changes_nothing() {
        let mut source = DictionaryBuilder::new(DirectStore::new());
        source.add_document(["fresh"], "X").unwrap();
        source.add_weighted_document(["big"], "X", 5).unwrap();
        let source = source.build().unwrap();

        for kind in [
            BackendKind::DirectMap,
            BackendKind::Trie,
            BackendKind::CategoryTrie,
            BackendKind::Hashed,
        ] {
            let mut builder = DictionaryBuilder::new(AnyStore::new(kind));
            builder
                .add_weighted_document(["big"], "X", MAX_TERM_COUNT - 1)
                .unwrap();

            let err = builder.add_dictionary(&source);
            assert!(matches!(err, Err(DictionaryError::Overflow { .. })), "{kind}");
            assert_eq!(builder.store().count("fresh", "X"), 0, "{kind}");
            assert_eq!(builder.store().count("big", "X"), MAX_TERM_COUNT - 1, "{kind}");
            assert_eq!(builder.store().unique_terms(), 1, "{kind}");
            assert_eq!(builder.document_counts().get("X"), MAX_TERM_COUNT - 1, "{kind}");
            assert_eq!(builder.term_counts().get("X"), MAX_TERM_COUNT - 1, "{kind}");
        }
    }

    #[test]
    fn colliding_category_merge_changes_nothing() {
        // both names hash to 0x9f78b8bb
        let mut source = DictionaryBuilder::new(DirectStore::new());
        source.add_document(["a"], "X").unwrap();
        source.add_document(["b"], "cat203670").unwrap();
        let source = source.build().unwrap();

        let mut builder = DictionaryBuilder::new(HashedStore::new());
        builder.add_document(["c"], "cat51353").unwrap();

        let err = builder.add_dictionary(&source);
        assert!(matches!(err, Err(DictionaryError::InvalidArgument(_))));
        assert_eq!(builder.store().count("a", "X"), 0);
        assert_eq!(builder.store().unique_terms(), 1);
        assert_eq!(builder.document_counts().get("X"), 0);

        let err = builder.add_document(["d"], "cat203670");
        assert!(matches!(err, Err(DictionaryError::InvalidArgument(_))));
        assert_eq!(builder.document_counts().total(), 1);
    }

    #[test]
    fn retraining_a_frozen_model() {
        let mut builder = DictionaryBuilder::new(TrieStore::new()).with_name("news");
        builder.add_document(["a"], "X").unwrap();
        let model = builder.build().unwrap();

        let mut builder = DictionaryBuilder::from_model(model);
        builder.add_document(["a", "b"], "X").unwrap();
        let model = builder.build().unwrap();
        assert_eq!(model.count("a", "X"), 2);
        assert_eq!(model.num_documents(), 2);
        assert_eq!(model.name(), "news");
    }

    #[test]
    fn housekeeping_sorts_without_changing_counts() {
        let mut builder = DictionaryBuilder::new(TrieStore::new()).with_housekeeping_interval(2);
        builder.add_document(["t"], "b").unwrap();
        builder.add_document(["t", "t"], "a").unwrap();
        let order: Vec<String> = builder
            .store()
            .get("t")
            .names()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(builder.store().count("t", "b"), 1);
    }
}
