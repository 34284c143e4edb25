/// This crate is a term-category dictionary for text classification.
pub mod config;
pub mod dictionary;
pub mod error;
pub mod utils;

/// Dictionary Builder
/// The write side of this crate. Documents (a collection of terms, a category
/// and a weight) are accumulated into a `TermStore` together with the
/// document-level and term-level category totals.
///
/// `build` freezes the builder into a `DictionaryModel`, applying the
/// configured `PruningStrategy` first. A builder can be reopened from a model
/// with `from_model`, and other models can be merged into it with
/// `add_dictionary`.
///
/// ```
/// use category_dictionary::{DictionaryBuilder, TrieStore};
///
/// let mut builder = DictionaryBuilder::new(TrieStore::new());
/// builder.add_document(["a", "b"], "X").unwrap();
/// builder.add_document(["a", "c"], "Y").unwrap();
/// let model = builder.build().unwrap();
///
/// assert_eq!(model.category_entries("a").get("X"), 1);
/// assert_eq!(model.term_counts().get("Y"), 2);
/// ```
pub use dictionary::builder::{BuilderState, DictionaryBuilder};

/// Dictionary Model
/// The frozen, read-only result of a builder.
///
/// It holds:
/// - The term store
/// - Document counts per category (the priors)
/// - Term counts per category
/// - A name and an optional feature setting
///
/// `DictionaryModel<S>` is generic over the store encoding and defaults to
/// `TrieStore`. Models are immutable, so any number of threads can classify
/// against one model at the same time.
///
/// # Serialization
/// Supported through the binary codec (`save` / `load`) and CSV export.
pub use dictionary::model::{DictionaryModel, DEFAULT_NAME};

/// Category Count Set
/// The per-term payload and the priors accumulator: category name -> count,
/// with a cached total.
///
/// Counts never wrap. An increment that would overflow fails and leaves the
/// set untouched.
pub use dictionary::category::{Category, CategoryEntries};

/// Term Stores
/// Interchangeable encodings of "term -> category counts".
/// - `DirectStore`: a hash map, the reference encoding
/// - `TrieStore`: a character trie shared by all categories
/// - `CategoryTrieStore`: one character trie per category
/// - `HashedStore`: 32-bit hashes of terms and categories, cannot list terms
///
/// `AnyStore` selects one of them at runtime, e.g. from a config file or a
/// stored model.
pub use dictionary::store::{
    AnyStore, BackendKind, CategoryTrieStore, DirectStore, Enumerable, HashedStore, TermStore,
    TrieStore,
};

/// Pruning Strategy
/// Predicates over a term's category counts, evaluated once per term when a
/// builder is frozen.
/// - TermCount: minimum total count
/// - MinProbability: the most likely category must exceed a probability
/// - InformationGain: minimum information gain against the document priors
/// - All: every nested strategy must accept
pub use dictionary::pruning::PruningStrategy;

/// Scoring
/// Scorers turn the counts of matched terms into per-category scores.
///
/// Currently, the following scorers are provided:
/// - SquaredProbability: sum of squared term probabilities
/// - Bayes: naive Bayes with optional Laplace smoothing, priors,
///   tf-idf-like weighting and complement estimation
///
/// `CategoryScores` holds the result of `DictionaryModel::classify`.
pub use dictionary::scoring::{
    BayesOptions, BayesScorer, CategoryScores, Scorer, ScorerConfig, SquaredProbabilityScorer,
    TermStatistics,
};

/// Feature Setting
/// Metadata describing how terms were extracted. Stored with the model,
/// never interpreted by it.
pub use dictionary::feature::{FeatureSetting, TextFeatureType};

/// Synchronized Model
/// A model behind a mutex, for callers that swap or retrain a model while
/// other threads classify.
pub use dictionary::sync::SynchronizedModel;

/// Binary codec
/// Versioned model persistence. Version 2 is written by default, versions 1
/// and 2 can be read.
pub use dictionary::codec::{load, read_model, save, write_model, FORMAT_VERSION};

pub use config::DictionaryConfig;
pub use error::{DictionaryError, Result};
