pub mod bayes;

use std::{fmt, sync::Arc};

use ahash::RandomState;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dictionary::category::cmp_scores;
use crate::dictionary::model::DictionaryModel;
use crate::dictionary::store::TermStore;

pub use bayes::{BayesOptions, BayesScorer};

/// Everything a scorer may look at for one (term, category) pair
#[derive(Debug, Clone, Copy)]
pub struct TermStatistics<'a> {
    pub term: &'a str,
    pub category: &'a str,
    /// count of the term in this category
    pub term_category_count: u64,
    /// count of the term over all categories
    pub dict_term_count: u64,
    /// multiplicity of the term in the classified document
    pub doc_count: u64,
    /// term occurrences of this category in the whole dictionary
    pub category_sum: u64,
    pub unique_terms: usize,
    pub num_documents: u64,
    /// term occurrences over all categories
    pub num_terms: u64,
}

/// Scorer trait
/// A pair of pure functions turning dictionary statistics into category
/// scores: one contribution per (term, category), then one aggregation
/// per category.
pub trait Scorer: Send + Sync {
    fn score(&self, stats: &TermStatistics<'_>) -> f64;

    /// Final score of a category
    ///
    /// # Arguments
    /// * `summed` - sum of the term contributions
    /// * `prior` - fraction of training documents in the category
    /// * `matched` - whether any document term is known to the dictionary
    fn score_category(&self, category: &str, summed: f64, prior: f64, matched: bool) -> f64;
}

/// Sums the squared probability of the category for every known term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SquaredProbabilityScorer;

impl Scorer for SquaredProbabilityScorer {
    fn score(&self, stats: &TermStatistics<'_>) -> f64 {
        if stats.dict_term_count == 0 {
            return 0.0;
        }
        let p = stats.term_category_count as f64 / stats.dict_term_count as f64;
        p * p
    }

    fn score_category(&self, _category: &str, summed: f64, _prior: f64, _matched: bool) -> f64 {
        summed
    }
}

/// Scoring algorithm selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScorerConfig {
    /// (count / total)² per term
    SquaredProbability,
    /// naive Bayes with the given switches
    Bayes(BayesOptions),
}

impl Default for ScorerConfig {
    fn default() -> Self {
        ScorerConfig::Bayes(BayesOptions::default())
    }
}

impl Scorer for ScorerConfig {
    fn score(&self, stats: &TermStatistics<'_>) -> f64 {
        match self {
            ScorerConfig::SquaredProbability => SquaredProbabilityScorer.score(stats),
            ScorerConfig::Bayes(options) => BayesScorer::new(*options).score(stats),
        }
    }

    fn score_category(&self, category: &str, summed: f64, prior: f64, matched: bool) -> f64 {
        match self {
            ScorerConfig::SquaredProbability => {
                SquaredProbabilityScorer.score_category(category, summed, prior, matched)
            }
            ScorerConfig::Bayes(options) => {
                BayesScorer::new(*options).score_category(category, summed, prior, matched)
            }
        }
    }
}

/// Classification result: a score per category
#[derive(Clone, PartialEq)]
pub struct CategoryScores {
    /// (category, score)
    pub list: Vec<(Arc<str>, f64)>,
    /// whether any document term was known to the dictionary
    pub matched: bool,
}

impl CategoryScores {
    pub fn new(list: Vec<(Arc<str>, f64)>, matched: bool) -> Self {
        CategoryScores { list, matched }
    }

    /// Sort by descending score; equal scores by name
    pub fn sort_by_score(&mut self) -> &mut Self {
        self.list.retain(|(_, s)| !s.is_nan());
        self.list
            .sort_by(|a, b| cmp_scores((&*b.0, b.1), (&*a.0, a.1)));
        self
    }

    /// Highest scoring category; ties go to the smallest name
    pub fn most_likely(&self) -> Option<(&str, f64)> {
        self.list
            .iter()
            .filter(|(_, s)| !s.is_nan())
            .map(|(name, score)| (name.as_ref(), *score))
            .max_by(|a, b| cmp_scores(*a, *b))
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.list
            .iter()
            .find(|(name, _)| name.as_ref() == category)
            .map(|(_, score)| *score)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.list.iter().map(|(name, score)| (name.as_ref(), *score))
    }
}

impl fmt::Debug for CategoryScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "CategoryScores [")?;
            for (name, score) in &self.list {
                writeln!(f, "    {:?}: {:.6}", name, score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

impl fmt::Display for CategoryScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, score)) in self.list.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:.6}", name, score)?;
        }
        write!(f, "}}")
    }
}

impl<S: TermStore> DictionaryModel<S> {
    /// Scores every category of the model for a document.
    ///
    /// Each distinct term is looked up once; repeated terms only raise its
    /// `doc_count`. If every final score is exactly zero (typically because
    /// no term is known) the document priors are returned instead.
    ///
    /// # Arguments
    /// * `terms` - terms of the document, as produced by the extractor
    /// * `scorer` - scoring algorithm
    ///
    /// # Returns
    /// * `CategoryScores` sorted by descending score
    pub fn classify<I, T, C>(&self, terms: I, scorer: &C) -> CategoryScores
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
        C: Scorer + ?Sized,
    {
        let terms: Vec<T> = terms.into_iter().collect();
        let mut multiplicity: IndexMap<&str, u64, RandomState> = IndexMap::default();
        for term in &terms {
            *multiplicity.entry(term.as_ref()).or_insert(0) += 1;
        }

        let categories = self.categories();
        let unique_terms = self.num_terms();
        let num_documents = self.num_documents();
        let num_terms = self.total_term_count();
        let mut sums = vec![0.0f64; categories.len()];
        let mut matched = false;

        for (&term, &doc_count) in &multiplicity {
            let entries = self.category_entries(term);
            if entries.is_empty() {
                continue;
            }
            matched = true;
            for (category, sum) in categories.iter().zip(sums.iter_mut()) {
                *sum += scorer.score(&TermStatistics {
                    term,
                    category: category.as_ref(),
                    term_category_count: entries.get(category),
                    dict_term_count: entries.total(),
                    doc_count,
                    category_sum: self.term_counts.get(category),
                    unique_terms,
                    num_documents,
                    num_terms,
                });
            }
        }

        let mut list: Vec<(Arc<str>, f64)> = categories
            .into_iter()
            .zip(sums)
            .map(|(category, summed)| {
                let score = scorer.score_category(&category, summed, self.prior(&category), matched);
                (category, score)
            })
            .collect();
        if list.iter().all(|(_, score)| *score == 0.0) {
            if !matched && !multiplicity.is_empty() {
                warn!(terms = multiplicity.len(), "no known term in document, falling back to priors");
            }
            for (category, score) in list.iter_mut() {
                *score = self.prior(category);
            }
        }

        let mut scores = CategoryScores::new(list, matched);
        scores.sort_by_score();
        scores
    }

    /// Classifies many documents in parallel
    pub fn classify_batch<D, T, C>(&self, documents: &[D], scorer: &C) -> Vec<CategoryScores>
    where
        D: AsRef<[T]> + Sync,
        T: AsRef<str> + Sync,
        C: Scorer + ?Sized,
    {
        documents
            .par_iter()
            .map(|document| self.classify(document.as_ref(), scorer))
            .collect()
    }
}
