use serde::{Deserialize, Serialize};

use crate::dictionary::category::{entropy, CategoryEntries};
use crate::error::{DictionaryError, Result};

/// Pruning strategy applied once per term record when a builder is frozen.
/// Each variant is a pure predicate over the term's category counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PruningStrategy {
    /// Keeps terms seen at least `min_count` times in total
    /// param min_count: 0 keeps everything
    TermCount { min_count: u64 },
    /// Keeps terms whose most likely category is more probable than the threshold.
    /// A term split evenly at the threshold is removed.
    /// param min_probability: in [0, 1]
    MinProbability { min_probability: f64 },
    /// Keeps terms whose presence reduces the category entropy by at least `min_gain` bits
    /// param min_gain: finite and not negative
    InformationGain { min_gain: f64 },
    /// Keeps terms accepted by every inner strategy
    All { strategies: Vec<PruningStrategy> },
}

/// Corpus statistics a strategy may consult
#[derive(Debug, Clone, Copy)]
pub struct PruningContext<'a> {
    pub priors: &'a CategoryEntries,
    pub prior_entropy: f64,
}

impl<'a> PruningContext<'a> {
    pub fn new(priors: &'a CategoryEntries) -> Self {
        Self {
            priors,
            prior_entropy: priors.entropy(),
        }
    }
}

impl PruningStrategy {
    pub fn term_count(min_count: u64) -> Self {
        PruningStrategy::TermCount { min_count }
    }

    pub fn min_probability(min_probability: f64) -> Self {
        PruningStrategy::MinProbability { min_probability }
    }

    pub fn information_gain(min_gain: f64) -> Self {
        PruningStrategy::InformationGain { min_gain }
    }

    pub fn all(strategies: Vec<PruningStrategy>) -> Self {
        PruningStrategy::All { strategies }
    }

    /// Rejects thresholds that make no sense (NaN, probabilities outside [0, 1])
    pub fn validate(&self) -> Result<()> {
        match self {
            PruningStrategy::TermCount { .. } => Ok(()),
            PruningStrategy::MinProbability { min_probability } => {
                if (0.0..=1.0).contains(min_probability) {
                    Ok(())
                } else {
                    Err(DictionaryError::InvalidArgument(format!(
                        "min_probability must be in [0, 1], got {min_probability}"
                    )))
                }
            }
            PruningStrategy::InformationGain { min_gain } => {
                if min_gain.is_finite() && *min_gain >= 0.0 {
                    Ok(())
                } else {
                    Err(DictionaryError::InvalidArgument(format!(
                        "min_gain must be finite and not negative, got {min_gain}"
                    )))
                }
            }
            PruningStrategy::All { strategies } => strategies.iter().try_for_each(Self::validate),
        }
    }

    /// Whether the term record survives
    pub fn accept(&self, entries: &CategoryEntries, context: &PruningContext<'_>) -> bool {
        match self {
            PruningStrategy::TermCount { min_count } => entries.total() >= *min_count,
            PruningStrategy::MinProbability { min_probability } => entries
                .most_likely()
                .is_some_and(|(_, p)| p > *min_probability),
            PruningStrategy::InformationGain { min_gain } => {
                information_gain(entries, context) >= *min_gain
            }
            PruningStrategy::All { strategies } => {
                strategies.iter().all(|strategy| strategy.accept(entries, context))
            }
        }
    }
}

/// Two-outcome information gain of a term, in bits.
///
/// The term total stands in for the number of documents containing the
/// term and is clamped to the document total. Categories the term was
/// never seen with only contribute to the "term absent" side.
pub fn information_gain(entries: &CategoryEntries, context: &PruningContext<'_>) -> f64 {
    let documents = context.priors.total();
    if documents == 0 {
        return 0.0;
    }
    let with_term = entries.total().min(documents);
    let without_term = documents - with_term;

    let present = entries.entropy();
    let absent_counts: Vec<u64> = context
        .priors
        .iter()
        .map(|prior| prior.count.saturating_sub(entries.get(&prior.name)))
        .collect();
    let absent_total = absent_counts.iter().sum();
    let absent = entropy(absent_counts, absent_total);

    let n = documents as f64;
    let conditional = (with_term as f64 / n) * present + (without_term as f64 / n) * absent;
    let gain = context.prior_entropy - conditional;
    if gain.is_finite() {
        gain.max(0.0)
    } else {
        0.0
    }
}
