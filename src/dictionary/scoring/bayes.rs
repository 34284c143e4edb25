use serde::{Deserialize, Serialize};

use crate::dictionary::scoring::{Scorer, TermStatistics};

/// Switches of the naive Bayes scorer, all independent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesOptions {
    /// add 1 to the numerator and the vocabulary size to the denominator
    pub laplace: bool,
    /// add ln(prior) to the final category score
    pub priors: bool,
    /// weight terms by ln(df + 1) * idf instead of their raw multiplicity
    pub frequencies: bool,
    /// estimate from all other categories (complement naive Bayes)
    pub complement: bool,
}

impl Default for BayesOptions {
    fn default() -> Self {
        BayesOptions {
            laplace: true,
            priors: true,
            frequencies: false,
            complement: false,
        }
    }
}

/// BayesScorer
/// Multinomial naive Bayes over the dictionary counts.
///
/// Per term: `weight * ln(numerator / denominator)`, where the fraction
/// estimates P(term | category) (or P(term | not category) with
/// `complement`). A zero numerator or denominator scores 0.
/// Per category: `(complement ? -1 : 1) * sum + (priors ? ln(prior) : 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BayesScorer {
    pub options: BayesOptions,
}

impl BayesScorer {
    pub fn new(options: BayesOptions) -> Self {
        Self { options }
    }

    fn weight(&self, stats: &TermStatistics<'_>) -> f64 {
        let doc_count = stats.doc_count as f64;
        if !self.options.frequencies {
            return doc_count;
        }
        if stats.dict_term_count == 0 {
            return 0.0;
        }
        let idf = (1.0 + stats.num_documents as f64 / stats.dict_term_count as f64).ln();
        (doc_count + 1.0).ln() * idf
    }
}

impl Scorer for BayesScorer {
    fn score(&self, stats: &TermStatistics<'_>) -> f64 {
        let (mut numerator, mut denominator) = if self.options.complement {
            (
                stats.dict_term_count.saturating_sub(stats.term_category_count),
                stats.num_terms.saturating_sub(stats.category_sum),
            )
        } else {
            (stats.term_category_count, stats.category_sum)
        };
        if self.options.laplace {
            numerator = numerator.saturating_add(1);
            denominator = denominator.saturating_add(stats.unique_terms as u64);
        }
        if numerator == 0 || denominator == 0 {
            return 0.0;
        }
        self.weight(stats) * (numerator as f64 / denominator as f64).ln()
    }

    fn score_category(&self, _category: &str, summed: f64, prior: f64, _matched: bool) -> f64 {
        let sign = if self.options.complement { -1.0 } else { 1.0 };
        let prior_term = if self.options.priors && prior > 0.0 {
            prior.ln()
        } else {
            0.0
        };
        sign * summed + prior_term
    }
}
