use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, Result};

/// Kind of n-grams the upstream extractor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFeatureType {
    #[default]
    CharNGrams,
    WordNGrams,
}

impl TextFeatureType {
    pub(crate) fn tag(self) -> u8 {
        match self {
            TextFeatureType::CharNGrams => 0,
            TextFeatureType::WordNGrams => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TextFeatureType::CharNGrams),
            1 => Some(TextFeatureType::WordNGrams),
            _ => None,
        }
    }
}

/// FeatureSetting
/// Describes how terms were extracted for a model. The dictionary only
/// stores and returns it; the preprocessing side interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSetting {
    pub feature_type: TextFeatureType,
    pub min_n_gram_length: u32,
    pub max_n_gram_length: u32,
    /// maximum number of terms taken from one document
    pub max_terms: u32,
    pub min_term_length: u32,
    pub max_term_length: u32,
    pub case_sensitive: bool,
}

impl Default for FeatureSetting {
    fn default() -> Self {
        FeatureSetting {
            feature_type: TextFeatureType::CharNGrams,
            min_n_gram_length: 4,
            max_n_gram_length: 7,
            max_terms: 800,
            min_term_length: 3,
            max_term_length: 20,
            case_sensitive: false,
        }
    }
}

impl FeatureSetting {
    /// Character n-grams of the given length range
    pub fn char_ngrams(min: u32, max: u32) -> Result<Self> {
        FeatureSetting {
            feature_type: TextFeatureType::CharNGrams,
            min_n_gram_length: min,
            max_n_gram_length: max,
            ..Default::default()
        }
        .validated()
    }

    /// Word n-grams of the given length range
    pub fn word_ngrams(min: u32, max: u32) -> Result<Self> {
        FeatureSetting {
            feature_type: TextFeatureType::WordNGrams,
            min_n_gram_length: min,
            max_n_gram_length: max,
            ..Default::default()
        }
        .validated()
    }

    pub fn with_max_terms(mut self, max_terms: u32) -> Self {
        self.max_terms = max_terms;
        self
    }

    pub fn with_term_length(mut self, min: u32, max: u32) -> Result<Self> {
        self.min_term_length = min;
        self.max_term_length = max;
        self.validated()
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Checks the length bounds; n-gram lengths start at 1
    pub fn validated(self) -> Result<Self> {
        if self.min_n_gram_length == 0 || self.min_n_gram_length > self.max_n_gram_length {
            return Err(DictionaryError::InvalidArgument(format!(
                "invalid n-gram length range {}..={}",
                self.min_n_gram_length, self.max_n_gram_length
            )));
        }
        if self.min_term_length > self.max_term_length {
            return Err(DictionaryError::InvalidArgument(format!(
                "invalid term length range {}..={}",
                self.min_term_length, self.max_term_length
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for FeatureSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeatureSetting [{:?}, n-grams={}..{}, maxTerms={}, termLength={}..{}, caseSensitive={}]",
            self.feature_type,
            self.min_n_gram_length,
            self.max_n_gram_length,
            self.max_terms,
            self.min_term_length,
            self.max_term_length,
            self.case_sensitive
        )
    }
}
