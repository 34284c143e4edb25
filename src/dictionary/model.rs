use std::{borrow::Cow, fmt, io::Write, sync::Arc};

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::feature::FeatureSetting;
use crate::dictionary::store::{AnyStore, BackendKind, Enumerable, TermIter, TermStore, TrieStore};
use crate::error::Result;

/// Name of a model nobody named
pub const DEFAULT_NAME: &str = "NONAME";

/// DictionaryModel
/// The frozen result of a `DictionaryBuilder`: term records, document
/// priors, term-level totals and some metadata.
///
/// A model has no mutating methods; it can be shared freely between
/// threads for classification. To extend it, turn it back into a builder
/// with `DictionaryBuilder::from_model`.
///
/// # Type Parameters
/// * `S` - store holding the term records
#[derive(Debug, Clone)]
pub struct DictionaryModel<S: TermStore = TrieStore> {
    pub(crate) store: S,
    pub(crate) document_counts: CategoryEntries,
    pub(crate) term_counts: CategoryEntries,
    pub(crate) name: String,
    pub(crate) features: Option<FeatureSetting>,
}

impl<S: TermStore> DictionaryModel<S> {
    pub(crate) fn from_parts(
        store: S,
        document_counts: CategoryEntries,
        term_counts: CategoryEntries,
        name: String,
        features: Option<FeatureSetting>,
    ) -> Self {
        Self {
            store,
            document_counts,
            term_counts,
            name,
            features,
        }
    }

    pub(crate) fn into_parts(self) -> (S, CategoryEntries, CategoryEntries, String, Option<FeatureSetting>) {
        (
            self.store,
            self.document_counts,
            self.term_counts,
            self.name,
            self.features,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_setting(&self) -> Option<&FeatureSetting> {
        self.features.as_ref()
    }

    /// Category counts of a term, empty if the term is unknown
    pub fn category_entries(&self, term: &str) -> Cow<'_, CategoryEntries> {
        self.store.get(term)
    }

    pub fn count(&self, term: &str, category: &str) -> u64 {
        self.store.count(term, category)
    }

    /// Documents seen per category
    pub fn document_counts(&self) -> &CategoryEntries {
        &self.document_counts
    }

    /// Term occurrences per category, summed over the surviving term records
    pub fn term_counts(&self) -> &CategoryEntries {
        &self.term_counts
    }

    /// Fraction of training documents labelled `category`
    pub fn prior(&self, category: &str) -> f64 {
        self.document_counts.probability(category)
    }

    /// Category names known to the model.
    /// Taken from the document priors, or from the term records if no
    /// document was ever counted (e.g. a model read from a bare term table).
    pub fn categories(&self) -> Vec<Arc<str>> {
        let source = if self.document_counts.is_empty() {
            &self.term_counts
        } else {
            &self.document_counts
        };
        source.names().cloned().collect()
    }

    pub fn num_categories(&self) -> usize {
        self.categories().len()
    }

    /// Number of unique terms
    pub fn num_terms(&self) -> usize {
        self.store.unique_terms()
    }

    pub fn num_documents(&self) -> u64 {
        self.document_counts.total()
    }

    pub fn total_term_count(&self) -> u64 {
        self.term_counts.total()
    }

    /// All term records.
    ///
    /// # Errors
    /// * `UnsupportedOperation` on a hashed store
    pub fn entries(&self) -> Result<TermIter<'_>> {
        self.store.entries()
    }

    /// Same content regardless of the store encoding: same feature
    /// setting, priors, term totals and per-term counts.
    pub fn same_content<T: TermStore>(&self, other: &DictionaryModel<T>) -> bool {
        if self.features != other.features
            || self.num_terms() != other.num_terms()
            || self.document_counts != other.document_counts
            || self.term_counts != other.term_counts
        {
            return false;
        }
        if let Ok(mut mine) = self.store.entries() {
            return mine.all(|(term, entries)| *other.store.get(&term) == *entries);
        }
        if let Ok(mut theirs) = other.store.entries() {
            return theirs.all(|(term, entries)| *self.store.get(&term) == *entries);
        }
        match (self.store.as_hashed(), other.store.as_hashed()) {
            (Some(mine), Some(theirs)) => mine.same_records(theirs),
            _ => false,
        }
    }

    /// Writes the model as a comma separated table: one row per term, one
    /// column per category (sorted by name), each cell holding the
    /// probability of the category given the term.
    ///
    /// # Errors
    /// * `UnsupportedOperation` on a hashed store
    /// * `Io` if the writer fails
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        let entries = self.store.entries()?;
        let mut categories = self.categories();
        categories.sort();

        write!(writer, "Term")?;
        for category in &categories {
            write!(writer, ",{}", csv_field(category))?;
        }
        writeln!(writer)?;
        for (term, counts) in entries {
            write!(writer, "{}", csv_field(&term))?;
            for category in &categories {
                write!(writer, ",{}", counts.probability(category))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        // only UTF-8 was written
        Ok(String::from_utf8(buffer)?)
    }

    /// Moves the records into a runtime-selected store
    pub fn into_any(self) -> DictionaryModel<AnyStore>
    where
        S: Into<AnyStore>,
    {
        DictionaryModel {
            store: self.store.into(),
            document_counts: self.document_counts,
            term_counts: self.term_counts,
            name: self.name,
            features: self.features,
        }
    }
}

impl<S: Enumerable> DictionaryModel<S> {
    /// All term records; infallible for stores that keep their terms
    pub fn iter(&self) -> TermIter<'_> {
        self.store.iter()
    }
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

impl<S: TermStore> fmt::Display for DictionaryModel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DictionaryModel [backend={}, #terms={}, #categories={}]",
            self.backend(),
            self.num_terms(),
            self.num_categories()
        )
    }
}
