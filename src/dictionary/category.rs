use std::{cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, Result};

/// A single category with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub name: Arc<str>,
    pub count: u64,
}

/// CategoryEntries struct
/// A small multiset mapping category name to occurrence count.
/// It is used as the per-term payload of the dictionary and as the
/// accumulator for the document and term priors.
///
/// Categories are kept in insertion order (until `sort_by_count` reorders
/// them); callers must not rely on that order for anything but display.
/// A set whose total is zero is "empty" and equal to no observation at all.
///
/// # Examples
/// ```
/// use category_dictionary::CategoryEntries;
/// let mut entries = CategoryEntries::new();
/// entries.increment("spam", 2).unwrap();
/// entries.increment("ham", 1).unwrap();
///
/// assert_eq!(entries.get("spam"), 2);
/// assert_eq!(entries.total(), 3);
/// assert_eq!(entries.most_likely().unwrap().0, "spam");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct CategoryEntries {
    entries: Vec<Category>,
    total: u64,
    /// set by `sort_by_count`, cleared by any change of a count
    sorted: bool,
}

/// Mutation
impl CategoryEntries {
    /// Create an empty set
    pub const fn new() -> Self {
        CategoryEntries {
            entries: Vec::new(),
            total: 0,
            sorted: false,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CategoryEntries {
            entries: Vec::with_capacity(capacity),
            total: 0,
            sorted: false,
        }
    }

    /// Add `delta` to a category, creating it if absent
    ///
    /// # Arguments
    /// * `category` - category name, not empty
    /// * `delta` - amount to add
    ///
    /// # Errors
    /// `InvalidArgument` for an empty name, `Overflow` if the count or the
    /// total would leave the `u64` range. The set is unchanged on error.
    pub fn increment(&mut self, category: &str, delta: u64) -> Result<()> {
        self.add(category, delta, || Arc::from(category))
    }

    /// Same as `increment`, but reuses an already shared name
    pub fn increment_shared(&mut self, category: &Arc<str>, delta: u64) -> Result<()> {
        self.add(category, delta, || Arc::clone(category))
    }

    /// Checks that `increment(category, delta)` would succeed without applying it
    pub fn check_increment(&self, category: &str, delta: u64) -> Result<()> {
        validate_category(category)?;
        let current = self.get(category);
        current
            .checked_add(delta)
            .and_then(|_| self.total.checked_add(delta))
            .map(|_| ())
            .ok_or_else(|| DictionaryError::Overflow {
                category: category.to_string(),
                current,
                delta,
            })
    }

    fn add<F>(&mut self, category: &str, delta: u64, make_name: F) -> Result<()>
    where
        F: FnOnce() -> Arc<str>,
    {
        self.check_increment(category, delta)?;
        match self.position(category) {
            Some(idx) => self.entries[idx].count += delta,
            None if delta == 0 => return Ok(()),
            None => self.entries.push(Category {
                name: make_name(),
                count: delta,
            }),
        }
        self.total += delta;
        self.sorted &= delta == 0;
        Ok(())
    }

    /// Appends a category known to be absent; used by stores that rebuild
    /// a set from their own compact layout.
    pub(crate) fn append_unique(&mut self, category: Arc<str>, count: u64) {
        if count == 0 {
            return;
        }
        debug_assert!(!self.contains(&category));
        self.total = self.total.saturating_add(count);
        self.sorted = false;
        self.entries.push(Category {
            name: category,
            count,
        });
    }

    /// Add every count of `other` to this set.
    /// All additions are checked first, so a failed merge changes nothing.
    pub fn merge(&mut self, other: &CategoryEntries) -> Result<()> {
        let mut total = self.total;
        for category in &other.entries {
            let current = self.get(&category.name);
            let overflow = || DictionaryError::Overflow {
                category: category.name.to_string(),
                current,
                delta: category.count,
            };
            current.checked_add(category.count).ok_or_else(overflow)?;
            total = total.checked_add(category.count).ok_or_else(overflow)?;
        }
        for category in &other.entries {
            self.increment_shared(&category.name, category.count)?;
        }
        Ok(())
    }

    /// Reorder by descending count; equal counts are ordered by name.
    /// Results of every query stay the same. Until the next change of a
    /// count, `most_likely` answers from the first entry without a scan.
    pub fn sort_by_count(&mut self) {
        self.entries.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.name.cmp(&b.name))
        });
        self.sorted = true;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total = 0;
        self.sorted = false;
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.as_ref() == category)
    }
}

/// Queries
impl CategoryEntries {
    /// Occurrence count of a category, 0 if absent
    #[inline]
    pub fn get(&self, category: &str) -> u64 {
        self.position(category)
            .map_or(0, |idx| self.entries[idx].count)
    }

    /// Sum of all counts
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct categories
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn contains(&self, category: &str) -> bool {
        self.position(category).is_some()
    }

    /// count / total, 0.0 when the set is empty
    pub fn probability(&self, category: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.get(category) as f64 / self.total as f64
    }

    /// The category with the highest count and its probability.
    /// Among equal counts the lexicographically smallest name wins, so the
    /// result does not depend on insertion order or on the store.
    ///
    /// # Returns
    /// * `None` if the set is empty
    pub fn most_likely(&self) -> Option<(&str, f64)> {
        if self.total == 0 {
            return None;
        }
        if self.sorted {
            return self
                .entries
                .first()
                .map(|entry| (entry.name.as_ref(), entry.count as f64 / self.total as f64));
        }
        self.entries
            .iter()
            .max_by(|a, b| {
                a.count
                    .cmp(&b.count)
                    .then_with(|| b.name.cmp(&a.name))
            })
            .map(|entry| (entry.name.as_ref(), entry.count as f64 / self.total as f64))
    }

    /// Shannon entropy (base 2) of the category distribution
    pub fn entropy(&self) -> f64 {
        entropy(self.entries.iter().map(|entry| entry.count), self.total)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.entries.iter()
    }

    /// Category names in iteration order
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.entries.iter().map(|entry| &entry.name)
    }
}

/// Base-2 entropy of a count distribution; zero counts contribute nothing
/// and an empty distribution has entropy 0.
pub(crate) fn entropy<I>(counts: I, total: u64) -> f64
where
    I: IntoIterator<Item = u64>,
{
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .into_iter()
        .filter(|&count| count > 0)
        .map(|count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

pub(crate) fn validate_category(category: &str) -> Result<()> {
    if category.is_empty() {
        return Err(DictionaryError::InvalidArgument(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl PartialEq for CategoryEntries {
    /// Order-independent comparison of the counts
    fn eq(&self, other: &Self) -> bool {
        if self.total != other.total {
            return false;
        }
        let own = self.entries.iter().filter(|entry| entry.count > 0);
        let theirs = other.entries.iter().filter(|entry| entry.count > 0).count();
        let mut seen = 0;
        for entry in own {
            if other.get(&entry.name) != entry.count {
                return false;
            }
            seen += 1;
        }
        seen == theirs
    }
}

impl Eq for CategoryEntries {}

impl fmt::Display for CategoryEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", entry.name, entry.count)?;
        }
        write!(f, "}}")
    }
}

impl TryFrom<Vec<Category>> for CategoryEntries {
    type Error = DictionaryError;

    fn try_from(categories: Vec<Category>) -> Result<Self> {
        let mut entries = CategoryEntries::with_capacity(categories.len());
        for category in categories {
            if entries.contains(&category.name) {
                return Err(DictionaryError::InvalidArgument(format!(
                    "duplicate category `{}`",
                    category.name
                )));
            }
            entries.increment_shared(&category.name, category.count)?;
        }
        Ok(entries)
    }
}

impl From<CategoryEntries> for Vec<Category> {
    fn from(entries: CategoryEntries) -> Self {
        entries.entries
    }
}

impl<'a> IntoIterator for &'a CategoryEntries {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Orders category names so that ties resolve to the smallest name.
pub(crate) fn cmp_scores(a: (&str, f64), b: (&str, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0))
}
