//! Binary model format.
//!
//! Version 2 (current), all integers big-endian, strings as `u32` byte
//! length followed by UTF-8:
//!
//! ```text
//! i32  version
//! u8   backend tag
//! u32  #categories, then per category (sorted by name):
//!        string name, u64 document count, u64 term total
//! u32  #terms, then per term
//!        enumerable stores: string term, u32 #entries, #entries x (u32 category index, u32 count)
//!        hashed store:      u32 term hash, u32 #entries, #entries x u64 (category hash << 32 | count)
//! u8   feature flag [u8 type, u32 min n-gram, u32 max n-gram, u32 max terms,
//!                    u32 min term length, u32 max term length, u8 case sensitive]
//! u8   name flag [string name]
//! ```
//!
//! Version 1 has no backend tag and no term totals, uses `i32` for every
//! count and always writes the name. It is read into a trie store.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
    sync::Arc,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::dictionary::category::CategoryEntries;
use crate::dictionary::feature::{FeatureSetting, TextFeatureType};
use crate::dictionary::model::{DictionaryModel, DEFAULT_NAME};
use crate::dictionary::store::{AnyStore, BackendKind, HashedStore, TermStore};
use crate::error::{DictionaryError, Result};

pub const FORMAT_VERSION: i32 = 2;

/// Versions `read_model` understands
pub const SUPPORTED_VERSIONS: &[i32] = &[1, 2];

/// Longest string accepted when reading
const MAX_STRING_LEN: u32 = 16 * 1024 * 1024;

fn write_string<W: Write>(wtr: &mut W, value: &str) -> Result<()> {
    let len = u32::try_from(value.len())
        .ok()
        .filter(|&len| len <= MAX_STRING_LEN)
        .ok_or_else(|| DictionaryError::InvalidArgument(format!("string of {} bytes is too long", value.len())))?;
    wtr.write_u32::<BigEndian>(len)?;
    wtr.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(rdr: &mut R) -> Result<String> {
    let len = rdr.read_u32::<BigEndian>()?;
    if len > MAX_STRING_LEN {
        return Err(DictionaryError::Corrupt(format!("string length {len} exceeds limit")));
    }
    let mut bytes = vec![0; len as usize];
    rdr.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

fn write_len<W: Write>(wtr: &mut W, len: usize, what: &str) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| DictionaryError::UnsupportedOperation(format!("too many {what} to encode")))?;
    wtr.write_u32::<BigEndian>(len)?;
    Ok(())
}

fn write_features<W: Write>(wtr: &mut W, features: Option<&FeatureSetting>) -> Result<()> {
    let Some(features) = features else {
        wtr.write_u8(0)?;
        return Ok(());
    };
    wtr.write_u8(1)?;
    wtr.write_u8(features.feature_type.tag())?;
    wtr.write_u32::<BigEndian>(features.min_n_gram_length)?;
    wtr.write_u32::<BigEndian>(features.max_n_gram_length)?;
    wtr.write_u32::<BigEndian>(features.max_terms)?;
    wtr.write_u32::<BigEndian>(features.min_term_length)?;
    wtr.write_u32::<BigEndian>(features.max_term_length)?;
    wtr.write_u8(u8::from(features.case_sensitive))?;
    Ok(())
}

fn read_features<R: Read>(rdr: &mut R) -> Result<Option<FeatureSetting>> {
    if read_flag(rdr)? {
        let tag = rdr.read_u8()?;
        let feature_type = TextFeatureType::from_tag(tag)
            .ok_or_else(|| DictionaryError::Corrupt(format!("unknown feature type {tag}")))?;
        Ok(Some(FeatureSetting {
            feature_type,
            min_n_gram_length: rdr.read_u32::<BigEndian>()?,
            max_n_gram_length: rdr.read_u32::<BigEndian>()?,
            max_terms: rdr.read_u32::<BigEndian>()?,
            min_term_length: rdr.read_u32::<BigEndian>()?,
            max_term_length: rdr.read_u32::<BigEndian>()?,
            case_sensitive: read_flag(rdr)?,
        }))
    } else {
        Ok(None)
    }
}

fn read_flag<R: Read>(rdr: &mut R) -> Result<bool> {
    match rdr.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DictionaryError::Corrupt(format!("invalid flag byte {other}"))),
    }
}

/// Category names of a model sorted by name; the position is the table index
fn category_table<S: TermStore>(model: &DictionaryModel<S>) -> Vec<Arc<str>> {
    let mut names: Vec<Arc<str>> = model
        .document_counts()
        .names()
        .chain(model.term_counts().names())
        .cloned()
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Writes `model` in the current format version
pub fn write_model<S, W>(model: &DictionaryModel<S>, writer: W) -> Result<()>
where
    S: TermStore,
    W: Write,
{
    write_model_version(model, writer, FORMAT_VERSION)
}

/// Writes `model` in a chosen format version.
///
/// # Errors
/// * `FormatVersionMismatch` for a version this crate cannot write
/// * `UnsupportedOperation` for a hashed model in version 1, or counts
///   that do not fit version 1
pub fn write_model_version<S, W>(model: &DictionaryModel<S>, mut writer: W, version: i32) -> Result<()>
where
    S: TermStore,
    W: Write,
{
    match version {
        1 => write_v1(model, &mut writer)?,
        2 => write_v2(model, &mut writer)?,
        found => {
            return Err(DictionaryError::FormatVersionMismatch {
                found,
                supported: SUPPORTED_VERSIONS,
            })
        }
    }
    writer.flush()?;
    Ok(())
}

fn to_i32(value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        DictionaryError::UnsupportedOperation(format!("count {value} does not fit format version 1"))
    })
}

fn write_v1<S: TermStore, W: Write>(model: &DictionaryModel<S>, wtr: &mut W) -> Result<()> {
    let entries = model.entries()?;
    let categories = category_table(model);
    let index: HashMap<&str, i32> = categories
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_ref(), idx as i32))
        .collect();

    wtr.write_i32::<BigEndian>(1)?;
    wtr.write_i32::<BigEndian>(to_i32(categories.len() as u64)?)?;
    for name in &categories {
        write_string(wtr, name)?;
        wtr.write_i32::<BigEndian>(to_i32(model.document_counts().get(name))?)?;
    }
    wtr.write_i32::<BigEndian>(to_i32(model.num_terms() as u64)?)?;
    for (term, counts) in entries {
        write_string(wtr, &term)?;
        wtr.write_i32::<BigEndian>(to_i32(counts.len() as u64)?)?;
        for category in counts.iter() {
            let idx = index.get(&*category.name).copied().ok_or_else(|| {
                DictionaryError::Corrupt(format!("category `{}` missing from priors", category.name))
            })?;
            wtr.write_i32::<BigEndian>(idx)?;
            wtr.write_i32::<BigEndian>(to_i32(category.count)?)?;
        }
    }
    write_features(wtr, model.feature_setting())?;
    write_string(wtr, model.name())?;
    Ok(())
}

fn write_v2<S: TermStore, W: Write>(model: &DictionaryModel<S>, wtr: &mut W) -> Result<()> {
    let categories = category_table(model);

    wtr.write_i32::<BigEndian>(2)?;
    wtr.write_u8(model.backend().tag())?;
    write_len(wtr, categories.len(), "categories")?;
    for name in &categories {
        write_string(wtr, name)?;
        wtr.write_u64::<BigEndian>(model.document_counts().get(name))?;
        wtr.write_u64::<BigEndian>(model.term_counts().get(name))?;
    }

    write_len(wtr, model.num_terms(), "terms")?;
    if let Some(hashed) = model.store().as_hashed() {
        for (hash, words) in hashed.packed_terms() {
            wtr.write_u32::<BigEndian>(hash)?;
            write_len(wtr, words.len(), "entries")?;
            for &word in words {
                wtr.write_u64::<BigEndian>(word)?;
            }
        }
    } else {
        let index: HashMap<&str, u32> = categories
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_ref(), idx as u32))
            .collect();
        for (term, counts) in model.entries()? {
            write_string(wtr, &term)?;
            write_len(wtr, counts.len(), "entries")?;
            for category in counts.iter() {
                let idx = index.get(&*category.name).copied().ok_or_else(|| {
                    DictionaryError::Corrupt(format!("category `{}` missing from totals", category.name))
                })?;
                wtr.write_u32::<BigEndian>(idx)?;
                // stores keep every count below u32::MAX
                wtr.write_u32::<BigEndian>(category.count as u32)?;
            }
        }
    }

    write_features(wtr, model.feature_setting())?;
    if model.name() == DEFAULT_NAME {
        wtr.write_u8(0)?;
    } else {
        wtr.write_u8(1)?;
        write_string(wtr, model.name())?;
    }
    Ok(())
}

/// Reads a model written in any supported version.
///
/// # Errors
/// * `FormatVersionMismatch` for an unknown version header
/// * `Corrupt` for malformed content
/// * `Io` for read failures, including a truncated stream
pub fn read_model<R: Read>(mut reader: R) -> Result<DictionaryModel<AnyStore>> {
    let version = reader.read_i32::<BigEndian>()?;
    let model = match version {
        1 => read_v1(&mut reader)?,
        2 => read_v2(&mut reader)?,
        found => {
            return Err(DictionaryError::FormatVersionMismatch {
                found,
                supported: SUPPORTED_VERSIONS,
            })
        }
    };
    debug!(version, backend = %model.backend(), terms = model.num_terms(), "read dictionary");
    Ok(model)
}

fn read_count_i32<R: Read>(rdr: &mut R, what: &str) -> Result<u64> {
    let value = rdr.read_i32::<BigEndian>()?;
    u64::try_from(value).map_err(|_| DictionaryError::Corrupt(format!("negative {what}: {value}")))
}

fn check_term_count(store: &AnyStore, declared: u64) -> Result<()> {
    if store.unique_terms() as u64 != declared {
        return Err(DictionaryError::Corrupt(format!(
            "declared {declared} terms, found {}",
            store.unique_terms()
        )));
    }
    Ok(())
}

fn category_at<'a>(categories: &'a [Arc<str>], idx: u64) -> Result<&'a Arc<str>> {
    usize::try_from(idx)
        .ok()
        .and_then(|idx| categories.get(idx))
        .ok_or_else(|| DictionaryError::Corrupt(format!("unknown category index {idx}")))
}

fn read_v1<R: Read>(rdr: &mut R) -> Result<DictionaryModel<AnyStore>> {
    let num_categories = read_count_i32(rdr, "category count")?;
    let mut categories = Vec::new();
    let mut document_counts = CategoryEntries::new();
    for _ in 0..num_categories {
        let name: Arc<str> = Arc::from(read_string(rdr)?);
        let count = read_count_i32(rdr, "document count")?;
        if categories.contains(&name) {
            return Err(DictionaryError::Corrupt(format!("duplicate category `{name}`")));
        }
        document_counts.increment_shared(&name, count)?;
        categories.push(name);
    }

    let mut store = AnyStore::new(BackendKind::Trie);
    let num_terms = read_count_i32(rdr, "term count")?;
    for _ in 0..num_terms {
        let term = read_string(rdr)?;
        let num_entries = read_count_i32(rdr, "entry count")?;
        for _ in 0..num_entries {
            let idx = read_count_i32(rdr, "category index")?;
            let count = read_count_i32(rdr, "count")?;
            store.increment(&term, category_at(&categories, idx)?, count)?;
        }
    }
    check_term_count(&store, num_terms)?;

    let features = read_features(rdr)?;
    let name = read_string(rdr)?;
    let term_counts = store.term_totals();
    Ok(DictionaryModel::from_parts(store, document_counts, term_counts, name, features))
}

fn read_v2<R: Read>(rdr: &mut R) -> Result<DictionaryModel<AnyStore>> {
    let tag = rdr.read_u8()?;
    let kind = BackendKind::from_tag(tag)
        .ok_or_else(|| DictionaryError::Corrupt(format!("unknown backend tag {tag}")))?;

    let num_categories = rdr.read_u32::<BigEndian>()?;
    let mut categories: Vec<Arc<str>> = Vec::new();
    let mut document_counts = CategoryEntries::new();
    let mut term_counts = CategoryEntries::new();
    for _ in 0..num_categories {
        let name: Arc<str> = Arc::from(read_string(rdr)?);
        if categories.contains(&name) {
            return Err(DictionaryError::Corrupt(format!("duplicate category `{name}`")));
        }
        document_counts.increment_shared(&name, rdr.read_u64::<BigEndian>()?)?;
        term_counts.increment_shared(&name, rdr.read_u64::<BigEndian>()?)?;
        categories.push(name);
    }

    let num_terms = u64::from(rdr.read_u32::<BigEndian>()?);
    let store = if kind == BackendKind::Hashed {
        let mut hashed = HashedStore::new();
        for name in &categories {
            hashed
                .register_category(name)
                .map_err(|err| DictionaryError::Corrupt(err.to_string()))?;
        }
        for _ in 0..num_terms {
            let hash = rdr.read_u32::<BigEndian>()?;
            let num_entries = rdr.read_u32::<BigEndian>()?;
            let mut words = Vec::new();
            for _ in 0..num_entries {
                words.push(rdr.read_u64::<BigEndian>()?);
            }
            hashed.insert_packed(hash, words)?;
        }
        AnyStore::Hashed(hashed)
    } else {
        let mut store = AnyStore::new(kind);
        for _ in 0..num_terms {
            let term = read_string(rdr)?;
            let num_entries = rdr.read_u32::<BigEndian>()?;
            for _ in 0..num_entries {
                let idx = rdr.read_u32::<BigEndian>()?;
                let count = rdr.read_u32::<BigEndian>()?;
                store.increment(&term, category_at(&categories, u64::from(idx))?, u64::from(count))?;
            }
        }
        store
    };
    check_term_count(&store, num_terms)?;
    if store.term_totals() != term_counts {
        return Err(DictionaryError::Corrupt(
            "term totals do not match the term records".to_string(),
        ));
    }

    let features = read_features(rdr)?;
    let name = if read_flag(rdr)? {
        read_string(rdr)?
    } else {
        DEFAULT_NAME.to_string()
    };
    Ok(DictionaryModel::from_parts(store, document_counts, term_counts, name, features))
}

/// Writes the model to `path` atomically: the data goes to a temporary
/// file in the same directory which then replaces `path`.
pub fn save<S, P>(model: &DictionaryModel<S>, path: P) -> Result<()>
where
    S: TermStore,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = NamedTempFile::new_in(parent)?;
    write_model(model, BufWriter::new(file.as_file()))?;
    file.persist(path).map_err(|err| err.error)?;
    info!(path = %path.display(), terms = model.num_terms(), "saved dictionary");
    Ok(())
}

/// Reads a model saved with `save`
pub fn load<P: AsRef<Path>>(path: P) -> Result<DictionaryModel<AnyStore>> {
    let path = path.as_ref();
    let model = read_model(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), terms = model.num_terms(), "loaded dictionary");
    Ok(model)
}

impl<S: TermStore> DictionaryModel<S> {
    /// See `codec::write_model`
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        write_model(self, writer)
    }

    /// See `codec::save`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save(self, path)
    }
}

impl DictionaryModel<AnyStore> {
    /// See `codec::read_model`
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        read_model(reader)
    }

    /// See `codec::load`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load(path)
    }
}
