use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::dictionary::builder::{DictionaryBuilder, DEFAULT_HOUSEKEEPING_INTERVAL};
use crate::dictionary::feature::FeatureSetting;
use crate::dictionary::pruning::PruningStrategy;
use crate::dictionary::scoring::ScorerConfig;
use crate::dictionary::store::{AnyStore, BackendKind};
use crate::error::{DictionaryError, Result};

/// Dictionary configuration, typically read from TOML:
///
/// ```toml
/// backend = "category_trie"
/// housekeeping_interval = 50000
/// name = "news"
///
/// [pruning]
/// type = "term_count"
/// min_count = 2
///
/// [scorer]
/// type = "bayes"
/// complement = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DictionaryConfig {
    /// Store encoding (default: trie)
    #[serde(default)]
    pub backend: BackendKind,

    /// Term insertions between re-sorts of the records; 0 disables
    #[serde(default = "default_housekeeping_interval")]
    pub housekeeping_interval: u64,

    #[serde(default)]
    pub name: Option<String>,

    /// Applied once when the builder is frozen
    #[serde(default)]
    pub pruning: Option<PruningStrategy>,

    /// Scoring used by `classify` callers that follow the config
    #[serde(default)]
    pub scorer: ScorerConfig,

    #[serde(default)]
    pub features: Option<FeatureSetting>,
}

fn default_housekeeping_interval() -> u64 {
    DEFAULT_HOUSEKEEPING_INTERVAL
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        DictionaryConfig {
            backend: BackendKind::default(),
            housekeeping_interval: default_housekeeping_interval(),
            name: None,
            pruning: None,
            scorer: ScorerConfig::default(),
            features: None,
        }
    }
}

impl DictionaryConfig {
    /// Parses and validates a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: DictionaryConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| DictionaryError::Config(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(pruning) = &self.pruning {
            pruning
                .validate()
                .map_err(|err| DictionaryError::Config(err.to_string()))?;
        }
        if let Some(name) = &self.name {
            if name.is_empty() {
                return Err(DictionaryError::Config("name must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Empty builder with the configured store and settings
    pub fn builder(&self) -> DictionaryBuilder<AnyStore> {
        let mut builder = DictionaryBuilder::new(AnyStore::new(self.backend))
            .with_housekeeping_interval(self.housekeeping_interval);
        if let Some(pruning) = &self.pruning {
            builder = builder.with_pruning(pruning.clone());
        }
        if let Some(name) = &self.name {
            builder = builder.with_name(name.clone());
        }
        if let Some(features) = &self.features {
            builder = builder.with_features(features.clone());
        }
        builder
    }

    pub fn scorer(&self) -> ScorerConfig {
        self.scorer
    }
}
