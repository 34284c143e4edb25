pub mod builder;
pub mod category;
pub mod codec;
pub mod feature;
pub mod model;
pub mod pruning;
pub mod scoring;
pub mod store;
pub mod sync;

pub use builder::{BuilderState, DictionaryBuilder};
pub use category::{Category, CategoryEntries};
pub use feature::{FeatureSetting, TextFeatureType};
pub use model::DictionaryModel;
pub use pruning::PruningStrategy;
pub use sync::SynchronizedModel;
