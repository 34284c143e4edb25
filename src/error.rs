use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors raised by the dictionary, its stores and the model codec.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// An empty term or category name, or a zero weight.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The store cannot perform the requested operation (e.g. enumerating a hashed store).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The stream header carries a version this crate cannot read.
    #[error("unsupported model format version {found} (readable: {supported:?})")]
    FormatVersionMismatch {
        found: i32,
        supported: &'static [i32],
    },

    /// Adding `delta` to `current` would leave the representable count range.
    #[error("count overflow for category `{category}`: {current} + {delta}")]
    Overflow {
        category: String,
        current: u64,
        delta: u64,
    },

    /// A node arena or index ran out of addressable slots.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    /// The persisted model is malformed.
    #[error("corrupt model data: {0}")]
    Corrupt(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<FromUtf8Error> for DictionaryError {
    fn from(err: FromUtf8Error) -> Self {
        DictionaryError::Corrupt(format!("invalid utf-8 string: {err}"))
    }
}

impl From<toml::de::Error> for DictionaryError {
    fn from(err: toml::de::Error) -> Self {
        DictionaryError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DictionaryError>;
