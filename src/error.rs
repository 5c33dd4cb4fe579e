use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot concatenate an empty list of datasets")]
    EmptyConcat,

    #[error("repeat count must be at least 1, got {times}")]
    InvalidRepeatTimes { times: usize },

    #[error("repeating {len} items {times} times overflows")]
    RepeatOverflow { len: usize, times: usize },

    #[error("index {index} is out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Children must agree on whether an optional attribute is exposed.
    #[error("dataset {position} disagrees with dataset 0 on exposing `{attribute}` (dataset 0: {expected}, dataset {position}: {found})")]
    InconsistentAttribute {
        attribute: &'static str,
        position: usize,
        expected: bool,
        found: bool,
    },

    #[error("dataset {position} has {found} aspect ratios for {len} items")]
    AspectRatioLength {
        position: usize,
        found: usize,
        len: usize,
    },

    #[error("dataset {position} returned no item at index {index} while materializing")]
    MissingItem { position: usize, index: usize },

    #[error("failed to serialize item {index}: {source}")]
    Serialize {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The item decodes, but not back to the value that was encoded.
    #[error("item {index} does not survive serialization unchanged")]
    RoundTrip { index: usize },

    #[error("failed to decode item {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown dataset type `{0}`")]
    UnknownDataset(String),

    #[error("dataset type `{0}` is already registered")]
    DuplicateDataset(String),

    #[error("invalid config for `{name}`: {source}")]
    Config {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
