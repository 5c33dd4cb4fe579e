#[macro_use]
extern crate derive_new;

pub mod data;
pub mod error;

pub use data::{
    AnnotatedDataset, AttributedDataset, ConcatConfig, ConcatDataset, DatasetRegistry,
    DatasetSpec, ItemAccess, RepeatDataset, SharedDataset,
};
pub use error::{Error, Result};
