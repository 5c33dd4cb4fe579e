mod dataset;
pub mod registry;

pub use dataset::{
    shared, AnnotatedDataset, AttributedDataset, ConcatConfig, ConcatDataset, DatasetMeta,
    ItemAccess, RepeatDataset, SerializedItems, SharedDataset,
};
pub use registry::{DatasetRegistry, DatasetSpec};
