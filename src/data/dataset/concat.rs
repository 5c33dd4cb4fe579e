use super::{
    concat_aspect_ratios, merge_meta, AttributedDataset, DatasetMeta, SerializedItems,
    SharedDataset,
};
use crate::error::{Error, Result};
use burn::data::dataset::{Dataset, InMemDataset};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// How a non-serialized [`ConcatDataset`] hands out items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAccess {
    /// Read through to the shared children on every access.
    #[default]
    Shared,
    /// Snapshot every item at construction and return copies of the snapshot.
    Copied,
}

#[derive(new, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatConfig {
    /// Pack every item into one serialized buffer at construction.
    #[serde(default)]
    pub serialize: bool,
    /// Ignored when `serialize` is set.
    #[serde(default)]
    pub access: ItemAccess,
}

enum Storage<I> {
    Shared,
    Copied(Box<dyn Dataset<I>>),
    Serialized {
        items: SerializedItems,
        decode: fn(&SerializedItems, usize) -> Result<I>,
    },
}

/// Joins several datasets into one indexable sequence.
///
/// Global index `g` maps to child `i` and local index `g - sizes[i - 1]`,
/// where `sizes` are the cumulative child lengths. Aspect ratios and meta
/// are derived once from the children.
pub struct ConcatDataset<I> {
    datasets: Vec<SharedDataset<I>>,
    cumulative_sizes: Vec<usize>,
    storage: Storage<I>,
    aspect_ratios: Option<Vec<f32>>,
    meta: Option<DatasetMeta>,
}

impl<I> ConcatDataset<I> {
    /// Concatenate `datasets`, reading items through to them on access.
    pub fn new(datasets: Vec<SharedDataset<I>>) -> Result<Self> {
        Self::build(datasets, |_| Ok(Storage::Shared))
    }

    fn build(
        datasets: Vec<SharedDataset<I>>,
        storage: impl FnOnce(&[SharedDataset<I>]) -> Result<Storage<I>>,
    ) -> Result<Self> {
        if datasets.is_empty() {
            return Err(Error::EmptyConcat);
        }

        let cumulative_sizes = datasets
            .iter()
            .scan(0, |total, d| {
                *total += d.len();
                Some(*total)
            })
            .collect::<Vec<_>>();
        let aspect_ratios = concat_aspect_ratios(&datasets)?;
        let meta = merge_meta(&datasets)?;
        let storage = storage(&datasets)?;

        let dataset = Self {
            datasets,
            cumulative_sizes,
            storage,
            aspect_ratios,
            meta,
        };
        tracing::debug!(
            "ConcatDataset: {} datasets, {} items",
            dataset.datasets.len(),
            dataset.len()
        );
        Ok(dataset)
    }

    pub fn datasets(&self) -> &[SharedDataset<I>] {
        &self.datasets
    }

    /// End index (exclusive) of every child in the global sequence.
    pub fn cumulative_sizes(&self) -> &[usize] {
        &self.cumulative_sizes
    }

    /// The packed buffer, when the dataset was built with `serialize`.
    pub fn serialized(&self) -> Option<&SerializedItems> {
        match &self.storage {
            Storage::Serialized { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Split a global index into `(child, local index)`.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.total() {
            return None;
        }
        let child = self.cumulative_sizes.partition_point(|&end| end <= index);
        let start = match child {
            0 => 0,
            _ => self.cumulative_sizes[child - 1],
        };
        Some((child, index - start))
    }

    pub fn try_get(&self, index: usize) -> Result<I> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        match &self.storage {
            Storage::Shared => {
                let (position, local) = self
                    .locate(index)
                    .ok_or(Error::IndexOutOfRange { index, len })?;
                self.datasets[position]
                    .get(local)
                    .ok_or(Error::MissingItem {
                        position,
                        index: local,
                    })
            }
            Storage::Copied(items) => items.get(index).ok_or(Error::IndexOutOfRange { index, len }),
            Storage::Serialized { items, decode } => decode(items, index),
        }
    }

    fn total(&self) -> usize {
        self.cumulative_sizes.last().copied().unwrap_or(0)
    }
}

impl<I> ConcatDataset<I>
where
    I: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Concatenate `datasets` with the storage selected by `config`.
    pub fn with_config(datasets: Vec<SharedDataset<I>>, config: ConcatConfig) -> Result<Self> {
        Self::build(datasets, |datasets| {
            if config.serialize {
                let items = materialize(datasets)?;
                tracing::info!(
                    "Serializing {} elements to byte buffers and concatenating them all ...",
                    items.len()
                );
                return Ok(Storage::Serialized {
                    items: SerializedItems::encode(items)?,
                    decode: SerializedItems::decode::<I>,
                });
            }

            match config.access {
                ItemAccess::Shared => Ok(Storage::Shared),
                ItemAccess::Copied => Ok(Storage::Copied(Box::new(InMemDataset::new(
                    materialize(datasets)?,
                )))),
            }
        })
    }
}

fn materialize<I>(datasets: &[SharedDataset<I>]) -> Result<Vec<I>> {
    let mut items = Vec::with_capacity(datasets.iter().map(|d| d.len()).sum());
    for (position, dataset) in datasets.iter().enumerate() {
        for index in 0..dataset.len() {
            items.push(
                dataset
                    .get(index)
                    .ok_or(Error::MissingItem { position, index })?,
            );
        }
    }
    Ok(items)
}

impl<I> Dataset<I> for ConcatDataset<I> {
    fn get(&self, index: usize) -> Option<I> {
        match self.try_get(index) {
            Ok(item) => Some(item),
            Err(Error::IndexOutOfRange { .. }) => None,
            Err(err) => {
                tracing::error!("ConcatDataset: {}", err);
                None
            }
        }
    }

    fn len(&self) -> usize {
        match &self.storage {
            Storage::Serialized { items, .. } => items.len(),
            _ => self.total(),
        }
    }
}

impl<I> AttributedDataset<I> for ConcatDataset<I> {
    fn aspect_ratios(&self) -> Option<&[f32]> {
        self.aspect_ratios.as_deref()
    }

    fn meta(&self) -> Option<&DatasetMeta> {
        self.meta.as_ref()
    }
}
