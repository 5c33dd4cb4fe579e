use crate::error::{Error, Result};
use burn::data::dataset::{Dataset, InMemDataset};
use std::collections::BTreeMap;
use std::sync::Arc;

mod concat;
mod repeat;
mod serialized;

pub use concat::{ConcatConfig, ConcatDataset, ItemAccess};
pub use repeat::RepeatDataset;
pub use serialized::SerializedItems;

/// Dataset-level metadata, keyed by name.
pub type DatasetMeta = BTreeMap<String, serde_json::Value>;

/// Shared handle to a dataset, the unit the wrappers compose.
pub type SharedDataset<I> = Arc<dyn AttributedDataset<I>>;

/// A [`Dataset`] that may also expose per-item aspect ratios and
/// dataset-level metadata.
///
/// Both capabilities are optional. Implementations decide once, at
/// construction, whether they expose them; the answer must not change
/// afterwards.
pub trait AttributedDataset<I>: Dataset<I> {
    /// One ratio per item, in index order.
    fn aspect_ratios(&self) -> Option<&[f32]> {
        None
    }

    fn meta(&self) -> Option<&DatasetMeta> {
        None
    }
}

impl<I, D> AttributedDataset<I> for Arc<D>
where
    D: AttributedDataset<I>,
{
    fn aspect_ratios(&self) -> Option<&[f32]> {
        self.as_ref().aspect_ratios()
    }

    fn meta(&self) -> Option<&DatasetMeta> {
        self.as_ref().meta()
    }
}

/// Wrap a dataset into a [`SharedDataset`] handle.
pub fn shared<I, D>(dataset: D) -> SharedDataset<I>
where
    D: AttributedDataset<I> + 'static,
{
    Arc::new(dataset)
}

/// Attaches optional attributes to any burn [`Dataset`].
#[derive(Debug)]
pub struct AnnotatedDataset<D> {
    dataset: D,
    aspect_ratios: Option<Vec<f32>>,
    meta: Option<DatasetMeta>,
}

impl<D> AnnotatedDataset<D> {
    pub fn new(dataset: D) -> Self {
        Self {
            dataset,
            aspect_ratios: None,
            meta: None,
        }
    }

    pub fn with_aspect_ratios(mut self, aspect_ratios: Vec<f32>) -> Self {
        self.aspect_ratios = Some(aspect_ratios);
        self
    }

    pub fn with_meta(mut self, meta: DatasetMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn inner(&self) -> &D {
        &self.dataset
    }
}

impl<I> AnnotatedDataset<InMemDataset<I>> {
    /// Build an annotated dataset over an in-memory list of items.
    pub fn from_items(items: Vec<I>) -> Self {
        Self::new(InMemDataset::new(items))
    }
}

impl<I, D: Dataset<I>> Dataset<I> for AnnotatedDataset<D> {
    fn get(&self, index: usize) -> Option<I> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl<I, D: Dataset<I>> AttributedDataset<I> for AnnotatedDataset<D> {
    fn aspect_ratios(&self) -> Option<&[f32]> {
        self.aspect_ratios.as_deref()
    }

    fn meta(&self) -> Option<&DatasetMeta> {
        self.meta.as_ref()
    }
}

// Children either all expose an attribute or none of them do; dataset 0 sets
// the expectation.
fn uniform_presence<I>(
    datasets: &[SharedDataset<I>],
    attribute: &'static str,
    exposes: impl Fn(&dyn AttributedDataset<I>) -> bool,
) -> Result<bool> {
    let Some(first) = datasets.first() else {
        return Ok(false);
    };
    let expected = exposes(first.as_ref());

    for (position, dataset) in datasets.iter().enumerate().skip(1) {
        let found = exposes(dataset.as_ref());
        if found != expected {
            return Err(Error::InconsistentAttribute {
                attribute,
                position,
                expected,
                found,
            });
        }
    }

    Ok(expected)
}

/// Concatenate the children's aspect ratios in child order.
pub(crate) fn concat_aspect_ratios<I>(datasets: &[SharedDataset<I>]) -> Result<Option<Vec<f32>>> {
    if !uniform_presence(datasets, "aspect_ratios", |d| d.aspect_ratios().is_some())? {
        return Ok(None);
    }

    let mut merged = Vec::with_capacity(datasets.iter().map(|d| d.len()).sum());
    for (position, dataset) in datasets.iter().enumerate() {
        let ratios = dataset.aspect_ratios().unwrap_or_default();
        check_ratio_len(position, ratios, dataset.len())?;
        merged.extend_from_slice(ratios);
    }

    Ok(Some(merged))
}

/// Union of the children's metadata; later children win on key collisions.
pub(crate) fn merge_meta<I>(datasets: &[SharedDataset<I>]) -> Result<Option<DatasetMeta>> {
    if !uniform_presence(datasets, "meta", |d| d.meta().is_some())? {
        return Ok(None);
    }

    let mut merged = DatasetMeta::new();
    for meta in datasets.iter().filter_map(|d| d.meta()) {
        merged.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Ok(Some(merged))
}

pub(crate) fn check_ratio_len(position: usize, ratios: &[f32], len: usize) -> Result<()> {
    if ratios.len() != len {
        return Err(Error::AspectRatioLength {
            position,
            found: ratios.len(),
            len,
        });
    }
    Ok(())
}
