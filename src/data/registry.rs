//! Construct dataset trees from JSON descriptions.
//!
//! A node is an object with a `type` field naming the dataset kind; the
//! remaining fields are that kind's parameters. `ConcatDataset` and
//! `RepeatDataset` are always available, leaf kinds are registered by the
//! caller.

use super::dataset::{
    shared, AnnotatedDataset, ConcatConfig, ConcatDataset, DatasetMeta, RepeatDataset,
    SharedDataset,
};
use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CONCAT_DATASET: &str = "ConcatDataset";
pub const REPEAT_DATASET: &str = "RepeatDataset";
pub const LIST_DATASET: &str = "ListDataset";

const BUILTIN: [&str; 2] = [CONCAT_DATASET, REPEAT_DATASET];

pub type DatasetFactory<I> = Box<dyn Fn(&Value) -> Result<SharedDataset<I>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl DatasetSpec {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|source| Error::Config {
            name: "dataset".into(),
            source,
        })
    }

    fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|source| {
            Error::Config {
                name: self.kind.clone(),
                source,
            }
        })
    }
}

#[derive(Deserialize)]
struct ConcatParams {
    datasets: Vec<DatasetSpec>,
    #[serde(flatten)]
    config: ConcatConfig,
}

#[derive(Deserialize)]
struct RepeatParams {
    dataset: DatasetSpec,
    times: usize,
}

#[derive(Deserialize)]
struct ListParams {
    items: Vec<Value>,
    #[serde(default)]
    aspect_ratios: Option<Vec<f32>>,
    #[serde(default)]
    meta: Option<DatasetMeta>,
}

/// Named dataset factories.
pub struct DatasetRegistry<I> {
    factories: BTreeMap<String, DatasetFactory<I>>,
}

impl<I> Default for DatasetRegistry<I> {
    fn default() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }
}

impl<I> DatasetRegistry<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf factory under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<SharedDataset<I>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateDataset(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        BUILTIN.contains(&name) || self.factories.contains_key(name)
    }

    /// Every constructible dataset type, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names = BUILTIN.to_vec();
        names.extend(self.factories.keys().map(String::as_str));
        names.sort_unstable();
        names
    }
}

impl<I> DatasetRegistry<I>
where
    I: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn build(&self, spec: &DatasetSpec) -> Result<SharedDataset<I>> {
        match spec.kind.as_str() {
            CONCAT_DATASET => {
                let params: ConcatParams = spec.params()?;
                let datasets = params
                    .datasets
                    .iter()
                    .map(|child| self.build(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(shared(ConcatDataset::with_config(datasets, params.config)?))
            }
            REPEAT_DATASET => {
                let params: RepeatParams = spec.params()?;
                let dataset = self.build(&params.dataset)?;
                Ok(shared(RepeatDataset::new(dataset, params.times)?))
            }
            name => {
                let factory = self
                    .factories
                    .get(name)
                    .ok_or_else(|| Error::UnknownDataset(name.to_string()))?;
                factory(&Value::Object(spec.params.clone()))
            }
        }
    }

    pub fn build_value(&self, value: Value) -> Result<SharedDataset<I>> {
        self.build(&DatasetSpec::from_value(value)?)
    }
}

impl DatasetRegistry<Value> {
    /// A registry that also knows the inline JSON `ListDataset` leaf.
    pub fn with_list_dataset() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert(LIST_DATASET.to_string(), Box::new(list_dataset));
        registry
    }
}

/// Leaf dataset whose items, aspect ratios and meta are given inline.
pub fn list_dataset(params: &Value) -> Result<SharedDataset<Value>> {
    let params: ListParams =
        serde_json::from_value(params.clone()).map_err(|source| Error::Config {
            name: LIST_DATASET.into(),
            source,
        })?;

    let mut dataset = AnnotatedDataset::from_items(params.items);
    if let Some(ratios) = params.aspect_ratios {
        dataset = dataset.with_aspect_ratios(ratios);
    }
    if let Some(meta) = params.meta {
        dataset = dataset.with_meta(meta);
    }
    Ok(shared(dataset))
}
