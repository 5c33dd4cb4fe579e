use super::{check_ratio_len, AttributedDataset, DatasetMeta, SharedDataset};
use crate::error::{Error, Result};
use burn::data::dataset::Dataset;

/// Presents one dataset as if it were repeated `times` times.
///
/// Index `k * n + j` maps to item `j` of the underlying dataset of length
/// `n`. Useful when a dataset is small and per-epoch loader startup
/// dominates.
pub struct RepeatDataset<I> {
    dataset: SharedDataset<I>,
    times: usize,
    original_len: usize,
    len: usize,
    aspect_ratios: Option<Vec<f32>>,
}

impl<I> RepeatDataset<I> {
    pub fn new(dataset: SharedDataset<I>, times: usize) -> Result<Self> {
        if times == 0 {
            return Err(Error::InvalidRepeatTimes { times });
        }

        let original_len = dataset.len();
        let overflow = || Error::RepeatOverflow {
            len: original_len,
            times,
        };
        let len = original_len.checked_mul(times).ok_or_else(overflow)?;

        let aspect_ratios = match dataset.aspect_ratios() {
            Some(ratios) => {
                check_ratio_len(0, ratios, original_len)?;
                // Tiled ratios must also fit in one allocation.
                if len > isize::MAX as usize / std::mem::size_of::<f32>() {
                    return Err(overflow());
                }
                Some(ratios.repeat(times))
            }
            None => None,
        };

        tracing::debug!(
            "RepeatDataset: {} items repeated {} times",
            original_len,
            times
        );

        Ok(Self {
            dataset,
            times,
            original_len,
            len,
            aspect_ratios,
        })
    }

    pub fn times(&self) -> usize {
        self.times
    }

    /// Length of the underlying dataset.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn inner(&self) -> &SharedDataset<I> {
        &self.dataset
    }

    pub fn try_get(&self, index: usize) -> Result<I> {
        let len = self.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let local = index % self.original_len;
        self.dataset.get(local).ok_or(Error::MissingItem {
            position: 0,
            index: local,
        })
    }
}

impl<I> Dataset<I> for RepeatDataset<I> {
    fn get(&self, index: usize) -> Option<I> {
        if index >= self.len() {
            return None;
        }
        self.dataset.get(index % self.original_len)
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl<I> AttributedDataset<I> for RepeatDataset<I> {
    fn aspect_ratios(&self) -> Option<&[f32]> {
        self.aspect_ratios.as_deref()
    }

    // Metadata describes the data, not how often it is replayed.
    fn meta(&self) -> Option<&DatasetMeta> {
        self.dataset.meta()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::{letters, letters_with_ratios, meta};
    use crate::data::dataset::{shared, AnnotatedDataset, ConcatDataset};
    use serde_json::json;

    #[test]
    fn test_repeat_three_items_twice() {
        let dataset = RepeatDataset::new(letters(&["A", "B", "C"]), 2).unwrap();

        assert_eq!(dataset.len(), 6);
        assert_eq!(dataset.get(4).as_deref(), Some("B"));
        assert_eq!(dataset.get(6), None);
    }

    #[test]
    fn test_every_index_wraps() {
        let underlying = letters(&["A", "B", "C", "D"]);
        for times in 1..5 {
            let dataset = RepeatDataset::new(underlying.clone(), times).unwrap();
            assert_eq!(dataset.len(), times * underlying.len());

            for k in 0..times {
                for j in 0..underlying.len() {
                    assert_eq!(dataset.get(k * underlying.len() + j), underlying.get(j));
                }
            }
        }
    }

    #[test]
    fn test_aspect_ratios_tiled() {
        let dataset =
            RepeatDataset::new(letters_with_ratios(&["A", "B"], &[0.5, 2.0]), 3).unwrap();
        let ratios = dataset.aspect_ratios().unwrap();

        assert_eq!(ratios, &[0.5, 2.0, 0.5, 2.0, 0.5, 2.0]);
        for index in 0..dataset.len() {
            assert_eq!(ratios[index], [0.5, 2.0][index % 2]);
        }
    }

    #[test]
    fn test_no_aspect_ratios_when_absent() {
        let dataset = RepeatDataset::new(letters(&["A"]), 3).unwrap();
        assert!(dataset.aspect_ratios().is_none());
    }

    #[test]
    fn test_zero_times_is_rejected() {
        assert!(matches!(
            RepeatDataset::new(letters(&["A"]), 0),
            Err(Error::InvalidRepeatTimes { times: 0 })
        ));
    }

    #[test]
    fn test_empty_underlying_has_no_valid_index() {
        let dataset = RepeatDataset::new(letters(&[]), 5).unwrap();

        assert_eq!(dataset.len(), 0);
        assert!(dataset.is_empty());
        assert_eq!(dataset.get(0), None);
        assert!(matches!(
            dataset.try_get(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_meta_passes_through() {
        let underlying: SharedDataset<u8> =
            shared(AnnotatedDataset::from_items(vec![7]).with_meta(meta(&[("name", json!("voc"))])));
        let dataset = RepeatDataset::new(underlying, 2).unwrap();

        assert_eq!(dataset.meta().unwrap()["name"], json!("voc"));
        assert_eq!(dataset.try_get(1).unwrap(), 7);
    }

    #[test]
    fn test_repeat_of_concat() {
        let concat: SharedDataset<String> =
            shared(ConcatDataset::new(vec![letters(&["A"]), letters(&["B", "C"])]).unwrap());
        let dataset = RepeatDataset::new(concat, 2).unwrap();

        let items = dataset.iter().collect::<Vec<_>>();
        assert_eq!(items, ["A", "B", "C", "A", "B", "C"]);
        assert_eq!(dataset.original_len(), 3);
        assert_eq!(dataset.times(), 2);
    }

    #[test]
    fn test_overflowing_length_is_rejected() {
        assert!(matches!(
            RepeatDataset::new(letters(&["A", "B"]), usize::MAX),
            Err(Error::RepeatOverflow {
                len: 2,
                times: usize::MAX
            })
        ));

        // Fits in `usize`, but the tiled ratios would not fit in memory.
        let times = usize::MAX / 4;
        assert!(matches!(
            RepeatDataset::new(letters_with_ratios(&["A", "B"], &[1.0, 2.0]), times),
            Err(Error::RepeatOverflow { len: 2, .. })
        ));
        let plain = RepeatDataset::new(letters(&["A", "B"]), times).unwrap();
        assert_eq!(plain.len(), times * 2);
        assert_eq!(plain.get(times * 2 - 1).as_deref(), Some("B"));
    }

    #[test]
    fn test_empty_underlying_never_overflows() {
        let dataset = RepeatDataset::new(letters(&[]), usize::MAX).unwrap();
        assert_eq!(dataset.len(), 0);
        assert_eq!(dataset.get(0), None);
    }
}
