//! Flat, read-only storage for serialized items.
//!
//! Every item is encoded on its own and appended to one contiguous buffer.
//! A table of cumulative end offsets locates item `i` at
//! `offsets[i - 1]..offsets[i]` (with an implicit leading zero). The buffer
//! is a reference-counted [`Bytes`], so handing it to another worker never
//! copies the payload and holds no per-item allocations.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone)]
pub struct SerializedItems {
    buffer: Bytes,
    offsets: Arc<[u64]>,
}

impl SerializedItems {
    /// Encode `items` in order into a single buffer.
    ///
    /// Each item is decoded and re-encoded once on the way in, so an item that
    /// cannot come back out (JSON writes NaN and infinities as `null`) fails
    /// here instead of on a later read.
    pub fn encode<I, T>(items: T) -> Result<Self>
    where
        I: Serialize + DeserializeOwned,
        T: IntoIterator<Item = I>,
    {
        let mut buffer = BytesMut::new().writer();
        let mut offsets = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let start = buffer.get_ref().len();
            serde_json::to_writer(&mut buffer, &item)
                .map_err(|source| Error::Serialize { index, source })?;
            check_round_trip::<I>(index, &buffer.get_ref()[start..])?;
            offsets.push(buffer.get_ref().len() as u64);
        }

        let items = Self {
            buffer: buffer.into_inner().freeze(),
            offsets: offsets.into(),
        };

        tracing::info!(
            "Serialized dataset takes {:.2} MiB",
            items.nbytes() as f64 / MIB
        );

        Ok(items)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total payload size in bytes.
    pub fn nbytes(&self) -> usize {
        self.buffer.len()
    }

    /// Cumulative end offset of every item.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Encoded bytes of item `index`, sharing the underlying buffer.
    pub fn raw(&self, index: usize) -> Option<Bytes> {
        let end = *self.offsets.get(index)? as usize;
        let start = match index {
            0 => 0,
            _ => self.offsets[index - 1] as usize,
        };
        Some(self.buffer.slice(start..end))
    }

    pub fn decode<I: DeserializeOwned>(&self, index: usize) -> Result<I> {
        let raw = self.raw(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        serde_json::from_slice(&raw).map_err(|source| Error::Decode { index, source })
    }
}

fn check_round_trip<I>(index: usize, encoded: &[u8]) -> Result<()>
where
    I: Serialize + DeserializeOwned,
{
    let decoded: I =
        serde_json::from_slice(encoded).map_err(|source| Error::Serialize { index, source })?;
    let again = serde_json::to_vec(&decoded).map_err(|source| Error::Serialize { index, source })?;
    if again != encoded {
        return Err(Error::RoundTrip { index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        file_name: String,
        height: u32,
        width: u32,
        boxes: Vec<[f32; 4]>,
    }

    fn records() -> Vec<Record> {
        vec![
            Record {
                file_name: "000001.jpg".into(),
                height: 480,
                width: 640,
                boxes: vec![[0.0, 0.0, 10.0, 10.0]],
            },
            Record {
                file_name: "000002.jpg".into(),
                height: 600,
                width: 400,
                boxes: vec![],
            },
            Record {
                file_name: "000003.jpg".into(),
                height: 10,
                width: 20,
                boxes: vec![[1.5, 2.5, 3.5, 4.5], [5.0, 6.0, 7.0, 8.0]],
            },
        ]
    }

    #[test]
    fn test_decode_restores_every_item() {
        let source = records();
        let items = SerializedItems::encode(source.clone()).unwrap();

        assert_eq!(items.len(), source.len());
        for (index, record) in source.iter().enumerate() {
            assert_eq!(&items.decode::<Record>(index).unwrap(), record);
        }
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let items = SerializedItems::encode(["a", "bb", "ccc"].map(String::from)).unwrap();
        // JSON strings carry two quote bytes each.
        assert_eq!(items.offsets(), &[3, 7, 12]);
        assert_eq!(items.nbytes(), 12);
        assert_eq!(&items.raw(1).unwrap()[..], b"\"bb\"");
    }

    #[test]
    fn test_out_of_range() {
        let items = SerializedItems::encode([1u8, 2]).unwrap();
        assert!(items.raw(2).is_none());
        assert!(matches!(
            items.decode::<u8>(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_mismatched_type_is_a_decode_error() {
        let items = SerializedItems::encode([String::from("not a number")]).unwrap();
        assert!(matches!(
            items.decode::<u32>(0),
            Err(Error::Decode { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty() {
        let items = SerializedItems::encode(Vec::<u8>::new()).unwrap();
        assert!(items.is_empty());
        assert_eq!(items.nbytes(), 0);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let items = SerializedItems::encode(records()).unwrap();
        let other = items.clone();
        assert_eq!(items.buffer().as_ptr(), other.buffer().as_ptr());
    }

    #[test]
    fn test_random_floats_decode_bit_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let doubles = std::iter::repeat_with(|| f64::from_bits(rng.gen()))
            .filter(|x| x.is_finite())
            .take(20_000)
            .collect::<Vec<_>>();
        let singles = std::iter::repeat_with(|| f32::from_bits(rng.gen()))
            .filter(|x| x.is_finite())
            .take(20_000)
            .collect::<Vec<_>>();

        let items = SerializedItems::encode(doubles.iter().copied()).unwrap();
        for (index, x) in doubles.iter().enumerate() {
            assert_eq!(items.decode::<f64>(index).unwrap().to_bits(), x.to_bits());
        }

        let items = SerializedItems::encode(singles.iter().copied()).unwrap();
        for (index, x) in singles.iter().enumerate() {
            assert_eq!(items.decode::<f32>(index).unwrap().to_bits(), x.to_bits());
        }
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                SerializedItems::encode([1.0f32, bad]),
                Err(Error::Serialize { index: 1, .. })
            ));
        }
    }

    #[test]
    fn test_nan_inside_record_is_rejected() {
        let mut record = records().remove(0);
        record.boxes[0][2] = f32::NAN;
        assert!(matches!(
            SerializedItems::encode([record]),
            Err(Error::Serialize { index: 0, .. })
        ));
    }

    #[derive(Serialize, Deserialize)]
    struct Cached {
        value: u8,
        #[serde(skip_deserializing)]
        hits: u8,
    }

    #[test]
    fn test_changed_on_decode_is_rejected() {
        let items = [Cached { value: 1, hits: 0 }, Cached { value: 2, hits: 5 }];
        assert!(matches!(
            SerializedItems::encode(items),
            Err(Error::RoundTrip { index: 1 })
        ));
    }
}
