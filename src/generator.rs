//! Seeded generator of test vectors, records and request batches.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::Result;
use crate::protocol::{ElementType, MultiRequest, Record, Request, VectorElements, VectorFormat};

/// Produces random records for a given format.
///
/// Each generator owns its random source, so two generators built from the
/// same seed yield the same sequence.
#[derive(Debug, Clone)]
pub struct RecordGenerator {
    rng: StdRng,
}

impl RecordGenerator {
    /// Create a generator from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// `len` values drawn uniformly from [0, 1).
    ///
    /// Integer types scale each draw by `2^(bits - 1)` and truncate.
    pub fn random_vector(&mut self, element_type: ElementType, len: usize) -> VectorElements {
        let scale = if element_type.is_float() {
            1.0
        } else {
            2f64.powi(element_type.bits() as i32 - 1)
        };
        let mut draw = || self.rng.random::<f64>() * scale;

        match element_type {
            ElementType::I8 => VectorElements::I8((0..len).map(|_| draw() as i8).collect()),
            ElementType::I16 => VectorElements::I16((0..len).map(|_| draw() as i16).collect()),
            ElementType::I32 => VectorElements::I32((0..len).map(|_| draw() as i32).collect()),
            ElementType::I64 => VectorElements::I64((0..len).map(|_| draw() as i64).collect()),
            ElementType::U8 => VectorElements::U8((0..len).map(|_| draw() as u8).collect()),
            ElementType::U16 => VectorElements::U16((0..len).map(|_| draw() as u16).collect()),
            ElementType::U32 => VectorElements::U32((0..len).map(|_| draw() as u32).collect()),
            ElementType::U64 => VectorElements::U64((0..len).map(|_| draw() as u64).collect()),
            ElementType::F32 => VectorElements::F32((0..len).map(|_| draw() as f32).collect()),
            ElementType::F64 => VectorElements::F64((0..len).map(|_| draw()).collect()),
        }
    }

    /// A record of `format` with a random vector and zeroed prefix and suffix.
    pub fn random_record(&mut self, format: &VectorFormat) -> Result<Record> {
        format.validate()?;
        let elements = self.random_vector(format.element_type, format.vector_length as usize);
        Record::from_elements(format, &elements)
    }

    /// A request for the `k` closest records to a random query.
    pub fn random_request(&mut self, k: u32, format: VectorFormat) -> Result<Request> {
        let record = self.random_record(&format)?;
        Request::new(k, format, record)
    }

    /// A batch of `count` random requests sharing `format`.
    pub fn random_multi_request(
        &mut self,
        count: usize,
        k: u32,
        format: VectorFormat,
    ) -> Result<MultiRequest> {
        let requests = (0..count)
            .map(|_| self.random_request(k, format))
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiRequest::new(requests))
    }

    /// Contents of a storage object: `count` random records back to back.
    pub fn random_object(&mut self, format: &VectorFormat, count: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(format.record_len() * count);
        for _ in 0..count {
            bytes.extend_from_slice(self.random_record(format)?.as_bytes());
        }
        Ok(bytes)
    }
}

/// Name of the `index`-th test object: thirty objects per day of May 2018,
/// `test_0000__2018_05_01` upward.
pub fn object_name(index: usize) -> String {
    format!("test_{:04}__2018_05_{:02}", index / 30, 1 + index % 30)
}

/// Names of the first `count` test objects.
pub fn object_names(count: usize) -> Vec<String> {
    (0..count).map(object_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(text: &str) -> VectorFormat {
        text.parse().unwrap()
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RecordGenerator::new(42);
        let mut b = RecordGenerator::new(42);
        assert_eq!(
            a.random_vector(ElementType::F64, 8),
            b.random_vector(ElementType::F64, 8)
        );

        let mut c = RecordGenerator::new(43);
        assert_ne!(
            a.random_vector(ElementType::F64, 8),
            c.random_vector(ElementType::F64, 8)
        );
    }

    #[test]
    fn test_float_range() {
        let mut generator = RecordGenerator::new(1);
        match generator.random_vector(ElementType::F32, 256) {
            VectorElements::F32(values) => {
                assert_eq!(values.len(), 256);
                assert!(values.iter().all(|v| (0.0..1.0).contains(v)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_integer_scaling() {
        let mut generator = RecordGenerator::new(7);
        match generator.random_vector(ElementType::U8, 512) {
            VectorElements::U8(values) => assert!(values.iter().all(|&v| v < 128)),
            other => panic!("unexpected {other:?}"),
        }
        match generator.random_vector(ElementType::I16, 512) {
            VectorElements::I16(values) => {
                assert!(values.iter().all(|&v| v >= 0));
                assert!(values.iter().any(|&v| v > 255));
            }
            other => panic!("unexpected {other:?}"),
        }
        for element_type in ElementType::ALL {
            let v = generator.random_vector(element_type, 3);
            assert_eq!(v.element_type(), element_type);
            assert_eq!(v.len(), 3);
        }
    }

    #[test]
    fn test_random_record() {
        let format = format("20+4:f32x4");
        let mut generator = RecordGenerator::new(3);
        let record = generator.random_record(&format).unwrap();
        assert_eq!(record.len(), 20);

        let view = record.view(&format).unwrap();
        assert_eq!(view.prefix, vec![0; 4]);
        assert!(view.suffix.is_empty());
        assert_eq!(view.vector.len(), 4);
    }

    #[test]
    fn test_random_multi_request() {
        let format = format("16+0:u16x8");
        let batch = RecordGenerator::new(9)
            .random_multi_request(5, 10, format)
            .unwrap();
        assert_eq!(batch.len(), 5);
        assert!(batch.requests().iter().all(|r| r.num_to_find() == 10));
        assert_eq!(batch.encode().unwrap().len(), 4 + 5 * (4 + 16 + 16));
    }

    #[test]
    fn test_random_object() {
        let format = format("12+2:i8x8");
        let bytes = RecordGenerator::new(5).random_object(&format, 10).unwrap();
        assert_eq!(bytes.len(), 120);
    }

    #[test]
    fn test_object_names() {
        let names = object_names(62);
        assert_eq!(names[0], "test_0000__2018_05_01");
        assert_eq!(names[29], "test_0000__2018_05_30");
        assert_eq!(names[30], "test_0001__2018_05_01");
        assert_eq!(names[61], "test_0002__2018_05_02");
    }
}
