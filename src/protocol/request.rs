//! find_closest requests.
//!
//! ```text
//! Request      = u32 num_to_find | format header (16) | record (record_size)
//! MultiRequest = u32 count | Request x count
//! ```
//!
//! Requests are matched to responses by position only; no identifier is
//! carried on the wire.

use crate::error::{Result, VecfindError};
use crate::protocol::format::{FORMAT_HEADER_LEN, VectorFormat};
use crate::protocol::record::Record;
use crate::protocol::wire::{WireReader, WireWriter};

/// One "find the k records closest to this vector" query.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    num_to_find: u32,
    format: VectorFormat,
    record: Record,
}

impl Request {
    /// Create a request. The record must match the format's record size.
    pub fn new(num_to_find: u32, format: VectorFormat, record: Record) -> Result<Self> {
        format.validate()?;
        if record.len() != format.record_len() {
            return Err(VecfindError::record_overflow(format!(
                "{format}: record of {} bytes, expected {}",
                record.len(),
                format.record_size
            )));
        }
        Ok(Request {
            num_to_find,
            format,
            record,
        })
    }

    /// Build a request from a raw vector payload.
    pub fn from_payload(num_to_find: u32, format: VectorFormat, payload: &[u8]) -> Result<Self> {
        let record = Record::encode(&format, payload)?;
        Self::new(num_to_find, format, record)
    }

    /// Number of nearest records wanted (k).
    pub fn num_to_find(&self) -> u32 {
        self.num_to_find
    }

    /// Format of the query record.
    pub fn format(&self) -> &VectorFormat {
        &self.format
    }

    /// The query record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Encoded size in bytes: `4 + 16 + record_size`.
    pub fn encoded_len(&self) -> usize {
        4 + FORMAT_HEADER_LEN + self.format.record_len()
    }

    /// Append the encoded request to `writer`.
    pub fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u32(self.num_to_find)?;
        self.format.write_header(writer)?;
        self.record.write_to(writer);
        Ok(())
    }

    /// Encode the request on its own.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut writer = WireWriter::with_capacity(self.encoded_len());
        self.encode_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Decode a request at `offset`, returning it with the offset just past it.
    pub fn decode(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut reader = WireReader::at(bytes, offset);
        let request = Self::read_from(&mut reader)?;
        Ok((request, reader.position()))
    }

    pub(crate) fn read_from(reader: &mut WireReader<'_>) -> Result<Self> {
        let num_to_find = reader.read_u32()?;
        let format = VectorFormat::read_header(reader)?;
        let record = Record::read_from(reader, &format)?;
        Self::new(num_to_find, format, record)
    }
}

/// An ordered batch of requests sent as one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiRequest {
    requests: Vec<Request>,
}

impl MultiRequest {
    /// Create a batch from requests in submission order.
    pub fn new(requests: Vec<Request>) -> Self {
        MultiRequest { requests }
    }

    /// Append a request.
    pub fn push(&mut self, request: Request) {
        self.requests.push(request);
    }

    /// Requests in submission order.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        4 + self.requests.iter().map(Request::encoded_len).sum::<usize>()
    }

    /// Encode the batch: `u32 count` followed by each request.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.requests.len()).map_err(|_| {
            VecfindError::invalid_argument(format!("{} requests in one batch", self.requests.len()))
        })?;

        let mut writer = WireWriter::with_capacity(self.encoded_len());
        writer.write_u32(count)?;
        for request in &self.requests {
            request.encode_into(&mut writer)?;
        }
        Ok(writer.into_inner())
    }

    /// Decode a batch from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes);
        let count = reader.read_u32()? as usize;
        // Every request takes at least 20 bytes; don't trust huge counts.
        let mut requests = Vec::with_capacity(count.min(reader.remaining() / 20));
        for _ in 0..count {
            requests.push(Request::read_from(&mut reader)?);
        }
        Ok(MultiRequest { requests })
    }
}

impl From<Vec<Request>> for MultiRequest {
    fn from(requests: Vec<Request>) -> Self {
        MultiRequest::new(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::element_type::{ElementType, VectorElements};

    fn f32_request(k: u32, values: Vec<f32>) -> Request {
        let format = VectorFormat::new(20, 4, ElementType::F32, 4).unwrap();
        Request::from_payload(k, format, &VectorElements::F32(values).to_le_bytes()).unwrap()
    }

    #[test]
    fn test_request_layout() {
        let request = f32_request(3, vec![0.1, 0.2, 0.3, 0.4]);
        let bytes = request.encode().unwrap();

        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..20], &[20, 0, 0, 0, 4, 0, 0, 0, 9, 0, 0, 0, 4, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(&bytes[24..28], &0.1f32.to_le_bytes());
    }

    #[test]
    fn test_request_decode_at_offset() {
        let request = f32_request(7, vec![1.0, 2.0, 3.0, 4.0]);
        let mut bytes = vec![0xee; 5];
        bytes.extend(request.encode().unwrap());

        let (decoded, next) = Request::decode(&bytes, 5).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn test_record_size_mismatch() {
        let format = VectorFormat::new(20, 4, ElementType::F32, 4).unwrap();
        let small = VectorFormat::new(16, 0, ElementType::F32, 4).unwrap();
        let err = Request::new(1, format, Record::zeroed(&small)).unwrap_err();
        assert!(matches!(err, VecfindError::RecordOverflow(_)));
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let format = VectorFormat {
            record_size: 8,
            vector_offset: 4,
            element_type: ElementType::F64,
            vector_length: 1,
        };
        let err = Request::new(1, format, Record::zeroed(&format)).unwrap_err();
        assert!(matches!(err, VecfindError::RecordOverflow(_)));
    }

    #[test]
    fn test_multi_request_size_law() {
        let other = VectorFormat::new(9, 1, ElementType::U16, 4).unwrap();
        let batch = MultiRequest::new(vec![
            f32_request(1, vec![0.0; 4]),
            f32_request(2, vec![1.0; 4]),
            Request::from_payload(5, other, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
        ]);

        let bytes = batch.encode().unwrap();
        assert_eq!(bytes.len(), 4 + (4 + 16 + 20) * 2 + (4 + 16 + 9));
        assert_eq!(bytes.len(), batch.encoded_len());
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());

        let decoded = MultiRequest::decode(&bytes).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_empty_multi_request() {
        let bytes = MultiRequest::default().encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        assert!(MultiRequest::decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_multi_request() {
        let batch = MultiRequest::new(vec![f32_request(1, vec![0.0; 4])]);
        let bytes = batch.encode().unwrap();
        let err = MultiRequest::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, VecfindError::TruncatedResponse(_)));
    }
}
