//! find_closest responses.
//!
//! ```text
//! Result        = f64 distance | record (shared format record_size)
//! Response      = format header (16) echoed | echoed record | u32 num_results | Result x num_results
//! MultiResponse = format header (16) shared | u32 count | Response x count
//! ```
//!
//! Unlike a request batch, a response batch declares the format of its
//! result records once for the whole batch. The echoed query record of each
//! response still carries its own header.
//!
//! Reply headers are taken as sent. An object with no records answers with
//! a `0+0:TYPExN` shared format, so geometry is only checked when a record
//! is split with [`Record::view`].

use serde::Serialize;

use crate::error::{Result, VecfindError};
use crate::protocol::format::VectorFormat;
use crate::protocol::record::{Record, RecordView};
use crate::protocol::request::{MultiRequest, Request};
use crate::protocol::wire::{WireReader, WireWriter};

/// One matching record and its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub distance: f64,
    pub record: Record,
}

/// The results for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Format of the echoed query record.
    pub echoed_format: VectorFormat,
    /// The query record as the storage side received it.
    pub echoed_record: Record,
    /// Matches, in the order the storage side emitted them.
    pub results: Vec<Neighbor>,
}

/// The decoded reply of one storage object.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiResponse {
    /// Format of every result record in the batch.
    pub response_format: VectorFormat,
    /// One response per submitted request, in submission order.
    pub responses: Vec<Response>,
}

impl Response {
    /// Number of results.
    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    /// Decode one response at `offset`. Result records are read with
    /// `response_format`, the echoed record with its own header.
    pub fn decode(
        bytes: &[u8],
        offset: usize,
        response_format: &VectorFormat,
    ) -> Result<(Self, usize)> {
        let mut reader = WireReader::at(bytes, offset);
        let response = Self::read_from(&mut reader, response_format)?;
        Ok((response, reader.position()))
    }

    pub(crate) fn read_from(
        reader: &mut WireReader<'_>,
        response_format: &VectorFormat,
    ) -> Result<Self> {
        let echoed_format = VectorFormat::read_header(reader)?;
        let echoed_record = Record::read_from(reader, &echoed_format)?;

        let num_results = reader.read_u32()? as usize;
        let per_result = 8 + response_format.record_len();
        if num_results.saturating_mul(per_result) > reader.remaining() {
            return Err(VecfindError::truncated_response(format!(
                "{num_results} results of {per_result} bytes, {} bytes left",
                reader.remaining()
            )));
        }

        let mut results = Vec::with_capacity(num_results);
        for _ in 0..num_results {
            let distance = reader.read_f64()?;
            let record = Record::read_from(reader, response_format)?;
            results.push(Neighbor { distance, record });
        }

        Ok(Response {
            echoed_format,
            echoed_record,
            results,
        })
    }

    /// Append the encoded response to `writer`.
    pub fn encode_into(&self, writer: &mut WireWriter) -> Result<()> {
        let num_results = u32::try_from(self.results.len())
            .map_err(|_| VecfindError::invalid_argument("too many results"))?;

        self.echoed_format.write_header(writer)?;
        self.echoed_record.write_to(writer);
        writer.write_u32(num_results)?;
        for neighbor in &self.results {
            writer.write_f64(neighbor.distance)?;
            neighbor.record.write_to(writer);
        }
        Ok(())
    }

    /// A response echoing `request` with no results.
    pub fn empty_for(request: &Request) -> Self {
        Response {
            echoed_format: *request.format(),
            echoed_record: request.record().clone(),
            results: Vec::new(),
        }
    }
}

impl MultiResponse {
    /// Number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Check if the batch holds no responses.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Decode a whole reply buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes);
        let response_format = VectorFormat::read_header(&mut reader)?;

        let count = reader.read_u32()? as usize;
        // Every response takes at least 20 bytes.
        let mut responses = Vec::with_capacity(count.min(reader.remaining() / 20));
        for _ in 0..count {
            responses.push(Response::read_from(&mut reader, &response_format)?);
        }

        Ok(MultiResponse {
            response_format,
            responses,
        })
    }

    /// Encode the batch the way the storage method does.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.responses.len())
            .map_err(|_| VecfindError::invalid_argument("too many responses"))?;

        let mut writer = WireWriter::new();
        self.response_format.write_header(&mut writer)?;
        writer.write_u32(count)?;
        for response in &self.responses {
            response.encode_into(&mut writer)?;
        }
        Ok(writer.into_inner())
    }

    /// The reply an object without records produces for `request`.
    pub fn empty_for(request: &MultiRequest, response_format: VectorFormat) -> Self {
        MultiResponse {
            response_format,
            responses: request.requests().iter().map(Response::empty_for).collect(),
        }
    }

    /// Fail with [`VecfindError::ProtocolMismatch`] unless there is exactly
    /// one response per submitted request.
    pub fn check_count(&self, expected: usize) -> Result<()> {
        if self.responses.len() != expected {
            return Err(VecfindError::ProtocolMismatch {
                expected,
                actual: self.responses.len(),
            });
        }
        Ok(())
    }

    /// Split every record into prefix, vector and suffix.
    pub fn to_view(&self) -> Result<MultiResponseView> {
        let responses = self
            .responses
            .iter()
            .map(|response| {
                let results = response
                    .results
                    .iter()
                    .map(|neighbor| {
                        Ok(NeighborView {
                            distance: neighbor.distance,
                            record: neighbor.record.view(&self.response_format)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ResponseView {
                    echoed_format: response.echoed_format.to_string(),
                    echoed_record: response.echoed_record.view(&response.echoed_format)?,
                    num_results: results.len(),
                    results,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MultiResponseView {
            response_format: self.response_format.to_string(),
            count: responses.len(),
            responses,
        })
    }
}

/// Decoded, display-friendly form of a [`MultiResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct MultiResponseView {
    pub response_format: String,
    pub count: usize,
    pub responses: Vec<ResponseView>,
}

/// Decoded form of a [`Response`].
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub echoed_format: String,
    pub echoed_record: RecordView,
    pub num_results: usize,
    pub results: Vec<NeighborView>,
}

/// Decoded form of a [`Neighbor`].
#[derive(Debug, Clone, Serialize)]
pub struct NeighborView {
    pub distance: f64,
    pub record: RecordView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::element_type::{ElementType, VectorElements};

    fn query_format() -> VectorFormat {
        VectorFormat::new(20, 4, ElementType::F32, 4).unwrap()
    }

    fn result_format() -> VectorFormat {
        VectorFormat::new(10, 2, ElementType::U16, 4).unwrap()
    }

    fn query(values: Vec<f32>) -> Request {
        Request::from_payload(2, query_format(), &VectorElements::F32(values).to_le_bytes())
            .unwrap()
    }

    fn result_record(values: Vec<u16>) -> Record {
        Record::from_elements(&result_format(), &VectorElements::U16(values)).unwrap()
    }

    fn sample_reply() -> MultiResponse {
        let first = query(vec![1.0, 2.0, 3.0, 4.0]);
        let second = query(vec![5.0, 6.0, 7.0, 8.0]);
        MultiResponse {
            response_format: result_format(),
            responses: vec![
                Response {
                    echoed_format: query_format(),
                    echoed_record: first.record().clone(),
                    results: vec![
                        Neighbor {
                            distance: 0.5,
                            record: result_record(vec![1, 2, 3, 4]),
                        },
                        Neighbor {
                            distance: 1.25,
                            record: result_record(vec![5, 6, 7, 8]),
                        },
                    ],
                },
                Response::empty_for(&second),
            ],
        }
    }

    #[test]
    fn test_multi_response_layout() {
        let reply = sample_reply();
        let bytes = reply.encode().unwrap();

        // header + count + (header + record + count + 2 results) + (header + record + count)
        assert_eq!(bytes.len(), 16 + 4 + (16 + 20 + 4 + 2 * (8 + 10)) + (16 + 20 + 4));
        assert_eq!(&bytes[0..16], &result_format().to_header_bytes().unwrap());
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());

        let decoded = MultiResponse::decode(&bytes).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_result_records_use_shared_format() {
        let bytes = sample_reply().encode().unwrap();
        let decoded = MultiResponse::decode(&bytes).unwrap();

        let first = &decoded.responses[0];
        assert_eq!(first.echoed_format, query_format());
        assert_eq!(first.echoed_record.len(), 20);
        assert_eq!(first.results[0].record.len(), 10);

        let view = first.results[1].record.view(&decoded.response_format).unwrap();
        assert_eq!(view.vector, VectorElements::U16(vec![5, 6, 7, 8]));
        assert_eq!(view.prefix, vec![0, 0]);
    }

    #[test]
    fn test_zero_results() {
        let bytes = sample_reply().encode().unwrap();
        let decoded = MultiResponse::decode(&bytes).unwrap();
        assert_eq!(decoded.responses[1].num_results(), 0);
        assert!(decoded.responses[1].results.is_empty());
    }

    #[test]
    fn test_response_decode_at_offset() {
        let reply = sample_reply();
        let mut writer = WireWriter::new();
        writer.write_raw(&[0xab; 3]);
        reply.responses[0].encode_into(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let (response, next) = Response::decode(&bytes, 3, &result_format()).unwrap();
        assert_eq!(response, reply.responses[0]);
        assert_eq!(next, bytes.len());
    }

    #[test]
    fn test_truncated_everywhere() {
        let bytes = sample_reply().encode().unwrap();
        for len in 0..bytes.len() {
            let err = MultiResponse::decode(&bytes[..len]).unwrap_err();
            assert!(
                matches!(err, VecfindError::TruncatedResponse(_)),
                "length {len}: {err}"
            );
        }
    }

    #[test]
    fn test_record_less_shared_format() {
        let format = VectorFormat {
            record_size: 0,
            vector_offset: 0,
            element_type: ElementType::I32,
            vector_length: 128,
        };
        let query_format = VectorFormat::new(512, 0, ElementType::I32, 128).unwrap();
        let query = Request::from_payload(5, query_format, &[7u8; 512]).unwrap();

        let mut writer = WireWriter::new();
        format.write_header(&mut writer).unwrap();
        writer.write_u32(1).unwrap();
        Response::empty_for(&query).encode_into(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 16 + 4 + 16 + 512 + 4);

        let decoded = MultiResponse::decode(&bytes).unwrap();
        assert_eq!(decoded.response_format.to_string(), "0+0:i32x128");
        assert_eq!(decoded.len(), 1);
        assert_eq!(&decoded.responses[0].echoed_record, query.record());
        assert!(decoded.responses[0].results.is_empty());
        assert!(decoded.to_view().is_ok());
    }

    #[test]
    fn test_huge_result_count() {
        let mut writer = WireWriter::new();
        result_format().write_header(&mut writer).unwrap();
        writer.write_u32(1).unwrap();
        query_format().write_header(&mut writer).unwrap();
        writer.write_zeros(20);
        writer.write_u32(u32::MAX).unwrap();

        let err = MultiResponse::decode(&writer.into_inner()).unwrap_err();
        assert!(matches!(err, VecfindError::TruncatedResponse(_)));
    }

    #[test]
    fn test_check_count() {
        let reply = sample_reply();
        assert!(reply.check_count(2).is_ok());
        assert!(matches!(
            reply.check_count(3),
            Err(VecfindError::ProtocolMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_empty_for_echoes_requests() {
        let batch = MultiRequest::new(vec![query(vec![0.5; 4]), query(vec![0.25; 4])]);
        let reply = MultiResponse::empty_for(&batch, result_format());
        assert_eq!(reply.len(), 2);
        assert_eq!(&reply.responses[1].echoed_record, batch.requests()[1].record());

        let decoded = MultiResponse::decode(&reply.encode().unwrap()).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_view_serializes() {
        let view = sample_reply().to_view().unwrap();
        assert_eq!(view.count, 2);
        assert_eq!(view.response_format, "10+2:u16x4");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["responses"][0]["num_results"], 2);
        assert_eq!(json["responses"][0]["results"][0]["distance"], 0.5);
    }
}
