//! Fixed-size records with an embedded vector.
//!
//! A record is `record_size` bytes split into `[prefix][vector][suffix]` by a
//! [`VectorFormat`]. Prefix and suffix bytes are carried through untouched.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecfindError};
use crate::protocol::element_type::VectorElements;
use crate::protocol::format::VectorFormat;
use crate::protocol::wire::{WireReader, WireWriter};

/// Raw bytes of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    bytes: Vec<u8>,
}

/// A record split into its three regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub prefix: Vec<u8>,
    pub vector: VectorElements,
    pub suffix: Vec<u8>,
}

impl Record {
    /// Build a record holding `payload` at the format's vector offset.
    ///
    /// `payload` must be exactly `vector_length` elements of the format's
    /// element type. Prefix and suffix are zero-filled.
    pub fn encode(format: &VectorFormat, payload: &[u8]) -> Result<Self> {
        let offset = format.vector_offset as usize;
        let end = offset + payload.len();
        if payload.len() != format.vector_bytes() || end > format.record_len() {
            return Err(VecfindError::record_overflow(format!(
                "{format}: payload of {} bytes at offset {offset} (vector needs {}, record holds {})",
                payload.len(),
                format.vector_bytes(),
                format.record_size
            )));
        }

        let mut bytes = vec![0u8; format.record_len()];
        bytes[offset..end].copy_from_slice(payload);
        Ok(Record { bytes })
    }

    /// Build a record from typed elements.
    pub fn from_elements(format: &VectorFormat, elements: &VectorElements) -> Result<Self> {
        if elements.element_type() != format.element_type {
            return Err(VecfindError::invalid_argument(format!(
                "{} elements do not match format {format}",
                elements.element_type()
            )));
        }
        Self::encode(format, &elements.to_le_bytes())
    }

    /// Copy the first `record_size` bytes of `bytes` as a record.
    pub fn from_bytes(format: &VectorFormat, bytes: &[u8]) -> Result<Self> {
        let size = format.record_len();
        if bytes.len() < size {
            return Err(VecfindError::truncated_record(format!(
                "{format}: got {} of {size} bytes",
                bytes.len()
            )));
        }
        Ok(Record {
            bytes: bytes[..size].to_vec(),
        })
    }

    /// A record of zero bytes.
    pub fn zeroed(format: &VectorFormat) -> Self {
        Record {
            bytes: vec![0u8; format.record_len()],
        }
    }

    /// Split `bytes` into prefix, typed vector and suffix.
    pub fn decode(format: &VectorFormat, bytes: &[u8]) -> Result<RecordView> {
        format.validate()?;
        let size = format.record_len();
        if bytes.len() < size {
            return Err(VecfindError::truncated_record(format!(
                "{format}: got {} of {size} bytes",
                bytes.len()
            )));
        }

        let start = format.vector_offset as usize;
        let end = start + format.vector_bytes();
        let vector = VectorElements::from_le_bytes(
            format.element_type,
            &bytes[start..end],
            format.vector_length as usize,
        )?;

        Ok(RecordView {
            prefix: bytes[..start].to_vec(),
            vector,
            suffix: bytes[end..size].to_vec(),
        })
    }

    /// Split this record according to `format`.
    pub fn view(&self, format: &VectorFormat) -> Result<RecordView> {
        Self::decode(format, &self.bytes)
    }

    /// Read one record of `format.record_size` bytes from `reader`.
    pub(crate) fn read_from(reader: &mut WireReader<'_>, format: &VectorFormat) -> Result<Self> {
        let bytes = reader.read_raw(format.record_len())?;
        Ok(Record {
            bytes: bytes.to_vec(),
        })
    }

    /// Append the record bytes to `writer`.
    pub(crate) fn write_to(&self, writer: &mut WireWriter) {
        writer.write_raw(&self.bytes);
    }

    /// Record bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Record length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the record is zero-length.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the record and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl RecordView {
    /// Reassemble the record bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.prefix.clone();
        bytes.extend_from_slice(&self.vector.to_le_bytes());
        bytes.extend_from_slice(&self.suffix);
        bytes
    }
}
