//! Vector format descriptor.
//!
//! A [`VectorFormat`] describes where a vector lives inside a fixed-size
//! record. On the wire it is a 16-byte header:
//!
//! ```text
//! u32 record_size | u32 vector_offset | u8 type_code | 3 reserved | u32 vector_length
//! ```
//!
//! Storage objects carry the same descriptor in textual form,
//! `<size>+<offset>:<type>x<length>` (for example `20+4:f32x4`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecfindError};
use crate::protocol::element_type::ElementType;
use crate::protocol::wire::{WireReader, WireWriter};

/// Encoded size of a format header.
pub const FORMAT_HEADER_LEN: usize = 16;

const RESERVED_LEN: usize = 3;

/// Geometry of a vector embedded in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorFormat {
    /// Total record size in bytes.
    pub record_size: u32,
    /// Byte offset of the first vector element.
    pub vector_offset: u32,
    /// Element type of the vector.
    pub element_type: ElementType,
    /// Number of elements in the vector.
    pub vector_length: u32,
}

impl VectorFormat {
    /// Create a format, checking that the vector fits inside the record.
    pub fn new(
        record_size: u32,
        vector_offset: u32,
        element_type: ElementType,
        vector_length: u32,
    ) -> Result<Self> {
        let format = VectorFormat {
            record_size,
            vector_offset,
            element_type,
            vector_length,
        };
        format.validate()?;
        Ok(format)
    }

    /// Check `vector_offset + vector_length * width <= record_size`.
    pub fn validate(&self) -> Result<()> {
        let end = self.vector_offset as u64 + self.vector_bytes() as u64;
        if end > self.record_size as u64 {
            return Err(VecfindError::record_overflow(format!(
                "{self}: vector ends at byte {end}, record holds {}",
                self.record_size
            )));
        }
        Ok(())
    }

    /// Size of the vector region in bytes.
    pub fn vector_bytes(&self) -> usize {
        self.vector_length as usize * self.element_type.width()
    }

    /// Size of the record in bytes.
    pub fn record_len(&self) -> usize {
        self.record_size as usize
    }

    /// Number of opaque bytes after the vector.
    pub fn suffix_len(&self) -> usize {
        self.record_len()
            .saturating_sub(self.vector_offset as usize + self.vector_bytes())
    }

    /// Append the 16-byte header to `writer`. Reserved bytes are zero.
    pub fn write_header(&self, writer: &mut WireWriter) -> Result<()> {
        writer.write_u32(self.record_size)?;
        writer.write_u32(self.vector_offset)?;
        writer.write_u8(self.element_type.code())?;
        writer.write_zeros(RESERVED_LEN);
        writer.write_u32(self.vector_length)?;
        Ok(())
    }

    /// Read a 16-byte header. Reserved bytes are ignored.
    ///
    /// The geometry is not validated: a reply describes records the storage
    /// side already holds, so the decoder trusts it and only bounds-checks
    /// the reads that follow.
    pub fn read_header(reader: &mut WireReader<'_>) -> Result<Self> {
        let record_size = reader.read_u32()?;
        let vector_offset = reader.read_u32()?;
        let code = reader.read_u8()?;
        reader.skip(RESERVED_LEN)?;
        let vector_length = reader.read_u32()?;

        Ok(VectorFormat {
            record_size,
            vector_offset,
            element_type: ElementType::from_code(code)?,
            vector_length,
        })
    }

    /// Encode the header as a fixed array.
    pub fn to_header_bytes(&self) -> Result<[u8; FORMAT_HEADER_LEN]> {
        let mut writer = WireWriter::with_capacity(FORMAT_HEADER_LEN);
        self.write_header(&mut writer)?;
        let mut header = [0u8; FORMAT_HEADER_LEN];
        header.copy_from_slice(writer.as_slice());
        Ok(header)
    }

    /// Decode a header found at `offset` in `bytes`.
    pub fn from_header_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        Self::read_header(&mut WireReader::at(bytes, offset))
    }
}

impl fmt::Display for VectorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}:{}x{}",
            self.record_size, self.vector_offset, self.element_type, self.vector_length
        )
    }
}

impl FromStr for VectorFormat {
    type Err = VecfindError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            VecfindError::invalid_format(format!("{s:?}, expected SIZE+OFFSET:TYPExLENGTH"))
        };

        let (size, rest) = s.trim().split_once('+').ok_or_else(invalid)?;
        let (offset, vector) = rest.split_once(':').ok_or_else(invalid)?;
        let (type_name, length) = vector.rsplit_once('x').ok_or_else(invalid)?;

        let parse = |field: &str| field.parse::<u32>().map_err(|_| invalid());
        let element_type = ElementType::from_name(type_name)?;

        VectorFormat::new(parse(size)?, parse(offset)?, element_type, parse(length)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VectorFormat {
        VectorFormat::new(20, 4, ElementType::F32, 4).unwrap()
    }

    #[test]
    fn test_geometry() {
        let format = sample();
        assert_eq!(format.vector_bytes(), 16);
        assert_eq!(format.suffix_len(), 0);

        let format = VectorFormat::new(32, 2, ElementType::U16, 3).unwrap();
        assert_eq!(format.suffix_len(), 24);
    }

    #[test]
    fn test_geometry_overflow() {
        let err = VectorFormat::new(16, 4, ElementType::F32, 4).unwrap_err();
        assert!(matches!(err, VecfindError::RecordOverflow(_)));

        // Offsets near u32::MAX must not wrap.
        let err = VectorFormat::new(16, u32::MAX, ElementType::U8, 2).unwrap_err();
        assert!(matches!(err, VecfindError::RecordOverflow(_)));
    }

    #[test]
    fn test_header_layout() {
        let header = sample().to_header_bytes().unwrap();
        assert_eq!(header, [20, 0, 0, 0, 4, 0, 0, 0, 9, 0, 0, 0, 4, 0, 0, 0]);
    }

    #[test]
    fn test_header_ignores_reserved_bytes() {
        let header = [20, 0, 0, 0, 4, 0, 0, 0, 9, 0xaa, 0xbb, 0xcc, 4, 0, 0, 0];
        assert_eq!(VectorFormat::from_header_bytes(&header, 0).unwrap(), sample());
    }

    #[test]
    fn test_header_unknown_code() {
        let header = [20, 0, 0, 0, 4, 0, 0, 0, 42, 0, 0, 0, 4, 0, 0, 0];
        let err = VectorFormat::from_header_bytes(&header, 0).unwrap_err();
        assert!(matches!(err, VecfindError::UnknownType(_)));
    }

    #[test]
    fn test_header_truncated() {
        let header = sample().to_header_bytes().unwrap();
        let err = VectorFormat::from_header_bytes(&header[..15], 0).unwrap_err();
        assert!(matches!(err, VecfindError::TruncatedResponse(_)));
    }

    #[test]
    fn test_text_form() {
        let format: VectorFormat = "20+4:f32x4".parse().unwrap();
        assert_eq!(format, sample());
        assert_eq!(format.to_string(), "20+4:f32x4");

        let format: VectorFormat = "1024+0:u64x128".parse().unwrap();
        assert_eq!(format.element_type, ElementType::U64);
        assert_eq!(format.vector_length, 128);
    }

    #[test]
    fn test_text_form_errors() {
        assert!(matches!(
            "20:f32x4".parse::<VectorFormat>(),
            Err(VecfindError::InvalidFormat(_))
        ));
        assert!(matches!(
            "20+4:f32".parse::<VectorFormat>(),
            Err(VecfindError::InvalidFormat(_))
        ));
        assert!(matches!(
            "20+4:q32x4".parse::<VectorFormat>(),
            Err(VecfindError::UnknownType(_))
        ));
        assert!(matches!(
            "8+4:f32x4".parse::<VectorFormat>(),
            Err(VecfindError::RecordOverflow(_))
        ));
    }
}
