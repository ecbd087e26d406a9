//! Element type registry.
//!
//! Maps the protocol's numeric type codes (1-10) to element names and byte
//! widths, and converts vector payloads between raw little-endian bytes and
//! typed values.

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VecfindError};

/// Numeric kind of a vector element.
///
/// The discriminants are the type codes carried in the format header and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ElementType {
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    F32 = 9,
    F64 = 10,
}

impl ElementType {
    /// Every element type, in code order.
    pub const ALL: [ElementType; 10] = [
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
        ElementType::F32,
        ElementType::F64,
    ];

    /// Look up an element type by protocol code.
    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.code() == code)
            .ok_or_else(|| VecfindError::unknown_type(format!("type code {code}")))
    }

    /// Look up an element type by name (`"i8"`, `"f32"`, ...).
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == name)
            .ok_or_else(|| VecfindError::unknown_type(format!("type name {name:?}")))
    }

    /// Protocol code of the type named `name`.
    pub fn code_of(name: &str) -> Result<u8> {
        Self::from_name(name).map(|ty| ty.code())
    }

    /// Byte width of the type with protocol code `code`.
    pub fn width_of(code: u8) -> Result<usize> {
        Self::from_code(code).map(|ty| ty.width())
    }

    /// Name of the type with protocol code `code`.
    pub fn name_of(code: u8) -> Result<&'static str> {
        Self::from_code(code).map(|ty| ty.name())
    }

    /// Protocol code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Short name as used in textual formats.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }

    /// Size of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 => 8,
        }
    }

    /// Whether the type is a signed integer.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ElementType::I8 | ElementType::I16 | ElementType::I32 | ElementType::I64
        )
    }

    /// Whether the type is a floating point type.
    pub fn is_float(self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    /// Bit width of one element.
    pub fn bits(self) -> u32 {
        (self.width() * 8) as u32
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = VecfindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// A vector of typed elements decoded from (or destined for) a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum VectorElements {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! read_into {
    ($variant:ident, $ty:ty, $read:ident, $bytes:expr, $len:expr) => {{
        let mut values = vec![<$ty>::default(); $len];
        LittleEndian::$read($bytes, &mut values);
        VectorElements::$variant(values)
    }};
}

macro_rules! write_from {
    ($write:ident, $values:expr, $width:expr) => {{
        let mut bytes = vec![0u8; $values.len() * $width];
        LittleEndian::$write($values, &mut bytes);
        bytes
    }};
}

impl VectorElements {
    /// Element type of the stored values.
    pub fn element_type(&self) -> ElementType {
        match self {
            VectorElements::I8(_) => ElementType::I8,
            VectorElements::I16(_) => ElementType::I16,
            VectorElements::I32(_) => ElementType::I32,
            VectorElements::I64(_) => ElementType::I64,
            VectorElements::U8(_) => ElementType::U8,
            VectorElements::U16(_) => ElementType::U16,
            VectorElements::U32(_) => ElementType::U32,
            VectorElements::U64(_) => ElementType::U64,
            VectorElements::F32(_) => ElementType::F32,
            VectorElements::F64(_) => ElementType::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            VectorElements::I8(v) => v.len(),
            VectorElements::I16(v) => v.len(),
            VectorElements::I32(v) => v.len(),
            VectorElements::I64(v) => v.len(),
            VectorElements::U8(v) => v.len(),
            VectorElements::U16(v) => v.len(),
            VectorElements::U32(v) => v.len(),
            VectorElements::U64(v) => v.len(),
            VectorElements::F32(v) => v.len(),
            VectorElements::F64(v) => v.len(),
        }
    }

    /// Check if the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reinterpret `bytes` as `len` little-endian elements of `element_type`.
    ///
    /// `bytes` must hold exactly `len * element_type.width()` bytes.
    pub fn from_le_bytes(element_type: ElementType, bytes: &[u8], len: usize) -> Result<Self> {
        let expected = len * element_type.width();
        if bytes.len() != expected {
            return Err(VecfindError::truncated_record(format!(
                "{len} x {element_type} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }

        let elements = match element_type {
            ElementType::I8 => VectorElements::I8(bytes.iter().map(|&b| b as i8).collect()),
            ElementType::U8 => VectorElements::U8(bytes.to_vec()),
            ElementType::I16 => read_into!(I16, i16, read_i16_into, bytes, len),
            ElementType::I32 => read_into!(I32, i32, read_i32_into, bytes, len),
            ElementType::I64 => read_into!(I64, i64, read_i64_into, bytes, len),
            ElementType::U16 => read_into!(U16, u16, read_u16_into, bytes, len),
            ElementType::U32 => read_into!(U32, u32, read_u32_into, bytes, len),
            ElementType::U64 => read_into!(U64, u64, read_u64_into, bytes, len),
            ElementType::F32 => read_into!(F32, f32, read_f32_into, bytes, len),
            ElementType::F64 => read_into!(F64, f64, read_f64_into, bytes, len),
        };
        Ok(elements)
    }

    /// Encode the elements as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            VectorElements::I8(v) => v.iter().map(|&x| x as u8).collect(),
            VectorElements::U8(v) => v.clone(),
            VectorElements::I16(v) => write_from!(write_i16_into, v, 2),
            VectorElements::I32(v) => write_from!(write_i32_into, v, 4),
            VectorElements::I64(v) => write_from!(write_i64_into, v, 8),
            VectorElements::U16(v) => write_from!(write_u16_into, v, 2),
            VectorElements::U32(v) => write_from!(write_u32_into, v, 4),
            VectorElements::U64(v) => write_from!(write_u64_into, v, 8),
            VectorElements::F32(v) => write_from!(write_f32_into, v, 4),
            VectorElements::F64(v) => write_from!(write_f64_into, v, 8),
        }
    }
}
