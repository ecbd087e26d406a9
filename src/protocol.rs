//! Binary protocol of the `find_closest` storage method.
//!
//! All integers are fixed-width little-endian, floats are IEEE-754.
//!
//! # Module Structure
//!
//! - `element_type`: type code registry and typed vector payloads
//! - `wire`: bounds-checked readers and writers
//! - `format`: the 16-byte vector format header
//! - `record`: fixed-size records with an embedded vector
//! - `request`: single and batched requests
//! - `response`: single and batched responses
//!
//! # Example
//!
//! ```
//! use vecfind::protocol::{ElementType, MultiRequest, Request, VectorElements, VectorFormat};
//!
//! let format: VectorFormat = "20+4:f32x4".parse().unwrap();
//! let payload = VectorElements::F32(vec![0.1, 0.2, 0.3, 0.4]).to_le_bytes();
//! let request = Request::from_payload(3, format, &payload).unwrap();
//! assert_eq!(request.encode().unwrap().len(), 40);
//!
//! let batch = MultiRequest::new(vec![request]);
//! assert_eq!(batch.encode().unwrap().len(), 44);
//! assert_eq!(format.element_type, ElementType::F32);
//! ```

pub mod element_type;
pub mod format;
pub mod record;
pub mod request;
pub mod response;
pub mod wire;

pub use self::element_type::{ElementType, VectorElements};
pub use self::format::{FORMAT_HEADER_LEN, VectorFormat};
pub use self::record::{Record, RecordView};
pub use self::request::{MultiRequest, Request};
pub use self::response::{MultiResponse, MultiResponseView, Neighbor, Response};
