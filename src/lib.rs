//! # vecfind
//!
//! Client side of the `find_closest` storage method: a nearest-neighbour
//! search that runs inside storage objects holding fixed-size records.
//!
//! ## Features
//!
//! - Byte-exact little-endian codec for vector formats, records, request
//!   batches and reply batches
//! - One batch submitted to many objects at once, with independent
//!   per-object outcomes
//! - Blocking, callback and `async` ways of waiting for replies
//! - In-process object store for tests and offline runs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod protocol;

pub mod prelude {
    pub use crate::config::DispatchConfig;
    pub use crate::dispatch::{
        BatchOutcome, Completion, Dispatcher, MemoryObjectStore, ObjectOutcome, ObjectStore,
    };
    pub use crate::error::{Result, VecfindError};
    pub use crate::generator::RecordGenerator;
    pub use crate::protocol::{
        ElementType, MultiRequest, MultiResponse, Record, Request, Response, VectorElements,
        VectorFormat,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
