//! Asynchronous fan-out of find_closest batches to storage objects.
//!
//! # Module Structure
//!
//! - `completion`: one-shot completion handles for in-flight calls
//! - `store`: the object store capability and its return codes
//! - `memory`: thread-pool backed in-process store
//! - `orchestrator`: submit, await and classify per-object outcomes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vecfind::config::DispatchConfig;
//! use vecfind::dispatch::{Dispatcher, MemoryObjectStore, ObjectOutcome};
//! use vecfind::protocol::{MultiRequest, Request, VectorFormat};
//!
//! let format: VectorFormat = "8+0:u8x8".parse().unwrap();
//! let config = DispatchConfig::default().with_worker_threads(2);
//!
//! let store = Arc::new(MemoryObjectStore::new(&config).unwrap());
//! store.insert_handler("obj", MemoryObjectStore::empty_objects_handler(format));
//! store.insert_reply("gone", -5, Vec::new());
//!
//! let request = Request::from_payload(1, format, &[3u8; 8]).unwrap();
//! let batch = MultiRequest::new(vec![request]);
//!
//! let dispatcher = Dispatcher::new(store, config).unwrap();
//! let outcome = dispatcher.find_closest(&["obj", "gone"], &batch).unwrap();
//!
//! assert!(matches!(outcome.get("obj"), Some(ObjectOutcome::Succeeded(_))));
//! assert!(matches!(outcome.get("gone"), Some(ObjectOutcome::Failed(-5))));
//! ```

pub mod completion;
pub mod memory;
pub mod orchestrator;
pub mod store;

pub use self::completion::{Completer, Completion, CompletionOutcome};
pub use self::memory::{MemoryObjectStore, MethodHandler};
pub use self::orchestrator::{
    Batch, BatchOutcome, BatchSummary, Dispatcher, ObjectOutcome, classify,
};
pub use self::store::ObjectStore;
