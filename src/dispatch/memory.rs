//! In-process object store for tests and offline runs.
//!
//! Every object answers with a scripted reply: either a fixed
//! `(return_code, buffer)` pair or a handler computed from the request
//! payload. Calls run on a dedicated thread pool, so completions resolve on
//! a different thread than the one that submitted them, as they do against
//! a real cluster.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::RwLock;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::DispatchConfig;
use crate::dispatch::completion::Completion;
use crate::dispatch::store::{EINVAL, ENOENT, EOPNOTSUPP, ERANGE, ObjectStore};
use crate::error::{Result, VecfindError};
use crate::protocol::{MultiRequest, MultiResponse, VectorFormat};

/// Computes `(return_code, reply)` from a request payload.
pub type MethodHandler = Arc<dyn Fn(&[u8]) -> (i32, Vec<u8>) + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Fixed { return_code: i32, buffer: Vec<u8> },
    Handler(MethodHandler),
}

/// Thread-pool backed [`ObjectStore`] with scripted replies.
pub struct MemoryObjectStore {
    class: String,
    method: String,
    objects: RwLock<HashMap<String, Reply>>,
    thread_pool: Arc<ThreadPool>,
    calls: AtomicU64,
}

impl MemoryObjectStore {
    /// Create a store answering `config.class`/`config.method`.
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads())
            .thread_name(|i| format!("memory-store-{i}"))
            .build()
            .map_err(|e| VecfindError::storage(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            class: config.class.clone(),
            method: config.method.clone(),
            objects: RwLock::new(HashMap::new()),
            thread_pool: Arc::new(thread_pool),
            calls: AtomicU64::new(0),
        })
    }

    /// Make `object_id` answer every call with a fixed reply.
    pub fn insert_reply(&self, object_id: impl Into<String>, return_code: i32, buffer: Vec<u8>) {
        self.objects.write().insert(
            object_id.into(),
            Reply::Fixed {
                return_code,
                buffer,
            },
        );
    }

    /// Make `object_id` answer with `handler(payload)`.
    pub fn insert_handler(&self, object_id: impl Into<String>, handler: MethodHandler) {
        self.objects
            .write()
            .insert(object_id.into(), Reply::Handler(handler));
    }

    /// Remove an object. Returns whether it existed.
    pub fn remove(&self, object_id: &str) -> bool {
        self.objects.write().remove(object_id).is_some()
    }

    /// Number of objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Number of calls submitted so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Handler answering like an object that holds no records of `format`:
    /// every request is echoed with zero results. Undecodable input gets
    /// `-EINVAL` and the error text.
    pub fn empty_objects_handler(format: VectorFormat) -> MethodHandler {
        Arc::new(move |payload: &[u8]| {
            let reply = MultiRequest::decode(payload)
                .and_then(|request| MultiResponse::empty_for(&request, format).encode());
            match reply {
                Ok(buffer) => (buffer.len() as i32, buffer),
                Err(e) => (-EINVAL, e.to_string().into_bytes()),
            }
        })
    }
}

impl ObjectStore for MemoryObjectStore {
    fn execute_async(
        &self,
        object_id: &str,
        class: &str,
        method: &str,
        payload: Arc<[u8]>,
        receive_capacity: u32,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let (completion, completer) = Completion::pending(object_id);

        let supported = class == self.class && method == self.method;
        let reply = self.objects.read().get(object_id).cloned();
        debug!(
            "memory store: {class}.{method} on {object_id} ({} bytes in)",
            payload.len()
        );

        self.thread_pool.spawn(move || {
            let (return_code, buffer) = match reply {
                _ if !supported => (-EOPNOTSUPP, Vec::new()),
                None => (-ENOENT, Vec::new()),
                Some(Reply::Fixed {
                    return_code,
                    buffer,
                }) => (return_code, buffer),
                Some(Reply::Handler(handler)) => handler(&payload),
            };

            if buffer.len() > receive_capacity as usize {
                completer.complete(-ERANGE, Vec::new());
            } else {
                completer.complete(return_code, buffer);
            }
        });

        Ok(completion)
    }
}

impl fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("class", &self.class)
            .field("method", &self.method)
            .field("objects", &self.object_count())
            .field("calls", &self.calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ElementType, Request, VectorElements};

    fn store() -> MemoryObjectStore {
        MemoryObjectStore::new(&DispatchConfig::default().with_worker_threads(2)).unwrap()
    }

    fn call(store: &MemoryObjectStore, object_id: &str, payload: &[u8], cap: u32) -> (i32, Vec<u8>) {
        let outcome = store
            .execute_async(object_id, "vector", "find_closest", Arc::from(payload), cap)
            .unwrap()
            .wait_blocking();
        (outcome.return_code, outcome.buffer)
    }

    #[test]
    fn test_fixed_reply() {
        let store = store();
        store.insert_reply("a", 3, vec![1, 2, 3]);
        assert_eq!(call(&store, "a", b"x", 16), (3, vec![1, 2, 3]));
        assert_eq!(store.calls(), 1);
        assert_eq!(store.object_count(), 1);
    }

    #[test]
    fn test_unknown_object() {
        let store = store();
        assert_eq!(call(&store, "missing", b"x", 16), (-ENOENT, Vec::new()));
    }

    #[test]
    fn test_unknown_method() {
        let store = store();
        store.insert_reply("a", 1, vec![1]);
        let outcome = store
            .execute_async("a", "vector", "find_farthest", Arc::from(&b""[..]), 16)
            .unwrap()
            .wait_blocking();
        assert_eq!(outcome.return_code, -EOPNOTSUPP);
    }

    #[test]
    fn test_reply_over_capacity() {
        let store = store();
        store.insert_reply("a", 8, vec![0; 8]);
        assert_eq!(call(&store, "a", b"x", 4), (-ERANGE, Vec::new()));
    }

    #[test]
    fn test_empty_objects_handler() {
        let format = VectorFormat::new(8, 0, ElementType::U8, 8).unwrap();
        let store = store();
        store.insert_handler("a", MemoryObjectStore::empty_objects_handler(format));

        let request = Request::from_payload(2, format, &[7u8; 8]).unwrap();
        let batch = MultiRequest::new(vec![request.clone(), request]);
        let (code, buffer) = call(&store, "a", &batch.encode().unwrap(), 1024);

        assert_eq!(code as usize, buffer.len());
        let reply = MultiResponse::decode(&buffer).unwrap();
        assert_eq!(reply.len(), 2);
        assert_eq!(reply.response_format, format);
        let echoed = reply.responses[0].echoed_record.view(&format).unwrap();
        assert_eq!(echoed.vector, VectorElements::U8(vec![7; 8]));
    }

    #[test]
    fn test_empty_objects_handler_rejects_garbage() {
        let format = VectorFormat::new(8, 0, ElementType::U8, 8).unwrap();
        let store = store();
        store.insert_handler("a", MemoryObjectStore::empty_objects_handler(format));
        let (code, _) = call(&store, "a", &[1, 0, 0, 0, 9], 1024);
        assert_eq!(code, -EINVAL);
    }

    #[test]
    fn test_remove() {
        let store = store();
        store.insert_reply("a", 1, Vec::new());
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
    }
}
