//! Dispatcher configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecfindError};

/// Storage class that provides `find_closest`.
pub const DEFAULT_CLASS: &str = "vector";

/// Storage method name.
pub const DEFAULT_METHOD: &str = "find_closest";

/// Default reply buffer cap per object (1 MiB).
pub const DEFAULT_RECEIVE_CAPACITY: u32 = 1024 * 1024;

/// Configuration for [`Dispatcher`](crate::dispatch::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Storage class name.
    pub class: String,

    /// Storage method name.
    pub method: String,

    /// Maximum reply size accepted per object, in bytes.
    pub receive_capacity: u32,

    /// Worker threads for the in-memory store.
    /// If None, uses the number of CPU cores.
    pub worker_threads: Option<usize>,

    /// Reject replies whose response count differs from the request count.
    pub verify_response_count: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            class: DEFAULT_CLASS.to_string(),
            method: DEFAULT_METHOD.to_string(),
            receive_capacity: DEFAULT_RECEIVE_CAPACITY,
            worker_threads: None,
            verify_response_count: true,
        }
    }
}

impl DispatchConfig {
    /// Set the storage class name.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Set the storage method name.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the reply buffer cap.
    pub fn with_receive_capacity(mut self, receive_capacity: u32) -> Self {
        self.receive_capacity = receive_capacity;
        self
    }

    /// Set the worker thread count.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = Some(worker_threads);
        self
    }

    /// Enable or disable the response count check.
    pub fn with_verify_response_count(mut self, verify: bool) -> Self {
        self.verify_response_count = verify;
        self
    }

    /// Effective worker thread count.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Check the configuration for unusable values.
    pub fn validate(&self) -> Result<()> {
        if self.class.is_empty() || self.method.is_empty() {
            return Err(VecfindError::invalid_argument(
                "class and method names must not be empty",
            ));
        }
        if self.receive_capacity == 0 {
            return Err(VecfindError::invalid_argument(
                "receive capacity must be positive",
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(VecfindError::invalid_argument(
                "worker thread count must be positive",
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DispatchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
