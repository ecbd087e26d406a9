//! Storage collaborator capability.

use std::fmt::Debug;
use std::sync::Arc;

use crate::dispatch::completion::Completion;
use crate::error::Result;

/// No such object.
pub const ENOENT: i32 = 2;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Reply does not fit the receive buffer.
pub const ERANGE: i32 = 34;
/// Class or method not supported.
pub const EOPNOTSUPP: i32 = 95;
/// Call abandoned before it resolved.
pub const ECANCELED: i32 = 125;

/// An object store that can run a storage-side method against one object.
///
/// Implementations resolve the returned [`Completion`] from their own
/// execution context. A positive return code is the reply length, a
/// non-positive one is a negated errno.
pub trait ObjectStore: Send + Sync + Debug {
    /// Start `class.method` on `object_id` with `payload` as input.
    ///
    /// The reply is capped at `receive_capacity` bytes. Returns immediately;
    /// an `Err` means the call was never submitted.
    fn execute_async(
        &self,
        object_id: &str,
        class: &str,
        method: &str,
        payload: Arc<[u8]>,
        receive_capacity: u32,
    ) -> Result<Completion>;
}
