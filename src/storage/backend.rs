//! Abstract object store trait.
//!
//! Every store must implement [`ObjectStore`]. Reads are expressed as a
//! lazy stream of byte chunks so callers can forward an object to the
//! client without holding it in memory.

use bytes::Bytes;
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;

/// Lazy, non-restartable sequence of body chunks for one object.
pub type ObjectStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An object whose body has not been read yet.
pub struct StoreObject {
    /// Size in bytes, when the store reports it up front.
    pub content_length: Option<u64>,
    /// Body chunks in order.
    pub body: ObjectStream,
}

impl std::fmt::Debug for StoreObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreObject")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Async object store contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// List every key beginning with `prefix`, in the order the store
    /// returns them.
    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>>;

    /// Open the object at `key`.
    ///
    /// Resolves once the store has accepted the request, before the body
    /// is read. A missing key is an error.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StoreObject>> + Send + '_>>;
}
