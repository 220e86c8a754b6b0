//! Index-client capability consumed by the strategy engine.
//!
//! [`IndexClient`] abstracts the underlying search-engine transport so the
//! engine can dispatch updates without knowing about HTTP. [`HttpClient`] is
//! the Elasticsearch-compatible implementation; [`RecordingClient`] is a
//! semantics-free implementation for tests and dry runs.

mod http;
mod recording;

use indexsync_shared::{ObjectRef, Result, TypeName};

pub use http::{HttpClient, HttpClientConfig};
pub use recording::{Dispatch, FailingClient, RecordingClient};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstracts the search-index backend the engine dispatches updates to.
///
/// Implementations are injected into the strategy stack, which never retries:
/// a transport or index failure surfaces unchanged to whoever triggered the
/// dispatch (`notify` for immediate policies, `pop` for accumulating ones).
/// Implementations own their concurrency story; the engine only requires
/// `Send + Sync` so one client can serve every execution context.
pub trait IndexClient: Send + Sync {
    /// Issue one update request for a single object.
    fn single_update(&self, type_name: &TypeName, object: &ObjectRef) -> Result<()>;

    /// Issue one batched update request for a set of objects of one type.
    fn bulk_update(&self, type_name: &TypeName, objects: &[ObjectRef]) -> Result<()>;
}
