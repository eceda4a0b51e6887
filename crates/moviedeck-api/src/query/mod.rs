//! Coalescing query cache over the TMDB client.
//!
//! Screens subscribe to a [`RequestDescriptor`](crate::tmdb::RequestDescriptor)
//! and read a [`QueryState`]; the cache guarantees at most one in-flight
//! request per cache key.

mod cache;
mod state;

#[allow(clippy::module_name_repetitions)]
pub use cache::{DEFAULT_KEEP_UNUSED_FOR, QueryCache, Subscription};
pub use state::{EntryStatus, FetchError, QueryState};
