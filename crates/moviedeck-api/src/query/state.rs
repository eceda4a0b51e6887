//! Query status types.

use std::fmt;
use std::sync::Arc;

/// Opaque fetch failure, shared by every subscriber of the failed request.
#[derive(Clone)]
pub struct FetchError(Arc<anyhow::Error>);

impl FetchError {
    /// Wraps an error.
    #[must_use]
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err)
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FetchError({:#})", self.0)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

/// Status of a cache entry, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Fetch in flight.
    Pending,
    /// Fetch succeeded.
    Fulfilled,
    /// Fetch failed.
    Rejected,
}

/// What a screen sees for one query.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    /// The fetch has not settled yet.
    Loading,
    /// The fetch succeeded and the payload decoded.
    Success(T),
    /// Transport failure, non-2xx status, or an undecodable payload.
    Error(FetchError),
}

impl<T> QueryState<T> {
    /// Returns `true` while loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns the payload on success.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Loading | Self::Error(_) => None,
        }
    }

    /// Consumes the state, returning the payload on success.
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Loading | Self::Error(_) => None,
        }
    }

    /// Converts a settled state into a `Result`; `Loading` becomes an error.
    ///
    /// # Errors
    ///
    /// Returns the fetch error, or an error if the query has not settled.
    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Error(err) => Err(anyhow::anyhow!("{err}")),
            Self::Loading => Err(anyhow::anyhow!("query has not settled")),
        }
    }
}
