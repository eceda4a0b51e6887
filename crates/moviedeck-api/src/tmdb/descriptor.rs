//! Request descriptors and cache key derivation.

use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

use super::membership::AccountList;
use crate::store::{Category, Selection};

/// Identifies one logical GET against the TMDB API.
///
/// Two descriptors are the same query when their paths and parameter sets
/// are equal, regardless of the order the parameters were added in.
/// Credentials are never part of a descriptor; the client appends them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    /// Endpoint path relative to the API base, IDs substituted.
    path: String,
    /// Query parameters, sorted by key.
    params: BTreeMap<String, String>,
}

/// Stable serialization of a [`RequestDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl RequestDescriptor {
    /// Creates a descriptor for `path` with no parameters.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds or replaces a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Endpoint path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in key order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Looks up a single parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns `true` for endpoints that need a user session.
    #[must_use]
    pub fn requires_session(&self) -> bool {
        self.path.starts_with("account/")
    }

    /// Derives the cache key: the path, then `?` and the url-encoded
    /// parameters in key order when there are any.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        if self.params.is_empty() {
            return CacheKey(self.path.clone());
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params())
            .finish();
        CacheKey(format!("{}?{query}", self.path))
    }

    // --- Endpoint constructors ---

    /// `genre/movie/list`.
    #[must_use]
    pub fn genres() -> Self {
        Self::new("genre/movie/list")
    }

    /// Movie list for the current selection.
    ///
    /// The selection's variant decides the endpoint: search, named category,
    /// genre discovery, or popular movies when nothing is selected.
    #[must_use]
    pub fn movies(selection: &Selection, page: u32) -> Self {
        let descriptor = match selection {
            Selection::Search(query) => Self::new("search/movie").param("query", query),
            Selection::Category(category) => Self::new(format!("movie/{category}")),
            Selection::Genre(id) => Self::new("discover/movie").param("with_genres", id),
            Selection::NoSelection => Self::new(format!("movie/{}", Category::Popular)),
        };
        descriptor.param("page", page)
    }

    /// `movie/{id}` with videos and credits appended.
    #[must_use]
    pub fn movie_details(movie_id: u64) -> Self {
        Self::new(format!("movie/{movie_id}")).param("append_to_response", "videos,credits")
    }

    /// `movie/{id}/credits`.
    #[must_use]
    pub fn movie_credits(movie_id: u64) -> Self {
        Self::new(format!("movie/{movie_id}/credits"))
    }

    /// `movie/{id}/recommendations`.
    #[must_use]
    pub fn recommendations(movie_id: u64, page: u32) -> Self {
        Self::new(format!("movie/{movie_id}/recommendations")).param("page", page)
    }

    /// `person/{id}`.
    #[must_use]
    pub fn person(person_id: u64) -> Self {
        Self::new(format!("person/{person_id}"))
    }

    /// Movies featuring a person (`discover/movie?with_cast=`).
    #[must_use]
    pub fn person_movies(person_id: u64, page: u32) -> Self {
        Self::new("discover/movie")
            .param("with_cast", person_id)
            .param("page", page)
    }

    /// `account/{account_id}/{favorite|watchlist}/movies`.
    #[must_use]
    pub fn account_list(account_id: u64, list: AccountList, page: u32) -> Self {
        Self::new(format!("account/{account_id}/{}/movies", list.as_str())).param("page", page)
    }
}
