//! API client library for moviedeck.
//!
//! Provides the TMDB client, a coalescing query cache on top of it, and the
//! application state store shared by the front end screens.

/// Coalescing request cache.
pub mod query;

/// Application state store (selection and session slices).
pub mod store;

/// TMDB API client.
pub mod tmdb;
