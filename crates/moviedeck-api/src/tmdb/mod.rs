//! TMDB API client module.
//!
//! Handles HTTP requests to the TMDB API v3 endpoints: movie lists, movie
//! and person details, and the signed-in user's favorites and watchlist.

mod api;
mod client;
mod descriptor;
mod membership;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalTmdbApi, TmdbApi};
#[allow(clippy::module_name_repetitions)]
pub use client::{DEFAULT_BASE_URL, TmdbClient, TmdbClientBuilder};
pub use descriptor::{CacheKey, RequestDescriptor};
pub use membership::{AccountList, MembershipToggle, ToggleOutcome};
pub use types::{
    CastMember, Credits, Genre, GenreList, MembershipBody, MovieDetails, MoviePage, MovieSummary,
    Person, SpokenLanguage, StatusResponse, Video, VideoList,
};
