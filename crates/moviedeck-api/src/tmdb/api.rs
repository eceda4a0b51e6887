//! `TmdbApi` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;
use serde_json::Value;

use super::descriptor::RequestDescriptor;
use super::membership::AccountList;
use super::types::{Credits, GenreList, MovieDetails, MoviePage, Person, StatusResponse};
use crate::store::{Selection, UserSession};

/// TMDB API trait.
///
/// Abstracts API operations for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(TmdbApi: Send)]
pub trait LocalTmdbApi {
    /// Executes a descriptor and returns the raw JSON body.
    ///
    /// `session` is forwarded as `session_id` when present.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or invalid JSON.
    async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        session: Option<&UserSession>,
    ) -> Result<Value>;

    /// Fetches the movie genre list.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn genres(&self) -> Result<GenreList>;

    /// Fetches one page of the movie list for a selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn movies(&self, selection: &Selection, page: u32) -> Result<MoviePage>;

    /// Fetches movie details with videos and credits appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails>;

    /// Fetches the cast of a movie.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn movie_credits(&self, movie_id: u64) -> Result<Credits>;

    /// Fetches recommendations for a movie.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn recommendations(&self, movie_id: u64, page: u32) -> Result<MoviePage>;

    /// Fetches person details.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn person(&self, person_id: u64) -> Result<Person>;

    /// Fetches movies a person appears in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn person_movies(&self, person_id: u64, page: u32) -> Result<MoviePage>;

    /// Fetches one page of the user's favorite or watchlist movies.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request or JSON parsing fails.
    async fn account_list(
        &self,
        session: &UserSession,
        list: AccountList,
        page: u32,
    ) -> Result<MoviePage>;

    /// Adds a movie to, or removes it from, the user's favorites or watchlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the API rejects the write.
    async fn set_list_membership(
        &self,
        session: &UserSession,
        list: AccountList,
        movie_id: u64,
        member: bool,
    ) -> Result<StatusResponse>;
}
