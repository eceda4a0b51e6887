//! TMDB API response types and request bodies.

use serde::{Deserialize, Serialize};

// --- Movie lists ---

/// Paginated movie list.
///
/// Shared by `movie/{category}`, `discover/movie`, `search/movie`,
/// `movie/{id}/recommendations` and the account list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MoviePage {
    /// Current page number.
    pub page: u32,
    /// Movies on this page.
    pub results: Vec<MovieSummary>,
    /// Total number of pages.
    #[serde(default)]
    pub total_pages: u32,
    /// Total number of results.
    #[serde(default)]
    pub total_results: u32,
}

impl MoviePage {
    /// Returns `true` if the page contains the movie.
    #[must_use]
    pub fn contains(&self, movie_id: u64) -> bool {
        self.results.iter().any(|movie| movie.id == movie_id)
    }
}

/// A single movie in a list.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Release date (YYYY-MM-DD, may be empty).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Vote average (0-10).
    #[serde(default)]
    pub vote_average: f64,
    /// Genre IDs.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Backdrop image path.
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

// --- Genres ---

/// Genre entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    /// Genre ID.
    pub id: u32,
    /// Genre name.
    pub name: String,
}

/// Response from `genre/movie/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenreList {
    /// All movie genres.
    pub genres: Vec<Genre>,
}

// --- Movie details ---

/// Response from `movie/{id}?append_to_response=videos,credits`.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Tagline.
    #[serde(default)]
    pub tagline: Option<String>,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Release date (YYYY-MM-DD).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Runtime in minutes.
    #[serde(default)]
    pub runtime: Option<u32>,
    /// Vote average (0-10).
    #[serde(default)]
    pub vote_average: f64,
    /// Genres.
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Spoken languages.
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    /// Official homepage.
    #[serde(default)]
    pub homepage: Option<String>,
    /// IMDB ID (e.g. "tt0137523").
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Appended videos.
    #[serde(default)]
    pub videos: Option<VideoList>,
    /// Appended credits.
    #[serde(default)]
    pub credits: Option<Credits>,
}

/// Spoken language entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SpokenLanguage {
    /// ISO 639-1 code.
    pub iso_639_1: String,
    /// Native name.
    pub name: String,
    /// English name.
    #[serde(default)]
    pub english_name: Option<String>,
}

/// Video list appended to movie details.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoList {
    /// Videos.
    pub results: Vec<Video>,
}

/// A trailer, teaser or clip.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    /// Site-specific key (YouTube video ID).
    pub key: String,
    /// Hosting site (e.g. "YouTube").
    pub site: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Video type (e.g. "Trailer").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

// --- Credits ---

/// Response from `movie/{id}/credits`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credits {
    /// Cast members in billing order.
    pub cast: Vec<CastMember>,
}

/// A single cast member.
#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    /// TMDB person ID.
    pub id: u64,
    /// Actor name.
    pub name: String,
    /// Character played.
    #[serde(default)]
    pub character: Option<String>,
    /// Profile image path.
    #[serde(default)]
    pub profile_path: Option<String>,
}

// --- People ---

/// Response from `person/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    /// TMDB person ID.
    pub id: u64,
    /// Name.
    pub name: String,
    /// Birthday (YYYY-MM-DD).
    #[serde(default)]
    pub birthday: Option<String>,
    /// Biography.
    #[serde(default)]
    pub biography: Option<String>,
    /// Place of birth.
    #[serde(default)]
    pub place_of_birth: Option<String>,
    /// IMDB ID (e.g. "nm0000093").
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Profile image path.
    #[serde(default)]
    pub profile_path: Option<String>,
}

// --- Account writes ---

/// Body of `POST account/{id}/favorite` and `POST account/{id}/watchlist`.
///
/// Exactly one of `favorite` / `watchlist` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipBody {
    /// Always "movie".
    pub media_type: &'static str,
    /// TMDB movie ID.
    pub media_id: u64,
    /// Favorite flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    /// Watchlist flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchlist: Option<bool>,
}

/// Status body returned by write endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// TMDB status code (1 = created, 12 = updated, 13 = deleted).
    pub status_code: u32,
    /// Status message.
    pub status_message: String,
}

// --- Error Response ---

/// TMDB API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbErrorResponse {
    /// TMDB error code.
    pub status_code: u32,
    /// Error message.
    pub status_message: String,
    /// Success flag (always false for errors).
    #[allow(dead_code)]
    #[serde(default)]
    pub success: bool,
}
