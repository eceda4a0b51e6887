//! View models derived from query states.
//!
//! Everything here is a pure function of fetched data so screens render the
//! same way for the TUI and for the one-shot subcommands.

use chrono::NaiveDate;
use moviedeck_api::query::QueryState;
use moviedeck_api::tmdb::{CastMember, MovieDetails, MoviePage, MovieSummary, Person};

/// Shown when a list query succeeds with no results.
pub const NO_MOVIES: &str = "No movies that match that name. Please search for something else.";

/// Shown when a screen's primary query fails.
pub const SOMETHING_WRONG: &str = "Something has gone wrong - press Backspace to go back";

/// Shown when the movie list at the bottom of the stack fails.
pub const RETRY_HINT: &str = "Something has gone wrong - press Backspace to try again";

/// Shown for a person without a biography.
pub const NO_BIOGRAPHY: &str = "No Biography Available";

/// Shown when a movie has no recommendations.
pub const NOTHING_FOUND: &str = "Sorry Nothing Was Found";

/// Number of cast members shown on the detail screen.
pub const TOP_CAST_LEN: usize = 6;

/// What a movie list screen renders.
#[derive(Debug, Clone, Copy)]
pub enum ListView<'a> {
    /// Query in flight.
    Loading,
    /// Query failed; only the recovery hint is shown.
    Failed,
    /// Query succeeded with no results.
    Empty,
    /// Featured first result plus the rest of the page.
    Ready {
        /// First result.
        featured: &'a MovieSummary,
        /// Remaining results.
        rest: &'a [MovieSummary],
        /// Current page.
        page: u32,
        /// Total pages reported by the API.
        total_pages: u32,
    },
}

/// Derives the list view from a movie page query.
///
/// A failed query never renders stale results, and an empty success is not
/// an error.
#[must_use]
pub fn list_view(state: &QueryState<MoviePage>) -> ListView<'_> {
    match state {
        QueryState::Loading => ListView::Loading,
        QueryState::Error(_) => ListView::Failed,
        QueryState::Success(page) => match page.results.split_first() {
            None => ListView::Empty,
            Some((featured, rest)) => ListView::Ready {
                featured,
                rest,
                page: page.page,
                total_pages: page.total_pages,
            },
        },
    }
}

/// Next page number, if there is one.
#[must_use]
pub fn next_page(page: u32, total_pages: u32) -> Option<u32> {
    if page < total_pages {
        page.checked_add(1)
    } else {
        None
    }
}

/// Previous page number, if there is one.
#[must_use]
pub fn prev_page(page: u32) -> Option<u32> {
    if page > 1 { page.checked_sub(1) } else { None }
}

/// Pagination indicator (e.g. "2 / 500").
#[must_use]
pub fn page_indicator(page: u32, total_pages: u32) -> String {
    format!("{page} / {total_pages}")
}

/// Year part of a `YYYY-MM-DD` date.
#[must_use]
pub fn release_year(date: Option<&str>) -> Option<&str> {
    date.and_then(|d| d.split('-').next())
        .filter(|year| !year.is_empty())
}

/// One-line summary of a list entry (e.g. "Fight Club (1999)").
#[must_use]
pub fn movie_line(movie: &MovieSummary) -> String {
    match release_year(movie.release_date.as_deref()) {
        Some(year) => format!("{} ({year})", movie.title),
        None => movie.title.clone(),
    }
}

/// Detail screen heading (e.g. "Fight Club (1999)").
#[must_use]
pub fn title_line(details: &MovieDetails) -> String {
    match release_year(details.release_date.as_deref()) {
        Some(year) => format!("{} ({year})", details.title),
        None => details.title.clone(),
    }
}

/// Rating out of ten (e.g. "8.4 / 10").
#[must_use]
pub fn rating_line(vote_average: f64) -> String {
    format!("{vote_average:.1} / 10")
}

/// Runtime and first spoken language (e.g. "139min | Language: English").
#[must_use]
pub fn runtime_language_line(details: &MovieDetails) -> String {
    let runtime = details
        .runtime
        .map_or_else(|| String::from("-"), |minutes| format!("{minutes}min"));
    let language = details
        .spoken_languages
        .first()
        .map_or("-", |lang| lang.name.as_str());
    format!("{runtime} | Language: {language}")
}

/// First cast members that have a profile image.
#[must_use]
pub fn top_cast(cast: &[CastMember]) -> Vec<&CastMember> {
    cast.iter()
        .filter(|member| member.profile_path.is_some())
        .take(TOP_CAST_LEN)
        .collect()
}

/// Watch URL of the first YouTube video.
#[must_use]
pub fn trailer_url(details: &MovieDetails) -> Option<String> {
    details
        .videos
        .as_ref()?
        .results
        .iter()
        .find(|video| video.site == "YouTube")
        .map(|video| format!("https://www.youtube.com/watch?v={}", video.key))
}

/// IMDB page of a movie.
#[must_use]
pub fn imdb_title_url(imdb_id: &str) -> String {
    format!("https://www.imdb.com/title/{imdb_id}")
}

/// IMDB page of a person.
#[must_use]
pub fn imdb_name_url(imdb_id: &str) -> String {
    format!("https://www.imdb.com/name/{imdb_id}")
}

/// Formats a `YYYY-MM-DD` birthday like "Tue Jun 09 1964".
#[must_use]
pub fn format_birthday(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%a %b %d %Y").to_string())
}

/// "Born: ..." line of the actor screen.
#[must_use]
pub fn born_line(person: &Person) -> String {
    let born = person
        .birthday
        .as_deref()
        .and_then(format_birthday)
        .unwrap_or_else(|| String::from("-"));
    format!("Born: {born}")
}

/// Biography, or a placeholder when it is missing or blank.
#[must_use]
pub fn biography(person: &Person) -> &str {
    person
        .biography
        .as_deref()
        .filter(|bio| !bio.trim().is_empty())
        .unwrap_or(NO_BIOGRAPHY)
}
