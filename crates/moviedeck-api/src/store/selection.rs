//! Selection slice: the category, genre or search term driving the movie list.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Curated movie categories served by `movie/{category}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// `movie/popular`.
    Popular,
    /// `movie/top_rated`.
    TopRated,
    /// `movie/upcoming`.
    Upcoming,
    /// `movie/now_playing`.
    NowPlaying,
}

impl Category {
    /// All categories in menu order.
    pub const ALL: [Self; 4] = [
        Self::Popular,
        Self::TopRated,
        Self::Upcoming,
        Self::NowPlaying,
    ];

    /// Path segment used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::TopRated => "top_rated",
            Self::Upcoming => "upcoming",
            Self::NowPlaying => "now_playing",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Popular => "Popular",
            Self::TopRated => "Top Rated",
            Self::Upcoming => "Upcoming",
            Self::NowPlaying => "Now Playing",
        }
    }

    /// The category after this one, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Popular => Self::TopRated,
            Self::TopRated => Self::Upcoming,
            Self::Upcoming => Self::NowPlaying,
            Self::NowPlaying => Self::Popular,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(Self::Popular),
            "top_rated" => Ok(Self::TopRated),
            "upcoming" => Ok(Self::Upcoming),
            "now_playing" => Ok(Self::NowPlaying),
            other => bail!(
                "unknown category '{other}' (expected popular, top_rated, upcoming or now_playing)"
            ),
        }
    }
}

/// Target of a genre/category pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreOrCategory {
    /// Numeric TMDB genre ID.
    Genre(u32),
    /// Named category.
    Category(Category),
}

/// What the movie list currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing picked; the list falls back to popular movies.
    #[default]
    NoSelection,
    /// A named category.
    Category(Category),
    /// A genre by ID.
    Genre(u32),
    /// A free-text search.
    Search(String),
}

impl Selection {
    /// Short label for headers.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::NoSelection => String::from(Category::Popular.label()),
            Self::Category(category) => String::from(category.label()),
            Self::Genre(id) => format!("Genre #{id}"),
            Self::Search(query) => format!("Search: {query}"),
        }
    }
}

/// Selection slice: the last genre or category pick and the search term.
///
/// A non-empty search takes precedence over the pick; clearing the search
/// brings the pick back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    pick: Option<GenreOrCategory>,
    query: String,
}

impl SelectionState {
    /// Applies an action and returns the next state.
    ///
    /// Picking a genre or category clears the search. Search terms are
    /// whitespace-trimmed and leave the pick untouched.
    #[must_use]
    pub fn reduce(self, action: SelectionAction) -> Self {
        match action {
            SelectionAction::SelectGenreOrCategory(pick) => Self {
                pick: Some(pick),
                query: String::new(),
            },
            SelectionAction::SetSearchQuery(query) => Self {
                pick: self.pick,
                query: String::from(query.trim()),
            },
        }
    }

    /// Search term, empty when not searching.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// What the movie list shows for this state.
    #[must_use]
    pub fn selection(&self) -> Selection {
        if !self.query.is_empty() {
            return Selection::Search(self.query.clone());
        }
        match self.pick {
            Some(GenreOrCategory::Genre(id)) => Selection::Genre(id),
            Some(GenreOrCategory::Category(category)) => Selection::Category(category),
            None => Selection::NoSelection,
        }
    }
}

/// Mutations accepted by the selection slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    /// Pick a genre or category.
    SelectGenreOrCategory(GenreOrCategory),
    /// Set the search term.
    SetSearchQuery(String),
}
