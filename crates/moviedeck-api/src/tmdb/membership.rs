//! Favorite / watchlist membership and optimistic toggling.
#![allow(clippy::future_not_send)]

use super::api::LocalTmdbApi;
use super::types::{MembershipBody, MoviePage};
use crate::store::UserSession;

/// A per-user movie list that supports membership writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountList {
    /// Favorite movies.
    Favorite,
    /// Watchlist.
    Watchlist,
}

impl AccountList {
    /// Path segment and body field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::Watchlist => "watchlist",
        }
    }

    /// Request body setting membership of `movie_id` to `member`.
    #[must_use]
    pub const fn body(self, movie_id: u64, member: bool) -> MembershipBody {
        let (favorite, watchlist) = match self {
            Self::Favorite => (Some(member), None),
            Self::Watchlist => (None, Some(member)),
        };
        MembershipBody {
            media_type: "movie",
            media_id: movie_id,
            favorite,
            watchlist,
        }
    }
}

/// Result of a membership toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The write succeeded; the flag now holds this value.
    Applied(bool),
    /// The write failed and the flag was restored.
    Reverted {
        /// Failure description for a non-fatal notification.
        message: String,
    },
}

/// Local membership flag of one movie in one list.
///
/// Toggling is optimistic: the flag flips before the write is sent and is
/// restored if the write fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipToggle {
    /// Which list.
    list: AccountList,
    /// TMDB movie ID.
    movie_id: u64,
    /// Current local flag.
    member: bool,
}

impl MembershipToggle {
    /// Creates a toggle with an explicit initial flag.
    #[must_use]
    pub const fn new(list: AccountList, movie_id: u64, member: bool) -> Self {
        Self {
            list,
            movie_id,
            member,
        }
    }

    /// Seeds the flag by scanning a fetched list page for the movie.
    #[must_use]
    pub fn from_page(list: AccountList, movie_id: u64, page: &MoviePage) -> Self {
        Self::new(list, movie_id, page.contains(movie_id))
    }

    /// Which list this toggle writes to.
    #[must_use]
    pub const fn list(&self) -> AccountList {
        self.list
    }

    /// TMDB movie ID.
    #[must_use]
    pub const fn movie_id(&self) -> u64 {
        self.movie_id
    }

    /// Current local flag.
    #[must_use]
    pub const fn is_member(&self) -> bool {
        self.member
    }

    /// Flips the flag and returns the value to send.
    pub const fn begin(&mut self) -> bool {
        self.member = !self.member;
        self.member
    }

    /// Applies the outcome of the write started by [`Self::begin`].
    ///
    /// On failure the flag is restored to its value before `begin`.
    pub fn finish(&mut self, result: anyhow::Result<()>) -> ToggleOutcome {
        match result {
            Ok(()) => ToggleOutcome::Applied(self.member),
            Err(err) => {
                self.member = !self.member;
                tracing::warn!(
                    list = self.list.as_str(),
                    movie_id = self.movie_id,
                    "membership write failed, reverting: {err:#}"
                );
                ToggleOutcome::Reverted {
                    message: format!("Could not update {}: {err:#}", self.list.as_str()),
                }
            }
        }
    }

    /// Flips the flag, sends the write and reverts on failure.
    pub async fn toggle<C: LocalTmdbApi>(
        &mut self,
        client: &C,
        session: &UserSession,
    ) -> ToggleOutcome {
        let member = self.begin();
        let result = client
            .set_list_membership(session, self.list, self.movie_id, member)
            .await
            .map(|_| ());
        self.finish(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::tmdb::TmdbClient;

    fn client_for(mock_server: &wiremock::MockServer) -> TmdbClient {
        let base_url = format!("{}/3/", mock_server.uri());
        TmdbClient::builder()
            .base_url(base_url.parse().unwrap())
            .api_key("test-key")
            .user_agent("test/0.0.0")
            .build()
            .unwrap()
    }

    fn favorites_page() -> MoviePage {
        let json = include_str!("../../../../fixtures/tmdb/account_favorite_movies.json");
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_body_sets_only_list_field() {
        // Arrange & Act
        let favorite = serde_json::to_value(AccountList::Favorite.body(550, false)).unwrap();
        let watchlist = serde_json::to_value(AccountList::Watchlist.body(550, true)).unwrap();

        // Assert
        assert_eq!(
            favorite,
            serde_json::json!({"media_type": "movie", "media_id": 550, "favorite": false})
        );
        assert_eq!(
            watchlist,
            serde_json::json!({"media_type": "movie", "media_id": 550, "watchlist": true})
        );
    }

    #[test]
    fn test_from_page_scans_for_movie() {
        // Arrange
        let page = favorites_page();

        // Act
        let listed = MembershipToggle::from_page(AccountList::Favorite, 550, &page);
        let unlisted = MembershipToggle::from_page(AccountList::Favorite, 13, &page);

        // Assert
        assert!(listed.is_member());
        assert!(!unlisted.is_member());
    }

    #[test]
    fn test_finish_error_restores_flag() {
        // Arrange
        let mut toggle = MembershipToggle::new(AccountList::Watchlist, 550, false);
        let sent = toggle.begin();

        // Act
        let outcome = toggle.finish(Err(anyhow::anyhow!("boom")));

        // Assert
        assert!(sent);
        assert!(!toggle.is_member());
        assert!(matches!(outcome, ToggleOutcome::Reverted { message } if message.contains("boom")));
    }

    #[tokio::test]
    async fn test_toggle_listed_favorite_posts_false() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/3/account/42/favorite"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "media_type": "movie",
                "media_id": 550,
                "favorite": false,
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"status_code":13,"status_message":"The item/record was deleted successfully."}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let session = UserSession::new(42, "sess-1");
        let mut toggle = MembershipToggle::from_page(AccountList::Favorite, 550, &favorites_page());

        // Act
        let outcome = toggle.toggle(&client, &session).await;

        // Assert
        assert_eq!(outcome, ToggleOutcome::Applied(false));
        assert!(!toggle.is_member());
    }

    #[tokio::test]
    async fn test_toggle_failure_reverts() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string(
                r#"{"status_code":3,"status_message":"Authentication failed: You do not have permissions to access the service.","success":false}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let session = UserSession::new(42, "expired");
        let mut toggle = MembershipToggle::new(AccountList::Watchlist, 550, false);

        // Act
        let outcome = toggle.toggle(&client, &session).await;

        // Assert
        assert!(!toggle.is_member());
        assert!(
            matches!(outcome, ToggleOutcome::Reverted { message } if message.contains("Authentication failed"))
        );
    }
}
