//! `TmdbClient` - TMDB API client implementation.

use anyhow::{Context, Result, bail};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::api::TmdbApi;
use super::descriptor::RequestDescriptor;
use super::membership::AccountList;
use super::types::{
    Credits, GenreList, MembershipBody, MovieDetails, MoviePage, Person, StatusResponse,
    TmdbErrorResponse,
};
use crate::store::{Selection, UserSession};

/// Default base URL for TMDB API v3.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";

/// Default response language.
const DEFAULT_LANGUAGE: &str = "en-US";

/// TMDB API client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for API requests.
    base_url: Url,
    /// v3 API key, sent as the `api_key` query parameter.
    api_key: String,
    /// Response language.
    language: String,
}

/// Builder for `TmdbClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClientBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    user_agent: Option<String>,
    language: Option<String>,
}

impl TmdbClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user_agent: None,
            language: None,
        }
    }

    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the v3 API key (required).
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the response language (default: "en-US").
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `api_key` is not set.
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<TmdbClient> {
        let api_key = self.api_key.context("api_key is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            let result = Url::parse(DEFAULT_BASE_URL);
            result.context("invalid default base URL")?
        };

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(TmdbClient {
            http_client,
            base_url,
            api_key,
            language: self
                .language
                .unwrap_or_else(|| String::from(DEFAULT_LANGUAGE)),
        })
    }
}

impl TmdbClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> TmdbClientBuilder {
        TmdbClientBuilder::new()
    }

    /// Resolves an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to join URL path: {path}"))
    }

    /// Credential query parameters, plus `session_id` when signed in.
    fn credentials<'a>(&'a self, session: Option<&'a UserSession>) -> Vec<(&'a str, &'a str)> {
        let mut query = vec![("api_key", self.api_key.as_str())];
        if let Some(session) = session {
            query.push(("session_id", session.session_id.as_str()));
        }
        query
    }

    /// Sends a GET request for a descriptor and returns the JSON body.
    #[instrument(skip_all, fields(path = descriptor.path()))]
    async fn get_json(
        &self,
        descriptor: &RequestDescriptor,
        session: Option<&UserSession>,
    ) -> Result<Value> {
        let path = descriptor.path();
        let url = self.endpoint(path)?;

        let mut query = self.credentials(session);
        query.push(("language", self.language.as_str()));
        query.extend(descriptor.params());

        let request = self
            .http_client
            .get(url)
            .query(&query)
            .build()
            .with_context(|| format!("failed to build request: {path}"))?;

        tracing::debug!(key = %descriptor.cache_key(), "TMDB API request");

        let result = self.http_client.execute(request).await;
        let response = result.with_context(|| format!("request failed: {path}"))?;
        let body = read_success_body(response, path).await?;

        let raw_result: std::result::Result<Value, _> = serde_json::from_str(&body);
        raw_result.with_context(|| format!("failed to decode JSON response: {path}"))
    }

    /// Sends a POST request with a JSON body on behalf of a user.
    #[instrument(skip_all, fields(path = path))]
    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        session: &UserSession,
    ) -> Result<StatusResponse> {
        let url = self.endpoint(path)?;
        let query = self.credentials(Some(session));

        let request = self
            .http_client
            .post(url)
            .query(&query)
            .json(body)
            .build()
            .with_context(|| format!("failed to build request: {path}"))?;

        tracing::debug!("TMDB API write");

        let result = self.http_client.execute(request).await;
        let response = result.with_context(|| format!("request failed: {path}"))?;
        let body = read_success_body(response, path).await?;

        let raw_result: std::result::Result<StatusResponse, _> = serde_json::from_str(&body);
        raw_result.with_context(|| format!("failed to decode JSON response: {path}"))
    }

    /// Fetches a descriptor and decodes it into `T`.
    async fn get_typed<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        session: Option<&UserSession>,
    ) -> Result<T> {
        let value = self.get_json(descriptor, session).await?;
        serde_json::from_value(value)
            .with_context(|| format!("unexpected response shape: {}", descriptor.path()))
    }
}

/// Reads the body of a 2xx response, or turns the response into an error.
async fn read_success_body(response: Response, path: &str) -> Result<String> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<failed to read body>"));
        if let Ok(error_response) = serde_json::from_str::<TmdbErrorResponse>(&body) {
            bail!(
                "TMDB API error (HTTP {}): code={}, message={}",
                status,
                error_response.status_code,
                error_response.status_message,
            );
        }
        bail!("TMDB API error (HTTP {status}): {body}");
    }

    response
        .text()
        .await
        .with_context(|| format!("failed to read response body: {path}"))
}

impl TmdbApi for TmdbClient {
    async fn fetch(
        &self,
        descriptor: &RequestDescriptor,
        session: Option<&UserSession>,
    ) -> Result<Value> {
        self.get_json(descriptor, session).await
    }

    #[instrument(skip_all)]
    async fn genres(&self) -> Result<GenreList> {
        self.get_typed(&RequestDescriptor::genres(), None).await
    }

    #[instrument(skip_all)]
    async fn movies(&self, selection: &Selection, page: u32) -> Result<MoviePage> {
        self.get_typed(&RequestDescriptor::movies(selection, page), None)
            .await
    }

    #[instrument(skip_all)]
    async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails> {
        self.get_typed(&RequestDescriptor::movie_details(movie_id), None)
            .await
    }

    #[instrument(skip_all)]
    async fn movie_credits(&self, movie_id: u64) -> Result<Credits> {
        self.get_typed(&RequestDescriptor::movie_credits(movie_id), None)
            .await
    }

    #[instrument(skip_all)]
    async fn recommendations(&self, movie_id: u64, page: u32) -> Result<MoviePage> {
        self.get_typed(&RequestDescriptor::recommendations(movie_id, page), None)
            .await
    }

    #[instrument(skip_all)]
    async fn person(&self, person_id: u64) -> Result<Person> {
        self.get_typed(&RequestDescriptor::person(person_id), None)
            .await
    }

    #[instrument(skip_all)]
    async fn person_movies(&self, person_id: u64, page: u32) -> Result<MoviePage> {
        self.get_typed(&RequestDescriptor::person_movies(person_id, page), None)
            .await
    }

    #[instrument(skip_all)]
    async fn account_list(
        &self,
        session: &UserSession,
        list: AccountList,
        page: u32,
    ) -> Result<MoviePage> {
        let descriptor = RequestDescriptor::account_list(session.account_id, list, page);
        self.get_typed(&descriptor, Some(session)).await
    }

    #[instrument(skip_all, fields(list = list.as_str(), movie_id = movie_id, member = member))]
    async fn set_list_membership(
        &self,
        session: &UserSession,
        list: AccountList,
        movie_id: u64,
        member: bool,
    ) -> Result<StatusResponse> {
        let path = format!("account/{}/{}", session.account_id, list.as_str());
        let body: MembershipBody = list.body(movie_id, member);
        self.post_json(&path, &body, session).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use crate::store::Category;

    fn client_for(mock_server: &wiremock::MockServer) -> TmdbClient {
        let base_url = format!("{}/3/", mock_server.uri());
        TmdbClient::builder()
            .base_url(base_url.parse().unwrap())
            .api_key("test-key")
            .user_agent("test/0.0.0")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_api_key() {
        // Arrange & Act
        let result = TmdbClient::builder().user_agent("test/0.0.0").build();

        // Assert
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("api_key is required")
        );
    }

    #[test]
    fn test_builder_requires_user_agent() {
        // Arrange & Act
        let result = TmdbClient::builder().api_key("test-key").build();

        // Assert
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("user_agent is required")
        );
    }

    #[test]
    fn test_builder_defaults() {
        // Arrange & Act
        let client = TmdbClient::builder()
            .api_key("test-key")
            .user_agent("test/0.0.0")
            .build()
            .unwrap();

        // Assert
        assert_eq!(client.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.language, "en-US");
    }

    #[test]
    fn test_parse_movie_page_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/movie_popular_page1.json");

        // Act
        let page: MoviePage = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 500);
        assert_eq!(page.results[0].id, 550);
        assert!(page.contains(680));
        assert!(!page.contains(1));
    }

    #[test]
    fn test_parse_movie_details_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/movie_550.json");

        // Act
        let details: MovieDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(details.id, 550);
        assert_eq!(details.title, "Fight Club");
        assert_eq!(details.runtime, Some(139));
        assert_eq!(details.imdb_id.as_deref(), Some("tt0137523"));
        assert_eq!(details.videos.unwrap().results[0].site, "YouTube");
        assert!(!details.credits.unwrap().cast.is_empty());
    }

    #[test]
    fn test_parse_person_fixture() {
        // Arrange
        let json = include_str!("../../../../fixtures/tmdb/person_287.json");

        // Act
        let person: Person = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(person.id, 287);
        assert_eq!(person.birthday.as_deref(), Some("1963-12-18"));
    }

    #[test]
    fn test_parse_error_response() {
        // Arrange
        let json = r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#;

        // Act
        let error: TmdbErrorResponse = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(error.status_code, 7);
        assert!(!error.success);
        assert!(error.status_message.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_category_list_via_http() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/movie_popular_page1.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/movie/top_rated"))
            .and(wiremock::matchers::query_param("page", "1"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        // Act
        let page = client
            .movies(&Selection::Category(Category::TopRated), 1)
            .await
            .unwrap();

        // Assert
        assert_eq!(page.results.len(), 3);
    }

    #[tokio::test]
    async fn test_genre_list_uses_discover() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/movie_popular_page1.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/discover/movie"))
            .and(wiremock::matchers::query_param("with_genres", "28"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        // Act & Assert (mock expect(1) verifies the route)
        client.movies(&Selection::Genre(28), 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_key_is_sent() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/genres.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/genre/movie/list"))
            .and(wiremock::matchers::query_param("api_key", "test-key"))
            .and(wiremock::matchers::query_param("language", "en-US"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        // Act
        let genres = client.genres().await.unwrap();

        // Assert
        assert_eq!(genres.genres[0].name, "Action");
    }

    #[tokio::test]
    async fn test_account_list_sends_session_id() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let json_body = include_str!("../../../../fixtures/tmdb/account_favorite_movies.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/account/42/favorite/movies"))
            .and(wiremock::matchers::query_param("session_id", "sess-1"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let session = UserSession::new(42, "sess-1");

        // Act
        let page = client
            .account_list(&session, AccountList::Favorite, 1)
            .await
            .unwrap();

        // Assert
        assert!(page.contains(550));
    }

    #[tokio::test]
    async fn test_set_list_membership_posts_body() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/3/account/42/watchlist"))
            .and(wiremock::matchers::query_param("session_id", "sess-1"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "media_type": "movie",
                "media_id": 550,
                "watchlist": true,
            })))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_string(
                r#"{"status_code":1,"status_message":"Success."}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let session = UserSession::new(42, "sess-1");

        // Act
        let status = client
            .set_list_membership(&session, AccountList::Watchlist, 550, true)
            .await
            .unwrap();

        // Assert
        assert_eq!(status.status_code, 1);
    }

    #[tokio::test]
    async fn test_http_error_returns_tmdb_error() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let error_body = r#"{"status_code":7,"status_message":"Invalid API key: You must be granted a valid key.","success":false}"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string(error_body))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        // Act
        let result = client.person(287).await;

        // Assert
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("TMDB API error"));
        assert!(err.contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_http_429_is_not_retried() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);

        // Act
        let result = client.movie_credits(550).await;

        // Assert
        assert!(result.unwrap_err().to_string().contains("HTTP 429"));
    }
}
