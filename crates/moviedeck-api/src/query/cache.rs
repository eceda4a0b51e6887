//! `QueryCache` - coalescing response cache keyed by request descriptor.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::state::{EntryStatus, FetchError, QueryState};
use crate::store::AppStore;
use crate::tmdb::{CacheKey, RequestDescriptor, TmdbApi};

/// How long an entry without subscribers is kept by default.
pub const DEFAULT_KEEP_UNUSED_FOR: Duration = Duration::from_secs(60);

/// Settled outcome of one fetch.
type FetchResult = Result<Arc<Value>, FetchError>;

/// Handle to an in-flight fetch; every clone resolves to the same result.
type InFlight = Shared<BoxFuture<'static, FetchResult>>;

/// Payload slot of a cache entry.
#[derive(Clone)]
enum Slot {
    Pending(InFlight),
    Fulfilled(Arc<Value>),
    Rejected(FetchError),
}

impl Slot {
    const fn status(&self) -> EntryStatus {
        match self {
            Self::Pending(_) => EntryStatus::Pending,
            Self::Fulfilled(_) => EntryStatus::Fulfilled,
            Self::Rejected(_) => EntryStatus::Rejected,
        }
    }
}

/// Stored state for one cache key.
struct CacheEntry {
    /// Current payload or in-flight fetch.
    slot: Slot,
    /// Bumped on every refetch; results of older generations are dropped.
    generation: u64,
    /// Live subscriptions.
    subscribers: usize,
    /// When the subscriber count last dropped to zero.
    released_at: Option<Instant>,
}

/// State shared by the cache handle, its subscriptions and its fetch tasks.
struct Inner<C> {
    /// API client used for fetches.
    client: Arc<C>,
    /// Store the session is read from for personalized endpoints.
    store: AppStore,
    /// How long unused settled entries survive a sweep.
    keep_unused_for: Duration,
    /// Entries by key.
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl<C> Inner<C> {
    /// Writes a fetch result into its entry unless the entry moved on.
    fn settle(&self, key: &CacheKey, generation: u64, result: &FetchResult) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(%key, "entry evicted before its fetch settled");
            return;
        };
        if entry.generation != generation {
            tracing::debug!(%key, generation, "dropping result of superseded fetch");
            return;
        }
        entry.slot = match result {
            Ok(value) => {
                tracing::debug!(%key, "query fulfilled");
                Slot::Fulfilled(Arc::clone(value))
            }
            Err(err) => {
                tracing::warn!(%key, "query rejected: {err}");
                Slot::Rejected(err.clone())
            }
        };
    }

    /// Copies the slot of `key` out of the map.
    fn snapshot(&self, key: &CacheKey) -> Option<Slot> {
        self.entries.lock().get(key).map(|entry| entry.slot.clone())
    }
}

impl<C: TmdbApi + Send + Sync + 'static> Inner<C> {
    /// Starts a fetch for `descriptor` and returns its shared handle.
    ///
    /// The fetch is driven by a spawned task so it completes even if every
    /// subscriber goes away; the fetch itself settles the entry.
    fn start_fetch(
        this: &Arc<Self>,
        key: CacheKey,
        descriptor: RequestDescriptor,
        generation: u64,
    ) -> InFlight {
        let session = if descriptor.requires_session() {
            this.store.session()
        } else {
            None
        };
        let client = Arc::clone(&this.client);
        let weak: Weak<Self> = Arc::downgrade(this);

        tracing::debug!(%key, generation, "starting fetch");

        let fetch = async move {
            let result: FetchResult = if descriptor.requires_session() && session.is_none() {
                Err(FetchError::new(anyhow::anyhow!(
                    "not signed in: {} requires a session",
                    descriptor.path()
                )))
            } else {
                client
                    .fetch(&descriptor, session.as_ref())
                    .await
                    .map(Arc::new)
                    .map_err(FetchError::from)
            };
            if let Some(inner) = weak.upgrade() {
                inner.settle(&key, generation, &result);
            }
            result
        }
        .boxed()
        .shared();

        tokio::spawn(fetch.clone().map(drop));
        fetch
    }
}

/// Response cache with request coalescing.
///
/// Each distinct [`CacheKey`] is fetched at most once per generation:
/// subscribers that arrive while a fetch is in flight attach to it instead
/// of issuing their own request. There is no automatic refresh; a new
/// generation starts through [`QueryCache::refetch`], when a new subscriber
/// finds a rejected entry, or after an unused entry has been swept.
pub struct QueryCache<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for QueryCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for QueryCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.entries.lock().len())
            .field("keep_unused_for", &self.inner.keep_unused_for)
            .finish_non_exhaustive()
    }
}

impl<C> QueryCache<C> {
    /// Store the cache reads the session from.
    #[must_use]
    pub fn store(&self) -> &AppStore {
        &self.inner.store
    }

    /// Status of the entry for `key`, if one exists.
    #[must_use]
    pub fn status(&self, key: &CacheKey) -> Option<EntryStatus> {
        self.inner
            .entries
            .lock()
            .get(key)
            .map(|entry| entry.slot.status())
    }

    /// Number of live subscriptions for `key`.
    #[must_use]
    pub fn subscribers(&self, key: &CacheKey) -> usize {
        self.inner
            .entries
            .lock()
            .get(key)
            .map_or(0, |entry| entry.subscribers)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Evicts settled entries that have had no subscribers for longer than
    /// the keep-unused duration. Returns the number of evicted entries.
    ///
    /// In-flight entries are never evicted; an orphaned fetch settles first.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let keep = self.inner.keep_unused_for;
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|key, entry| {
            let expired = entry.subscribers == 0
                && !matches!(entry.slot, Slot::Pending(_))
                && entry
                    .released_at
                    .is_some_and(|at| now.saturating_duration_since(at) >= keep);
            if expired {
                tracing::debug!(%key, "evicting unused entry");
            }
            !expired
        });
        before.saturating_sub(entries.len())
    }
}

impl<C: TmdbApi + Send + Sync + 'static> QueryCache<C> {
    /// Creates a cache with the default keep-unused duration.
    #[must_use]
    pub fn new(client: Arc<C>, store: AppStore) -> Self {
        Self::with_keep_unused_for(client, store, DEFAULT_KEEP_UNUSED_FOR)
    }

    /// Creates a cache that keeps unused entries for `keep_unused_for`.
    #[must_use]
    pub fn with_keep_unused_for(
        client: Arc<C>,
        store: AppStore,
        keep_unused_for: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                keep_unused_for,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribes to a query, starting a fetch if the key has no entry or
    /// its last fetch was rejected.
    ///
    /// Must be called from within a Tokio runtime; the fetch runs on a
    /// spawned task.
    pub fn subscribe<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Subscription<C, T> {
        self.sweep();
        let key = descriptor.cache_key();
        {
            let mut entries = self.inner.entries.lock();
            if let Some(entry) = entries.get_mut(&key) {
                entry.subscribers = entry.subscribers.saturating_add(1);
                entry.released_at = None;
                if matches!(entry.slot, Slot::Rejected(_)) {
                    entry.generation = entry.generation.wrapping_add(1);
                    tracing::debug!(%key, generation = entry.generation, "retrying rejected entry");
                    entry.slot = Slot::Pending(Inner::start_fetch(
                        &self.inner,
                        key.clone(),
                        descriptor.clone(),
                        entry.generation,
                    ));
                }
                tracing::debug!(
                    %key,
                    subscribers = entry.subscribers,
                    status = ?entry.slot.status(),
                    "attached to cached entry"
                );
            } else {
                let in_flight =
                    Inner::start_fetch(&self.inner, key.clone(), descriptor.clone(), 0);
                entries.insert(
                    key.clone(),
                    CacheEntry {
                        slot: Slot::Pending(in_flight),
                        generation: 0,
                        subscribers: 1,
                        released_at: None,
                    },
                );
            }
        }
        Subscription {
            inner: Arc::clone(&self.inner),
            key,
            descriptor: descriptor.clone(),
            _payload: PhantomData,
        }
    }

    /// Resolves a query once: subscribe, wait for the result, release.
    pub async fn query<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> QueryState<T> {
        let subscription = self.subscribe::<T>(descriptor);
        subscription.wait().await
    }

    /// Starts a new generation for a settled entry.
    ///
    /// Returns `false` if the key has no entry or a fetch is already in
    /// flight (the caller then shares that fetch).
    pub fn refetch(&self, descriptor: &RequestDescriptor) -> bool {
        let key = descriptor.cache_key();
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(&key) else {
            return false;
        };
        if matches!(entry.slot, Slot::Pending(_)) {
            return false;
        }
        entry.generation = entry.generation.wrapping_add(1);
        entry.slot = Slot::Pending(Inner::start_fetch(
            &self.inner,
            key,
            descriptor.clone(),
            entry.generation,
        ));
        true
    }
}

/// A live interest in one query.
///
/// Holding a subscription keeps its entry from being evicted. Dropping it
/// does not cancel an in-flight fetch.
pub struct Subscription<C, T> {
    inner: Arc<Inner<C>>,
    key: CacheKey,
    descriptor: RequestDescriptor,
    _payload: PhantomData<fn() -> T>,
}

impl<C, T> fmt::Debug for Subscription<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<C, T: DeserializeOwned> Subscription<C, T> {
    /// Cache key of this query.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Descriptor of this query.
    #[must_use]
    pub const fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Current state without waiting.
    #[must_use]
    pub fn state(&self) -> QueryState<T> {
        match self.inner.snapshot(&self.key) {
            Some(Slot::Fulfilled(value)) => decode(&value),
            Some(Slot::Rejected(err)) => QueryState::Error(err),
            Some(Slot::Pending(_)) | None => QueryState::Loading,
        }
    }

    /// Waits until the query settles and returns its state.
    pub async fn wait(&self) -> QueryState<T> {
        match self.inner.snapshot(&self.key) {
            Some(Slot::Pending(in_flight)) => match in_flight.await {
                Ok(value) => decode(&value),
                Err(err) => QueryState::Error(err),
            },
            Some(Slot::Fulfilled(value)) => decode(&value),
            Some(Slot::Rejected(err)) => QueryState::Error(err),
            None => QueryState::Loading,
        }
    }
}

impl<C: TmdbApi + Send + Sync + 'static, T: DeserializeOwned> Subscription<C, T> {
    /// Starts a new generation for this query if it has settled.
    pub fn refetch(&self) -> bool {
        QueryCache {
            inner: Arc::clone(&self.inner),
        }
        .refetch(&self.descriptor)
    }
}

impl<C, T> Drop for Subscription<C, T> {
    fn drop(&mut self) {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                entry.released_at = Some(Instant::now());
            }
        }
    }
}

/// Decodes a cached payload into `T`.
fn decode<T: DeserializeOwned>(value: &Value) -> QueryState<T> {
    match T::deserialize(value) {
        Ok(data) => QueryState::Success(data),
        Err(err) => QueryState::Error(FetchError::new(
            anyhow::Error::new(err).context("unexpected response shape"),
        )),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use crate::store::{Category, Selection, UserSession};
    use crate::tmdb::{AccountList, MoviePage, Person, TmdbClient};

    fn cache_for(mock_server: &wiremock::MockServer, store: AppStore) -> QueryCache<TmdbClient> {
        cache_with_keep(mock_server, store, DEFAULT_KEEP_UNUSED_FOR)
    }

    fn cache_with_keep(
        mock_server: &wiremock::MockServer,
        store: AppStore,
        keep: Duration,
    ) -> QueryCache<TmdbClient> {
        let base_url = format!("{}/3/", mock_server.uri());
        let client = TmdbClient::builder()
            .base_url(base_url.parse().unwrap())
            .api_key("test-key")
            .user_agent("test/0.0.0")
            .build()
            .unwrap();
        QueryCache::with_keep_unused_for(Arc::new(client), store, keep)
    }

    async fn mount_popular(mock_server: &wiremock::MockServer, page: &str, calls: u64) {
        let json_body = include_str!("../../../../fixtures/tmdb/movie_popular_page1.json");
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/movie/popular"))
            .and(wiremock::matchers::query_param("page", page))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(json_body)
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(calls)
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_subscribers_share_one_request() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::movies(&Selection::Category(Category::Popular), 1);

        // Act
        let states = futures::future::join_all(
            (0..5).map(|_| cache.query::<MoviePage>(&descriptor)),
        )
        .await;

        // Assert (mock expect(1) verifies a single network call)
        assert_eq!(states.len(), 5);
        for state in states {
            let page = state.into_data().unwrap();
            assert_eq!(page.results[0].id, 550);
        }
    }

    #[tokio::test]
    async fn test_subscribers_attach_while_pending() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::movies(&Selection::NoSelection, 1);

        // Act
        let first = cache.subscribe::<MoviePage>(&descriptor);
        let second = cache.subscribe::<MoviePage>(&descriptor);

        // Assert
        assert!(first.state().is_loading());
        assert_eq!(cache.status(first.key()), Some(EntryStatus::Pending));
        assert_eq!(cache.subscribers(first.key()), 2);

        let (a, b) = futures::future::join(first.wait(), second.wait()).await;
        assert_eq!(a.into_data().unwrap().page, 1);
        assert_eq!(b.into_data().unwrap().page, 1);
        assert_eq!(cache.status(first.key()), Some(EntryStatus::Fulfilled));
    }

    #[tokio::test]
    async fn test_settled_entry_is_reused() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::movies(&Selection::NoSelection, 1);

        // Act
        let first = cache.query::<MoviePage>(&descriptor).await;
        let second = cache.subscribe::<MoviePage>(&descriptor);

        // Assert
        assert!(first.data().is_some());
        assert!(second.state().data().is_some());
    }

    #[tokio::test]
    async fn test_next_page_is_a_new_request() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        mount_popular(&mock_server, "2", 1).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let selection = Selection::Category(Category::Popular);

        // Act
        cache
            .query::<MoviePage>(&RequestDescriptor::movies(&selection, 1))
            .await;
        cache
            .query::<MoviePage>(&RequestDescriptor::movies(&selection, 2))
            .await;

        // Assert
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_rejects_entry() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("oops"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::person(287);

        // Act
        let subscription = cache.subscribe::<Person>(&descriptor);
        let state = subscription.wait().await;

        // Assert
        assert!(matches!(state, QueryState::Error(ref err) if err.to_string().contains("HTTP 500")));
        assert_eq!(cache.status(subscription.key()), Some(EntryStatus::Rejected));
        assert!(matches!(subscription.state(), QueryState::Error(_)));
    }

    #[tokio::test]
    async fn test_rejected_entry_is_retried_by_next_subscriber() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/person/287"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("oops"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        let json_body = include_str!("../../../../fixtures/tmdb/person_287.json");
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/3/person/287"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::person(287);

        // Act
        let first = cache.query::<Person>(&descriptor).await;
        let second = cache.query::<Person>(&descriptor).await;

        // Assert
        assert!(matches!(first, QueryState::Error(_)));
        assert_eq!(second.into_data().unwrap().id, 287);
        assert_eq!(cache.status(&descriptor.cache_key()), Some(EntryStatus::Fulfilled));
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_an_error() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(r#"{"id":"x"}"#))
            .mount(&mock_server)
            .await;
        let cache = cache_for(&mock_server, AppStore::default());

        // Act
        let state = cache
            .query::<Person>(&RequestDescriptor::person(287))
            .await;

        // Assert
        assert!(matches!(state, QueryState::Error(ref err) if err.to_string().contains("unexpected response shape")));
    }

    #[tokio::test]
    async fn test_refetch_starts_new_generation() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 2).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::movies(&Selection::NoSelection, 1);
        let subscription = cache.subscribe::<MoviePage>(&descriptor);

        // Act
        let pending_refetch = subscription.refetch();
        subscription.wait().await;
        let settled_refetch = subscription.refetch();
        let state = subscription.wait().await;

        // Assert (mock expect(2) verifies exactly one extra call)
        assert!(!pending_refetch);
        assert!(settled_refetch);
        assert!(state.data().is_some());
    }

    #[tokio::test]
    async fn test_account_list_without_session_is_rejected() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::account_list(42, AccountList::Favorite, 1);

        // Act
        let state = cache.query::<MoviePage>(&descriptor).await;

        // Assert
        assert!(matches!(state, QueryState::Error(ref err) if err.to_string().contains("not signed in")));
    }

    #[tokio::test]
    async fn test_account_list_reads_session_from_store() {
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
        let store = AppStore::new(Some(UserSession::new(42, "sess-1")));
        let cache = cache_for(&mock_server, store);
        let descriptor = RequestDescriptor::account_list(42, AccountList::Favorite, 1);

        // Act
        let state = cache.query::<MoviePage>(&descriptor).await;

        // Assert
        assert!(state.into_data().unwrap().contains(550));
    }

    #[tokio::test]
    async fn test_sweep_evicts_unused_settled_entries() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        let cache = cache_with_keep(&mock_server, AppStore::default(), Duration::ZERO);
        let descriptor = RequestDescriptor::movies(&Selection::NoSelection, 1);
        let subscription = cache.subscribe::<MoviePage>(&descriptor);
        subscription.wait().await;

        // Act
        let while_subscribed = cache.sweep();
        drop(subscription);
        let after_release = cache.sweep();

        // Assert
        assert_eq!(while_subscribed, 0);
        assert_eq!(after_release, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_fetch_still_settles() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        mount_popular(&mock_server, "1", 1).await;
        let cache = cache_for(&mock_server, AppStore::default());
        let descriptor = RequestDescriptor::movies(&Selection::NoSelection, 1);
        let key = descriptor.cache_key();

        // Act
        drop(cache.subscribe::<MoviePage>(&descriptor));
        tokio::time::timeout(Duration::from_secs(5), async {
            while cache.status(&key) == Some(EntryStatus::Pending) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Assert
        assert_eq!(cache.status(&key), Some(EntryStatus::Fulfilled));
        assert_eq!(cache.subscribers(&key), 0);
    }
}
