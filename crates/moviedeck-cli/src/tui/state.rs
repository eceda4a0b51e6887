//! Browser state: screen stack, per-screen queries and write bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};

use super::view::{self, ListView};
use moviedeck_api::query::{QueryCache, QueryState, Subscription};
use moviedeck_api::store::{
    AppStore, Category, GenreOrCategory, Selection, SelectionAction, SelectionState,
};
use moviedeck_api::tmdb::{
    AccountList, Credits, GenreList, MembershipToggle, MovieDetails, MoviePage, Person,
    RequestDescriptor, TmdbApi, TmdbClient, ToggleOutcome,
};

/// Notification shown when a write needs a session.
pub const SIGN_IN_HINT: &str = "Not signed in - run `moviedeck login` to manage your lists";

/// A query subscription plus the last state the screen saw.
///
/// Once settled the decoded payload is kept, so rendering does not decode
/// on every frame.
#[derive(Debug)]
pub struct Tracked<T> {
    subscription: Subscription<TmdbClient, T>,
    state: QueryState<T>,
}

impl<T: DeserializeOwned> Tracked<T> {
    /// Subscribes to `descriptor`.
    fn new(cache: &QueryCache<TmdbClient>, descriptor: &RequestDescriptor) -> Self {
        let subscription = cache.subscribe::<T>(descriptor);
        let state = subscription.state();
        Self {
            subscription,
            state,
        }
    }

    /// Picks up the settled state. Returns `true` if it changed.
    fn poll(&mut self) -> bool {
        if !self.state.is_loading() {
            return false;
        }
        self.state = self.subscription.state();
        !self.state.is_loading()
    }

    /// Re-fetches a settled query.
    fn refetch(&mut self) {
        if self.subscription.refetch() {
            self.state = QueryState::Loading;
        }
    }

    /// Last seen state.
    #[must_use]
    pub const fn state(&self) -> &QueryState<T> {
        &self.state
    }
}

/// Input mode for the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode.
    Normal,
    /// Search text input mode.
    Search,
    /// Genre/category picker is open.
    GenrePicker,
}

/// Focused section of the movie detail screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailFocus {
    /// Genre links.
    Genres,
    /// Top cast.
    Cast,
    /// Recommendations.
    Recommendations,
}

impl DetailFocus {
    /// Next section in tab order.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Genres => Self::Cast,
            Self::Cast => Self::Recommendations,
            Self::Recommendations => Self::Genres,
        }
    }
}

/// Movie list screen.
#[derive(Debug)]
pub struct MoviesScreen {
    /// Selection the list was built for.
    pub selection: Selection,
    /// Requested page.
    pub page: u32,
    /// Cursor over the page's results (0 = featured movie).
    pub cursor: usize,
    /// Page query.
    pub list: Tracked<MoviePage>,
}

impl MoviesScreen {
    fn new(cache: &QueryCache<TmdbClient>, selection: Selection, page: u32) -> Self {
        let list = Tracked::new(cache, &RequestDescriptor::movies(&selection, page));
        Self {
            selection,
            page,
            cursor: 0,
            list,
        }
    }

    /// Number of results on the loaded page.
    fn len(&self) -> usize {
        self.list.state().data().map_or(0, |page| page.results.len())
    }

    /// Movie ID under the cursor.
    fn selected_movie(&self) -> Option<u64> {
        let page = self.list.state().data()?;
        page.results.get(self.cursor).map(|movie| movie.id)
    }
}

/// Movie detail screen.
#[derive(Debug)]
pub struct DetailScreen {
    /// TMDB movie ID.
    pub movie_id: u64,
    /// Details with videos appended.
    pub details: Tracked<MovieDetails>,
    /// Cast.
    pub cast: Tracked<Credits>,
    /// Recommendations (first page).
    pub recommendations: Tracked<MoviePage>,
    /// Signed-in user's favorites, used to seed the favorite flag.
    favorites: Option<Tracked<MoviePage>>,
    /// Signed-in user's watchlist, used to seed the watchlist flag.
    watchlist: Option<Tracked<MoviePage>>,
    /// Favorite flag, once seeded.
    pub favorite: Option<MembershipToggle>,
    /// Watchlist flag, once seeded.
    pub watchlisted: Option<MembershipToggle>,
    /// Lists with a write in flight.
    pending: HashSet<AccountList>,
    /// Focused section.
    pub focus: DetailFocus,
    /// Cursor within the focused section.
    pub cursor: usize,
}

impl DetailScreen {
    fn new(cache: &QueryCache<TmdbClient>, store: &AppStore, movie_id: u64) -> Self {
        let session = store.session();
        let account_list = |list| {
            session.as_ref().map(|s| {
                Tracked::new(
                    cache,
                    &RequestDescriptor::account_list(s.account_id, list, 1),
                )
            })
        };
        Self {
            movie_id,
            details: Tracked::new(cache, &RequestDescriptor::movie_details(movie_id)),
            cast: Tracked::new(cache, &RequestDescriptor::movie_credits(movie_id)),
            recommendations: Tracked::new(cache, &RequestDescriptor::recommendations(movie_id, 1)),
            favorites: account_list(AccountList::Favorite),
            watchlist: account_list(AccountList::Watchlist),
            favorite: None,
            watchlisted: None,
            pending: HashSet::new(),
            focus: DetailFocus::Cast,
            cursor: 0,
        }
    }

    /// Seeds a membership flag from its list once the list has settled.
    ///
    /// A failed list read seeds "not a member".
    fn seed(
        slot: &mut Option<MembershipToggle>,
        source: Option<&Tracked<MoviePage>>,
        list: AccountList,
        movie_id: u64,
    ) {
        if slot.is_some() {
            return;
        }
        let Some(source) = source else {
            return;
        };
        *slot = match source.state() {
            QueryState::Loading => None,
            QueryState::Success(page) => Some(MembershipToggle::from_page(list, movie_id, page)),
            QueryState::Error(_) => Some(MembershipToggle::new(list, movie_id, false)),
        };
    }

    fn poll(&mut self) {
        self.details.poll();
        self.cast.poll();
        self.recommendations.poll();
        if let Some(favorites) = self.favorites.as_mut() {
            favorites.poll();
        }
        if let Some(watchlist) = self.watchlist.as_mut() {
            watchlist.poll();
        }
        Self::seed(
            &mut self.favorite,
            self.favorites.as_ref(),
            AccountList::Favorite,
            self.movie_id,
        );
        Self::seed(
            &mut self.watchlisted,
            self.watchlist.as_ref(),
            AccountList::Watchlist,
            self.movie_id,
        );
    }

    fn refetch(&mut self) {
        self.details.refetch();
        self.cast.refetch();
        self.recommendations.refetch();
    }

    /// Membership flag of `list`, if seeded.
    #[must_use]
    pub const fn toggle(&self, list: AccountList) -> Option<&MembershipToggle> {
        match list {
            AccountList::Favorite => self.favorite.as_ref(),
            AccountList::Watchlist => self.watchlisted.as_ref(),
        }
    }

    const fn toggle_mut(&mut self, list: AccountList) -> Option<&mut MembershipToggle> {
        match list {
            AccountList::Favorite => self.favorite.as_mut(),
            AccountList::Watchlist => self.watchlisted.as_mut(),
        }
    }

    /// Returns `true` while a write to `list` is in flight.
    #[must_use]
    pub fn is_pending(&self, list: AccountList) -> bool {
        self.pending.contains(&list)
    }

    /// Number of entries in the focused section.
    fn focus_len(&self) -> usize {
        match self.focus {
            DetailFocus::Genres => self
                .details
                .state()
                .data()
                .map_or(0, |details| details.genres.len()),
            DetailFocus::Cast => self
                .cast
                .state()
                .data()
                .map_or(0, |credits| view::top_cast(&credits.cast).len()),
            DetailFocus::Recommendations => self
                .recommendations
                .state()
                .data()
                .map_or(0, |page| page.results.len()),
        }
    }
}

/// Actor screen.
#[derive(Debug)]
pub struct ActorScreen {
    /// TMDB person ID.
    pub person_id: u64,
    /// Movies page.
    pub page: u32,
    /// Cursor over the movies.
    pub cursor: usize,
    /// Person details.
    pub person: Tracked<Person>,
    /// Movies the person appears in.
    pub movies: Tracked<MoviePage>,
}

impl ActorScreen {
    fn new(cache: &QueryCache<TmdbClient>, person_id: u64, page: u32) -> Self {
        Self {
            person_id,
            page,
            cursor: 0,
            person: Tracked::new(cache, &RequestDescriptor::person(person_id)),
            movies: Tracked::new(cache, &RequestDescriptor::person_movies(person_id, page)),
        }
    }
}

/// One entry of the navigation stack.
#[derive(Debug)]
pub enum Screen {
    /// Movie list.
    Movies(MoviesScreen),
    /// Movie detail.
    Detail(Box<DetailScreen>),
    /// Actor.
    Actor(ActorScreen),
}

/// Genre/category picker overlay.
#[derive(Debug)]
pub struct GenrePicker {
    /// Genre list query.
    pub genres: Tracked<GenreList>,
    /// Cursor over categories followed by genres.
    pub cursor: usize,
}

impl GenrePicker {
    /// Picker entries: the four categories, then the genres.
    #[must_use]
    pub fn entries(&self) -> Vec<(GenreOrCategory, String)> {
        let categories = Category::ALL
            .iter()
            .map(|&c| (GenreOrCategory::Category(c), String::from(c.label())));
        let genres = self
            .genres
            .state()
            .data()
            .into_iter()
            .flat_map(|list| list.genres.iter())
            .map(|g| (GenreOrCategory::Genre(g.id), g.name.clone()));
        categories.chain(genres).collect()
    }
}

/// Result of a membership write, reported back by the task that sent it.
#[derive(Debug)]
struct WriteReport {
    movie_id: u64,
    list: AccountList,
    result: anyhow::Result<()>,
}

/// Links the detail and actor screens can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// IMDB page.
    Imdb,
    /// Movie homepage.
    Homepage,
    /// First YouTube trailer.
    Trailer,
}

/// Whole browser state.
#[derive(Debug)]
pub struct BrowserState {
    cache: QueryCache<TmdbClient>,
    client: Arc<TmdbClient>,
    store: AppStore,
    selection_rx: watch::Receiver<SelectionState>,
    /// Navigation stack; the movie list is always at the bottom.
    stack: Vec<Screen>,
    /// Current input mode.
    pub input_mode: InputMode,
    /// Search text being typed.
    pub search_input: String,
    /// Open genre picker.
    pub genre_picker: Option<GenrePicker>,
    /// Non-fatal message for the footer.
    pub notification: Option<String>,
    writes_tx: mpsc::UnboundedSender<WriteReport>,
    writes_rx: mpsc::UnboundedReceiver<WriteReport>,
}

impl BrowserState {
    /// Creates the browser at the movie list for the store's selection.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(cache: QueryCache<TmdbClient>, client: Arc<TmdbClient>, store: AppStore) -> Self {
        let mut selection_rx = store.watch_selection();
        let selection = selection_rx.borrow_and_update().selection();
        let root = Screen::Movies(MoviesScreen::new(&cache, selection, 1));
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        Self {
            cache,
            client,
            store,
            selection_rx,
            stack: vec![root],
            input_mode: InputMode::Normal,
            search_input: String::new(),
            genre_picker: None,
            notification: None,
            writes_tx,
            writes_rx,
        }
    }

    /// Store shared with the rest of the application.
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// Screen on top of the stack.
    #[must_use]
    pub fn top(&self) -> Option<&Screen> {
        self.stack.last()
    }

    /// Number of screens on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Applies settled queries, write results and selection changes.
    pub fn tick(&mut self) {
        while let Ok(report) = self.writes_rx.try_recv() {
            self.apply_write(report);
        }

        if self.selection_rx.has_changed().unwrap_or(false) {
            let selection = self.selection_rx.borrow_and_update().selection();
            tracing::debug!(?selection, "selection changed, rebuilding movie list");
            if let Some(Screen::Movies(root)) = self.stack.first_mut() {
                *root = MoviesScreen::new(&self.cache, selection, 1);
            }
        }

        if let Some(picker) = self.genre_picker.as_mut() {
            picker.genres.poll();
        }

        match self.stack.last_mut() {
            Some(Screen::Movies(screen)) => {
                screen.list.poll();
            }
            Some(Screen::Detail(screen)) => screen.poll(),
            Some(Screen::Actor(screen)) => {
                screen.person.poll();
                screen.movies.poll();
            }
            None => {}
        }
    }

    /// Pops the top screen. The movie list is never popped.
    pub fn pop(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    /// Leaves the top screen, or retries the movie list if it failed at
    /// the bottom of the stack. Returns `false` when there is nothing to do.
    pub fn back(&mut self) -> bool {
        if self.pop() {
            return true;
        }
        match self.stack.first_mut() {
            Some(Screen::Movies(root)) if matches!(root.list.state(), QueryState::Error(_)) => {
                tracing::debug!(selection = ?root.selection, "retrying failed movie list");
                root.list.refetch();
                true
            }
            _ => false,
        }
    }

    /// Shows a non-fatal message in the footer.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(message.into());
    }

    /// Moves the cursor up.
    pub fn move_up(&mut self) {
        match self.stack.last_mut() {
            Some(Screen::Movies(s)) => s.cursor = s.cursor.saturating_sub(1),
            Some(Screen::Detail(s)) => s.cursor = s.cursor.saturating_sub(1),
            Some(Screen::Actor(s)) => s.cursor = s.cursor.saturating_sub(1),
            None => {}
        }
    }

    /// Moves the cursor down.
    pub fn move_down(&mut self) {
        let (cursor, len) = match self.stack.last_mut() {
            Some(Screen::Movies(s)) => {
                let len = s.len();
                (&mut s.cursor, len)
            }
            Some(Screen::Detail(s)) => {
                let len = s.focus_len();
                (&mut s.cursor, len)
            }
            Some(Screen::Actor(s)) => {
                let len = s.movies.state().data().map_or(0, |p| p.results.len());
                (&mut s.cursor, len)
            }
            None => return,
        };
        if cursor.saturating_add(1) < len {
            *cursor = cursor.saturating_add(1);
        }
    }

    /// Cycles the focused section of the detail screen.
    pub fn cycle_focus(&mut self) {
        if let Some(Screen::Detail(s)) = self.stack.last_mut() {
            s.focus = s.focus.next();
            s.cursor = 0;
        }
    }

    /// Goes to the next page of the current list, if there is one.
    pub fn next_page(&mut self) {
        self.change_page(true);
    }

    /// Goes to the previous page of the current list, if there is one.
    pub fn prev_page(&mut self) {
        self.change_page(false);
    }

    fn change_page(&mut self, forward: bool) {
        let cache = &self.cache;
        match self.stack.last_mut() {
            Some(Screen::Movies(s)) => {
                let total = s.list.state().data().map_or(0, |p| p.total_pages);
                let target = if forward {
                    view::next_page(s.page, total)
                } else {
                    view::prev_page(s.page)
                };
                if let Some(page) = target {
                    *s = MoviesScreen::new(cache, s.selection.clone(), page);
                }
            }
            Some(Screen::Actor(s)) => {
                let total = s.movies.state().data().map_or(0, |p| p.total_pages);
                let target = if forward {
                    view::next_page(s.page, total)
                } else {
                    view::prev_page(s.page)
                };
                if let Some(page) = target {
                    s.page = page;
                    s.cursor = 0;
                    s.movies =
                        Tracked::new(cache, &RequestDescriptor::person_movies(s.person_id, page));
                }
            }
            Some(Screen::Detail(_)) | None => {}
        }
    }

    /// Switches the movie list to the next category.
    pub fn cycle_category(&mut self) {
        let next = match self.store.selection() {
            Selection::Category(c) => c.next(),
            Selection::NoSelection | Selection::Genre(_) | Selection::Search(_) => {
                Category::Popular
            }
        };
        self.select(GenreOrCategory::Category(next));
    }

    /// Selects a genre or category and returns to the movie list.
    pub fn select(&mut self, choice: GenreOrCategory) {
        self.store
            .dispatch_selection(SelectionAction::SelectGenreOrCategory(choice));
        self.stack.truncate(1);
    }

    /// Opens the genre/category picker.
    pub fn open_genre_picker(&mut self) {
        self.genre_picker = Some(GenrePicker {
            genres: Tracked::new(&self.cache, &RequestDescriptor::genres()),
            cursor: 0,
        });
        self.input_mode = InputMode::GenrePicker;
    }

    /// Moves the picker cursor by one entry.
    pub fn picker_move(&mut self, down: bool) {
        if let Some(picker) = self.genre_picker.as_mut() {
            let len = picker.entries().len();
            picker.cursor = if down {
                picker
                    .cursor
                    .saturating_add(1)
                    .min(len.saturating_sub(1))
            } else {
                picker.cursor.saturating_sub(1)
            };
        }
    }

    /// Applies the picker entry under the cursor.
    pub fn confirm_genre_picker(&mut self) {
        let choice = self
            .genre_picker
            .take()
            .and_then(|picker| picker.entries().into_iter().nth(picker.cursor))
            .map(|(choice, _)| choice);
        self.input_mode = InputMode::Normal;
        if let Some(choice) = choice {
            self.select(choice);
        }
    }

    /// Closes the picker without selecting.
    pub fn close_genre_picker(&mut self) {
        self.genre_picker = None;
        self.input_mode = InputMode::Normal;
    }

    /// Starts typing a search query.
    pub fn begin_search(&mut self) {
        self.search_input.clear();
        self.input_mode = InputMode::Search;
    }

    /// Submits the typed search query and returns to the movie list.
    pub fn submit_search(&mut self) {
        let query = std::mem::take(&mut self.search_input);
        self.input_mode = InputMode::Normal;
        self.store
            .dispatch_selection(SelectionAction::SetSearchQuery(query));
        self.stack.truncate(1);
    }

    /// Abandons the typed search query.
    pub fn cancel_search(&mut self) {
        self.search_input.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Acts on the entry under the cursor.
    pub fn activate(&mut self) {
        enum Next {
            Detail(u64),
            Actor(u64),
            Select(GenreOrCategory),
        }

        let next = match self.stack.last() {
            Some(Screen::Movies(s)) => s.selected_movie().map(Next::Detail),
            Some(Screen::Detail(s)) => match s.focus {
                DetailFocus::Genres => s
                    .details
                    .state()
                    .data()
                    .and_then(|d| d.genres.get(s.cursor))
                    .map(|g| Next::Select(GenreOrCategory::Genre(g.id))),
                DetailFocus::Cast => s
                    .cast
                    .state()
                    .data()
                    .and_then(|c| view::top_cast(&c.cast).get(s.cursor).map(|m| m.id))
                    .map(Next::Actor),
                DetailFocus::Recommendations => s
                    .recommendations
                    .state()
                    .data()
                    .and_then(|p| p.results.get(s.cursor))
                    .map(|m| Next::Detail(m.id)),
            },
            Some(Screen::Actor(s)) => s
                .movies
                .state()
                .data()
                .and_then(|p| p.results.get(s.cursor))
                .map(|m| Next::Detail(m.id)),
            None => None,
        };

        match next {
            Some(Next::Detail(movie_id)) => {
                let screen = DetailScreen::new(&self.cache, &self.store, movie_id);
                self.stack.push(Screen::Detail(Box::new(screen)));
            }
            Some(Next::Actor(person_id)) => {
                let screen = ActorScreen::new(&self.cache, person_id, 1);
                self.stack.push(Screen::Actor(screen));
            }
            Some(Next::Select(choice)) => self.select(choice),
            None => {}
        }
    }

    /// Re-fetches the queries of the top screen.
    pub fn refresh(&mut self) {
        match self.stack.last_mut() {
            Some(Screen::Movies(s)) => s.list.refetch(),
            Some(Screen::Detail(s)) => s.refetch(),
            Some(Screen::Actor(s)) => {
                s.person.refetch();
                s.movies.refetch();
            }
            None => {}
        }
    }

    /// URL of a link on the top screen, if it has one.
    #[must_use]
    pub fn link(&self, kind: LinkKind) -> Option<String> {
        match (self.stack.last()?, kind) {
            (Screen::Detail(s), LinkKind::Imdb) => {
                let details = s.details.state().data()?;
                details.imdb_id.as_deref().map(view::imdb_title_url)
            }
            (Screen::Detail(s), LinkKind::Homepage) => s
                .details
                .state()
                .data()?
                .homepage
                .clone()
                .filter(|url| !url.is_empty()),
            (Screen::Detail(s), LinkKind::Trailer) => view::trailer_url(s.details.state().data()?),
            (Screen::Actor(s), LinkKind::Imdb) => {
                let person = s.person.state().data()?;
                person.imdb_id.as_deref().map(view::imdb_name_url)
            }
            _ => None,
        }
    }

    /// Optimistically toggles the detail screen's movie in `list` and sends
    /// the write in the background.
    pub fn toggle_membership(&mut self, list: AccountList) {
        let Some(session) = self.store.session() else {
            self.notify(SIGN_IN_HINT);
            return;
        };
        let Some(Screen::Detail(screen)) = self.stack.last_mut() else {
            return;
        };
        if screen.is_pending(list) {
            self.notify(format!("Still updating {}", list.as_str()));
            return;
        }
        let Some(toggle) = screen.toggle_mut(list) else {
            self.notify(format!("Still loading your {}", list.as_str()));
            return;
        };

        let member = toggle.begin();
        let movie_id = toggle.movie_id();
        screen.pending.insert(list);

        let client = Arc::clone(&self.client);
        let tx = self.writes_tx.clone();
        tokio::spawn(async move {
            let result = client
                .set_list_membership(&session, list, movie_id, member)
                .await
                .map(|_| ());
            let report = WriteReport {
                movie_id,
                list,
                result,
            };
            if tx.send(report).is_err() {
                tracing::debug!(
                    movie_id,
                    list = list.as_str(),
                    "browser closed before write settled"
                );
            }
        });
    }

    /// Settles a finished write on the screen that started it.
    fn apply_write(&mut self, report: WriteReport) {
        let WriteReport {
            movie_id,
            list,
            result,
        } = report;
        let screen = self.stack.iter_mut().find_map(|screen| match screen {
            Screen::Detail(s) if s.movie_id == movie_id && s.pending.contains(&list) => Some(s),
            Screen::Movies(_) | Screen::Detail(_) | Screen::Actor(_) => None,
        });
        let Some(screen) = screen else {
            tracing::debug!(
                movie_id,
                list = list.as_str(),
                "write settled after its screen closed"
            );
            return;
        };
        screen.pending.remove(&list);
        let Some(toggle) = screen.toggle_mut(list) else {
            return;
        };
        let message = match toggle.finish(result) {
            ToggleOutcome::Applied(true) => format!("Added to {}", list.as_str()),
            ToggleOutcome::Applied(false) => format!("Removed from {}", list.as_str()),
            ToggleOutcome::Reverted { message } => message,
        };
        self.notify(message);
    }

    /// List view of the root movie screen.
    #[must_use]
    pub fn movies_view(&self) -> Option<ListView<'_>> {
        match self.stack.first()? {
            Screen::Movies(s) => Some(view::list_view(s.list.state())),
            Screen::Detail(_) | Screen::Actor(_) => None,
        }
    }
}
