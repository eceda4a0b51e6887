//! moviedeck - terminal movie browser backed by TMDB.

/// Application configuration (TOML) and the stored session.
mod config;
/// Terminal UI components.
mod tui;

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{
    AppConfig, load_session, remove_session, resolve_config_path, resolve_log_path,
    resolve_session_path, save_session,
};
use crate::tui::run_browser;
use crate::tui::state::BrowserState;
use crate::tui::view;
use moviedeck_api::query::QueryCache;
use moviedeck_api::store::{
    AppStore, Category, GenreOrCategory, SelectionAction, SelectionState, UserSession,
};
use moviedeck_api::tmdb::{
    AccountList, MembershipToggle, MoviePage, TmdbApi, TmdbClient, ToggleOutcome,
};

/// Number of recommendations listed by `movie`.
const RECOMMENDATIONS_SHOWN: usize = 10;

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Browse movies interactively.
    Browse,
    /// List movies by category, genre or search term.
    Movies(MoviesArgs),
    /// Show details of a movie.
    Movie(MovieArgs),
    /// Show a person and the movies they appeared in.
    Actor(ActorArgs),
    /// List movie genres.
    Genres,
    /// List the signed-in user's favorites or watchlist.
    List(ListArgs),
    /// Add or remove a movie from favorites.
    Favorite(MembershipArgs),
    /// Add or remove a movie from the watchlist.
    Watchlist(MembershipArgs),
    /// Store a TMDB account and session ID.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Write a default config file.
    Init,
    /// Print shell completions.
    Completions(CompletionsArgs),
}

/// Arguments for the `movies` subcommand.
#[derive(clap::Args)]
struct MoviesArgs {
    /// Category (popular, top_rated, upcoming, now_playing).
    #[arg(long, value_parser = parse_category, conflicts_with_all = ["genre", "search"])]
    category: Option<Category>,

    /// Genre ID (see `moviedeck genres`).
    #[arg(long, conflicts_with = "search")]
    genre: Option<u32>,

    /// Search term.
    #[arg(long)]
    search: Option<String>,

    /// Result page (1-based).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
}

/// Arguments for the `movie` subcommand.
#[derive(clap::Args)]
struct MovieArgs {
    /// TMDB movie ID.
    #[arg(long)]
    id: u64,
}

/// Arguments for the `actor` subcommand.
#[derive(clap::Args)]
struct ActorArgs {
    /// TMDB person ID.
    #[arg(long)]
    id: u64,

    /// Page of the person's movies (1-based).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
}

/// Which account list to read or write.
#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    /// Favorite movies.
    Favorite,
    /// Watchlist.
    Watchlist,
}

impl From<ListKind> for AccountList {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Favorite => Self::Favorite,
            ListKind::Watchlist => Self::Watchlist,
        }
    }
}

/// Arguments for the `list` subcommand.
#[derive(clap::Args)]
struct ListArgs {
    /// List to show.
    #[arg(value_enum)]
    list: ListKind,

    /// Result page (1-based).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
}

/// Arguments for the `favorite` and `watchlist` subcommands.
#[derive(clap::Args)]
struct MembershipArgs {
    /// TMDB movie ID.
    #[arg(long)]
    id: u64,

    /// Remove instead of add.
    #[arg(long)]
    remove: bool,
}

/// Arguments for the `login` subcommand.
#[derive(clap::Args)]
struct LoginArgs {
    /// TMDB account ID.
    #[arg(long)]
    account_id: u64,

    /// TMDB v3 session ID.
    #[arg(long)]
    session_id: String,
}

/// Arguments for the `completions` subcommand.
#[derive(clap::Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: clap_complete::Shell,
}

/// Parses a `--category` value.
fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|err| err.to_string())
}

/// Loads the config file from the config directory.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the file is invalid.
fn load_config(dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_config_path(dir)?;
    AppConfig::load(&config_path)
}

/// Loads the stored session, failing when none exists.
///
/// # Errors
///
/// Returns an error if no session is stored or the session file is invalid.
fn require_session(dir: Option<&Path>) -> Result<UserSession> {
    let session_path = resolve_session_path(dir)?;
    load_session(&session_path)?.context("not signed in - run `moviedeck login` first")
}

/// Builds a TMDB client from environment variables and config.
///
/// # Errors
///
/// Returns an error if `TMDB_API_KEY` is not set or the client fails to build.
fn build_tmdb_client(config: &AppConfig) -> Result<TmdbClient> {
    let api_key =
        std::env::var("TMDB_API_KEY").context("TMDB_API_KEY environment variable is required")?;

    TmdbClient::builder()
        .base_url(config.tmdb.parsed_base_url()?)
        .api_key(api_key)
        .language(&config.tmdb.language)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .context("failed to build TMDB client")
}

/// Builds a TMDB client from the config in `dir`.
///
/// # Errors
///
/// Returns an error if the config is invalid or `TMDB_API_KEY` is not set.
fn build_client(dir: Option<&Path>) -> Result<TmdbClient> {
    let config = load_config(dir)?;
    build_tmdb_client(&config)
}

/// Builds the store and query cache for one run.
///
/// # Errors
///
/// Returns an error if the config, session or client cannot be loaded.
fn build_cache(dir: Option<&Path>) -> Result<(Arc<TmdbClient>, QueryCache<TmdbClient>)> {
    let config = load_config(dir)?;
    let session = load_session(&resolve_session_path(dir)?)?;
    let client = Arc::new(build_tmdb_client(&config)?);
    let store = AppStore::new(session);
    let keep_unused_for = config.cache.keep_unused_for();
    let cache = QueryCache::with_keep_unused_for(Arc::clone(&client), store, keep_unused_for);
    Ok((client, cache))
}

/// Logs one page of movies as a table.
fn log_movie_page(page: &MoviePage) {
    if page.results.is_empty() {
        tracing::info!("{}", view::NO_MOVIES);
        return;
    }
    tracing::info!("Page: {}", view::page_indicator(page.page, page.total_pages));
    tracing::info!("ID\tRating\tTitle");
    for movie in &page.results {
        tracing::info!(
            "{}\t{:.1}\t{}",
            movie.id,
            movie.vote_average,
            view::movie_line(movie)
        );
    }
}

/// Runs the `browse` subcommand.
///
/// # Errors
///
/// Returns an error if setup fails or the terminal cannot be driven.
#[instrument(skip_all)]
async fn run_browse(dir: Option<&Path>) -> Result<()> {
    let (client, cache) = build_cache(dir)?;
    let store = cache.store().clone();
    tracing::info!(signed_in = store.session().is_some(), "starting browser");
    run_browser(BrowserState::new(cache, client, store)).await
}

/// Runs the `movies` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the request fails.
#[instrument(skip_all)]
async fn run_movies(args: &MoviesArgs, dir: Option<&Path>) -> Result<()> {
    let client = build_client(dir)?;

    let action = if let Some(category) = args.category {
        Some(SelectionAction::SelectGenreOrCategory(
            GenreOrCategory::Category(category),
        ))
    } else if let Some(genre) = args.genre {
        Some(SelectionAction::SelectGenreOrCategory(
            GenreOrCategory::Genre(genre),
        ))
    } else {
        args.search.clone().map(SelectionAction::SetSearchQuery)
    };
    let selection = action
        .into_iter()
        .fold(SelectionState::default(), SelectionState::reduce)
        .selection();
    tracing::info!("{}", selection.label());

    let page = client
        .movies(&selection, args.page)
        .await
        .context("TMDB movie list request failed")?;
    log_movie_page(&page);

    Ok(())
}

/// Runs the `movie` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the details request fails.
#[instrument(skip_all)]
async fn run_movie(args: &MovieArgs, dir: Option<&Path>) -> Result<()> {
    let client = build_client(dir)?;
    let session = load_session(&resolve_session_path(dir)?)?;

    let (details, recommendations) = futures::join!(
        client.movie_details(args.id),
        client.recommendations(args.id, 1),
    );
    let details = details.context("TMDB movie details request failed")?;

    tracing::info!("{}", view::title_line(&details));
    if let Some(tagline) = details.tagline.as_deref().filter(|t| !t.is_empty()) {
        tracing::info!("{tagline}");
    }
    tracing::info!("Rating: {}", view::rating_line(details.vote_average));
    tracing::info!("{}", view::runtime_language_line(&details));
    let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();
    tracing::info!("Genres: {}", genres.join(", "));
    if let Some(overview) = details.overview.as_deref() {
        tracing::info!("{overview}");
    }
    if let Some(imdb_id) = details.imdb_id.as_deref() {
        tracing::info!("IMDB: {}", view::imdb_title_url(imdb_id));
    }
    if let Some(homepage) = details.homepage.as_deref().filter(|h| !h.is_empty()) {
        tracing::info!("Homepage: {homepage}");
    }
    if let Some(trailer) = view::trailer_url(&details) {
        tracing::info!("Trailer: {trailer}");
    }

    tracing::info!("Cast:");
    let cast = details.credits.as_ref().map_or(&[][..], |c| c.cast.as_slice());
    for member in view::top_cast(cast) {
        tracing::info!(
            "{}\t{} as {}",
            member.id,
            member.name,
            member.character.as_deref().unwrap_or("-")
        );
    }

    if let Some(session) = session {
        for list in [AccountList::Favorite, AccountList::Watchlist] {
            let member = match client.account_list(&session, list, 1).await {
                Ok(page) => MembershipToggle::from_page(list, args.id, &page).is_member(),
                Err(err) => {
                    tracing::warn!("{} unavailable: {err:#}", list.as_str());
                    false
                }
            };
            tracing::info!("{}: {}", list.as_str(), if member { "yes" } else { "no" });
        }
    }

    tracing::info!("Recommendations:");
    match recommendations {
        Ok(page) if page.results.is_empty() => tracing::info!("{}", view::NOTHING_FOUND),
        Ok(page) => {
            for movie in page.results.iter().take(RECOMMENDATIONS_SHOWN) {
                tracing::info!("{}\t{}", movie.id, view::movie_line(movie));
            }
        }
        Err(err) => tracing::warn!("recommendations unavailable: {err:#}"),
    }

    Ok(())
}

/// Runs the `actor` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the person request fails.
#[instrument(skip_all)]
async fn run_actor(args: &ActorArgs, dir: Option<&Path>) -> Result<()> {
    let client = build_client(dir)?;

    let (person, movies) = futures::join!(
        client.person(args.id),
        client.person_movies(args.id, args.page),
    );
    let person = person.context("TMDB person request failed")?;

    tracing::info!("{}", person.name);
    tracing::info!("{}", view::born_line(&person));
    if let Some(place) = person.place_of_birth.as_deref() {
        tracing::info!("Place of birth: {place}");
    }
    if let Some(imdb_id) = person.imdb_id.as_deref() {
        tracing::info!("IMDB: {}", view::imdb_name_url(imdb_id));
    }
    tracing::info!("{}", view::biography(&person));

    let movies = movies.context("TMDB person movies request failed")?;
    log_movie_page(&movies);

    Ok(())
}

/// Runs the `genres` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the request fails.
#[instrument(skip_all)]
async fn run_genres(dir: Option<&Path>) -> Result<()> {
    let client = build_client(dir)?;

    let genres = client
        .genres()
        .await
        .context("TMDB genre list request failed")?;

    tracing::info!("ID\tName");
    for genre in &genres.genres {
        tracing::info!("{}\t{}", genre.id, genre.name);
    }
    for category in Category::ALL {
        tracing::info!("{}\t{}", category.as_str(), category.label());
    }

    Ok(())
}

/// Runs the `list` subcommand.
///
/// # Errors
///
/// Returns an error if no session is stored or the request fails.
#[instrument(skip_all)]
async fn run_list(args: &ListArgs, dir: Option<&Path>) -> Result<()> {
    let session = require_session(dir)?;
    let client = build_client(dir)?;
    let list = AccountList::from(args.list);

    let page = client
        .account_list(&session, list, args.page)
        .await
        .with_context(|| format!("TMDB {} request failed", list.as_str()))?;
    log_movie_page(&page);

    Ok(())
}

/// Runs the `favorite` and `watchlist` subcommands.
///
/// # Errors
///
/// Returns an error if no session is stored or the write fails.
#[instrument(skip_all, fields(list = list.as_str()))]
async fn run_membership(
    list: AccountList,
    args: &MembershipArgs,
    dir: Option<&Path>,
) -> Result<()> {
    let session = require_session(dir)?;
    let client = build_client(dir)?;

    // The toggle flips this flag, so start from the opposite of the target.
    let mut toggle = MembershipToggle::new(list, args.id, args.remove);
    match toggle.toggle(&client, &session).await {
        ToggleOutcome::Applied(true) => {
            tracing::info!("Added {} to {}", args.id, list.as_str());
        }
        ToggleOutcome::Applied(false) => {
            tracing::info!("Removed {} from {}", args.id, list.as_str());
        }
        ToggleOutcome::Reverted { message } => bail!(message),
    }

    Ok(())
}

/// Runs the `login` subcommand.
///
/// # Errors
///
/// Returns an error if the session file cannot be written.
fn run_login(args: &LoginArgs, dir: Option<&Path>) -> Result<()> {
    let session_path = resolve_session_path(dir)?;
    let session = UserSession::new(args.account_id, args.session_id.clone());
    save_session(&session_path, &session)?;
    tracing::info!(
        "Signed in as account {} (session stored in {})",
        session.account_id,
        session_path.display()
    );
    Ok(())
}

/// Runs the `logout` subcommand.
///
/// # Errors
///
/// Returns an error if the session file cannot be removed.
fn run_logout(dir: Option<&Path>) -> Result<()> {
    let session_path = resolve_session_path(dir)?;
    if remove_session(&session_path)? {
        tracing::info!("Signed out");
    } else {
        tracing::info!("Not signed in");
    }
    Ok(())
}

/// Runs the `init` subcommand.
///
/// # Errors
///
/// Returns an error if the config file cannot be written.
fn run_init(dir: Option<&Path>) -> Result<()> {
    let config_path = resolve_config_path(dir)?;
    if config_path.exists() {
        tracing::info!("Config already exists: {}", config_path.display());
        return Ok(());
    }
    AppConfig::default().save(&config_path)?;
    tracing::info!("Wrote {}", config_path.display());
    Ok(())
}

/// Opens the browser log file, creating its directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
fn open_log_file(dir: Option<&Path>) -> Result<File> {
    let log_path = resolve_log_path(dir)?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))
}

/// Installs the tracing subscriber.
///
/// Logs go to `log_file` when given (the browser owns the terminal),
/// otherwise to stdout.
fn init_tracing(log_file: Option<File>) {
    let ansi = log_file.is_none();
    let writer = log_file.map_or_else(
        || BoxMakeWriter::new(io::stdout),
        |file| BoxMakeWriter::new(Mutex::new(file)),
    );

    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dir = cli.dir.as_deref();

    let log_file = if matches!(cli.command, Commands::Browse) {
        Some(open_log_file(dir)?)
    } else {
        None
    };
    init_tracing(log_file);

    match &cli.command {
        Commands::Browse => run_browse(dir).await,
        Commands::Movies(args) => run_movies(args, dir).await,
        Commands::Movie(args) => run_movie(args, dir).await,
        Commands::Actor(args) => run_actor(args, dir).await,
        Commands::Genres => run_genres(dir).await,
        Commands::List(args) => run_list(args, dir).await,
        Commands::Favorite(args) => run_membership(AccountList::Favorite, args, dir).await,
        Commands::Watchlist(args) => run_membership(AccountList::Watchlist, args, dir).await,
        Commands::Login(args) => run_login(args, dir),
        Commands::Logout => run_logout(dir),
        Commands::Init => run_init(dir),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            clap_complete::generate(args.shell, &mut command, "moviedeck", &mut io::stdout());
            Ok(())
        }
    }
}
