//! Interactive movie browser.
//!
//! Uses `ratatui` + `crossterm` for rendering. The event loop runs on the
//! current-thread runtime and yields between frames so spawned fetches make
//! progress.

/// Browser state types.
pub mod state;
mod ui;
/// View models shared with the one-shot subcommands.
pub mod view;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use self::state::{BrowserState, InputMode, LinkKind};
use moviedeck_api::tmdb::AccountList;

/// Pause between frames when no input is pending.
const FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Runs the browser until the user quits.
///
/// # Errors
///
/// Returns an error if terminal setup or event handling fails.
pub async fn run_browser(mut state: BrowserState) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    let result = run_event_loop(&mut terminal, &mut state).await;

    // Cleanup (always attempt even if event loop failed)
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(io::stdout(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;

    result
}

/// Main event loop.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut BrowserState,
) -> Result<()> {
    loop {
        state.tick();
        terminal
            .draw(|frame| ui::draw(frame, state))
            .context("failed to draw TUI")?;

        if event::poll(Duration::ZERO).context("failed to poll events")? {
            if let Event::Key(key) = event::read().context("failed to read event")?
                && key.kind == KeyEventKind::Press
            {
                let quit = match state.input_mode {
                    InputMode::Search => {
                        handle_search_input(state, key.code);
                        false
                    }
                    InputMode::GenrePicker => {
                        handle_picker_input(state, key.code);
                        false
                    }
                    InputMode::Normal => handle_normal_input(state, key.code, key.modifiers),
                };
                if quit {
                    return Ok(());
                }
            }
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
    }
}

/// Handles key input while typing a search query.
fn handle_search_input(state: &mut BrowserState, key: KeyCode) {
    match key {
        KeyCode::Esc => state.cancel_search(),
        KeyCode::Enter => state.submit_search(),
        KeyCode::Backspace => {
            state.search_input.pop();
        }
        KeyCode::Char(c) => state.search_input.push(c),
        _ => {}
    }
}

/// Handles key input while the genre picker is open.
fn handle_picker_input(state: &mut BrowserState, key: KeyCode) {
    match key {
        KeyCode::Esc | KeyCode::Backspace => state.close_genre_picker(),
        KeyCode::Enter => state.confirm_genre_picker(),
        KeyCode::Up | KeyCode::Char('k') => state.picker_move(false),
        KeyCode::Down | KeyCode::Char('j') => state.picker_move(true),
        _ => {}
    }
}

/// Handles key input in normal mode. Returns `true` to exit.
fn handle_normal_input(state: &mut BrowserState, key: KeyCode, modifiers: KeyModifiers) -> bool {
    state.notification = None;
    match key {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Backspace | KeyCode::Esc => {
            state.back();
        }
        KeyCode::Up | KeyCode::Char('k') => state.move_up(),
        KeyCode::Down | KeyCode::Char('j') => state.move_down(),
        KeyCode::Tab => state.cycle_focus(),
        KeyCode::Enter => state.activate(),
        KeyCode::Char('n') | KeyCode::Right => state.next_page(),
        KeyCode::Char('p') | KeyCode::Left => state.prev_page(),
        KeyCode::Char('/') => state.begin_search(),
        KeyCode::Char('c') => state.cycle_category(),
        KeyCode::Char('g') => state.open_genre_picker(),
        KeyCode::Char('r') => state.refresh(),
        KeyCode::Char('f') => state.toggle_membership(AccountList::Favorite),
        KeyCode::Char('w') => state.toggle_membership(AccountList::Watchlist),
        KeyCode::Char('i') => open_link(state, LinkKind::Imdb),
        KeyCode::Char('h') => open_link(state, LinkKind::Homepage),
        KeyCode::Char('t') => open_link(state, LinkKind::Trailer),
        _ => {}
    }
    false
}

/// Opens a link of the top screen in the system browser.
fn open_link(state: &mut BrowserState, kind: LinkKind) {
    let Some(url) = state.link(kind) else {
        state.notify("Nothing to open here");
        return;
    };
    if let Err(err) = open::that(&url) {
        tracing::warn!(url = %url, "failed to open browser: {err}");
        state.notify(format!("Could not open {url}"));
    }
}
