//! TUI rendering logic for the movie browser.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use super::state::{
    ActorScreen, BrowserState, DetailFocus, DetailScreen, GenrePicker, InputMode, MoviesScreen,
    Screen,
};
use super::view::{self, ListView};
use moviedeck_api::query::QueryState;
use moviedeck_api::tmdb::{AccountList, MovieSummary};

/// Placeholder shown while a query is in flight.
const LOADING: &str = "Loading...";

/// Draws the browser UI.
#[allow(clippy::indexing_slicing)]
pub fn draw(frame: &mut Frame, state: &BrowserState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(5),    // main content
            Constraint::Length(3), // footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], state);
    match state.top() {
        Some(Screen::Movies(screen)) => draw_movies(frame, chunks[1], screen),
        Some(Screen::Detail(screen)) => draw_detail(frame, chunks[1], screen),
        Some(Screen::Actor(screen)) => draw_actor(frame, chunks[1], screen),
        None => {}
    }
    draw_footer(frame, chunks[2], state);

    if let Some(picker) = state.genre_picker.as_ref() {
        draw_genre_picker(frame, chunks[1], picker);
    }
}

/// Draws the header with the search input and current selection.
#[allow(clippy::indexing_slicing)]
fn draw_header(frame: &mut Frame, area: Rect, state: &BrowserState) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let search_style = if state.input_mode == InputMode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let search = Paragraph::new(state.search_input.as_str())
        .style(search_style)
        .block(Block::default().borders(Borders::ALL).title(" Search: / "));
    frame.render_widget(search, header_chunks[0]);

    let signed_in = if state.store().session().is_some() {
        "signed in"
    } else {
        "guest"
    };
    let selection = Paragraph::new(format!("{}  ({signed_in})", state.store().selection().label()))
        .block(Block::default().borders(Borders::ALL).title(" moviedeck "));
    frame.render_widget(selection, header_chunks[1]);
}

/// Renders a centered single message in `area`.
fn draw_message(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

/// Builds a selectable movie list item.
fn movie_item(movie: &MovieSummary) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::raw(view::movie_line(movie)),
        Span::styled(
            format!("  {}", view::rating_line(movie.vote_average)),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
}

/// Style of the highlighted row.
fn highlight() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Draws the movie list screen.
#[allow(clippy::indexing_slicing)]
fn draw_movies(frame: &mut Frame, area: Rect, screen: &MoviesScreen) {
    let title = format!(" {} ", screen.selection.label());
    let (featured, rest, page, total_pages) = match view::list_view(screen.list.state()) {
        ListView::Loading => return draw_message(frame, area, &title, LOADING),
        ListView::Failed => return draw_message(frame, area, &title, view::RETRY_HINT),
        ListView::Empty => return draw_message(frame, area, &title, view::NO_MOVIES),
        ListView::Ready {
            featured,
            rest,
            page,
            total_pages,
        } => (featured, rest, page, total_pages),
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let featured_lines = vec![
        Line::from(Span::styled(
            view::movie_line(featured),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(featured.overview.clone().unwrap_or_default()),
    ];
    let featured_style = if screen.cursor == 0 {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let featured_block = Paragraph::new(featured_lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Featured ")
                .border_style(featured_style),
        );
    frame.render_widget(featured_block, chunks[0]);

    let items: Vec<ListItem> = rest.iter().map(movie_item).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            "{title}- page {} ",
            view::page_indicator(page, total_pages)
        )))
        .highlight_style(highlight());
    let mut list_state = ListState::default().with_selected(screen.cursor.checked_sub(1));
    frame.render_stateful_widget(list, chunks[1], &mut list_state);
}

/// Label for a membership flag.
fn membership_label(screen: &DetailScreen, list: AccountList) -> String {
    let name = match list {
        AccountList::Favorite => "Favorite",
        AccountList::Watchlist => "Watchlist",
    };
    match screen.toggle(list) {
        _ if screen.is_pending(list) => format!("{name}: ..."),
        Some(toggle) if toggle.is_member() => format!("{name}: yes"),
        Some(_) => format!("{name}: no"),
        None => format!("{name}: -"),
    }
}

/// Draws the movie detail screen.
#[allow(clippy::indexing_slicing)]
fn draw_detail(frame: &mut Frame, area: Rect, screen: &DetailScreen) {
    let details = match screen.details.state() {
        QueryState::Loading => return draw_message(frame, area, " Movie ", LOADING),
        QueryState::Error(_) => return draw_message(frame, area, " Movie ", view::SOMETHING_WRONG),
        QueryState::Success(details) => details,
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut lines = vec![
        Line::from(Span::styled(
            view::title_line(details),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(details.tagline.clone().unwrap_or_default()),
        Line::from(format!(
            "{}   {}",
            view::rating_line(details.vote_average),
            view::runtime_language_line(details)
        )),
        Line::from(format!(
            "{}   {}",
            membership_label(screen, AccountList::Favorite),
            membership_label(screen, AccountList::Watchlist)
        )),
        Line::from(""),
    ];
    let genre_spans: Vec<Span> = details
        .genres
        .iter()
        .enumerate()
        .map(|(i, genre)| {
            let style = if screen.focus == DetailFocus::Genres && i == screen.cursor {
                highlight()
            } else {
                Style::default().fg(Color::Yellow)
            };
            Span::styled(format!("[{}] ", genre.name), style)
        })
        .collect();
    lines.push(Line::from(genre_spans));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Overview",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(details.overview.clone().unwrap_or_default()));

    let info = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Movie "));
    frame.render_widget(info, chunks[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(3)])
        .split(chunks[1]);

    let cast_items: Vec<ListItem> = match screen.cast.state() {
        QueryState::Success(credits) => view::top_cast(&credits.cast)
            .into_iter()
            .map(|member| {
                ListItem::new(format!(
                    "{} as {}",
                    member.name,
                    member.character.as_deref().unwrap_or("-")
                ))
            })
            .collect(),
        QueryState::Loading => vec![ListItem::new(LOADING)],
        QueryState::Error(_) => Vec::new(),
    };
    draw_section(
        frame,
        side[0],
        " Top Cast ",
        cast_items,
        (screen.focus == DetailFocus::Cast).then_some(screen.cursor),
    );

    let recommendation_items: Vec<ListItem> = match screen.recommendations.state() {
        QueryState::Success(page) if !page.results.is_empty() => {
            page.results.iter().map(movie_item).collect()
        }
        QueryState::Loading => vec![ListItem::new(LOADING)],
        QueryState::Success(_) | QueryState::Error(_) => vec![ListItem::new(view::NOTHING_FOUND)],
    };
    draw_section(
        frame,
        side[1],
        " You May Also Like ",
        recommendation_items,
        (screen.focus == DetailFocus::Recommendations).then_some(screen.cursor),
    );
}

/// Draws a titled list with an optional highlighted row.
fn draw_section(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem>,
    selected: Option<usize>,
) {
    let border_style = if selected.is_some() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border_style),
        )
        .highlight_style(highlight());
    let mut list_state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Draws the actor screen.
#[allow(clippy::indexing_slicing)]
fn draw_actor(frame: &mut Frame, area: Rect, screen: &ActorScreen) {
    let person = match screen.person.state() {
        QueryState::Loading => return draw_message(frame, area, " Actor ", LOADING),
        QueryState::Error(_) => return draw_message(frame, area, " Actor ", view::SOMETHING_WRONG),
        QueryState::Success(person) => person,
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let lines = vec![
        Line::from(Span::styled(
            person.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(view::born_line(person)),
        Line::from(""),
        Line::from(view::biography(person)),
    ];
    let info = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Actor "));
    frame.render_widget(info, chunks[0]);

    let (items, title) = match screen.movies.state() {
        QueryState::Success(page) => (
            page.results.iter().map(movie_item).collect(),
            format!(
                " Movies - page {} ",
                view::page_indicator(page.page, page.total_pages)
            ),
        ),
        QueryState::Loading => (vec![ListItem::new(LOADING)], String::from(" Movies ")),
        QueryState::Error(_) => (Vec::new(), String::from(" Movies ")),
    };
    draw_section(frame, chunks[1], &title, items, Some(screen.cursor));
}

/// Draws the genre/category picker over the main area.
fn draw_genre_picker(frame: &mut Frame, area: Rect, picker: &GenrePicker) {
    let popup = Rect {
        x: area.x.saturating_add(area.width / 4),
        y: area.y,
        width: area.width / 2,
        height: area.height,
    };
    let items: Vec<ListItem> = picker
        .entries()
        .into_iter()
        .map(|(_, label)| ListItem::new(label))
        .collect();
    frame.render_widget(Clear, popup);
    draw_section(frame, popup, " Genres & Categories ", items, Some(picker.cursor));
}

/// Draws the footer with key hints or the latest notification.
fn draw_footer(frame: &mut Frame, area: Rect, state: &BrowserState) {
    let help_text = if let Some(message) = state.notification.as_deref() {
        Line::from(Span::styled(message, Style::default().fg(Color::Yellow)))
    } else {
        match (state.input_mode, state.top()) {
            (InputMode::Search, _) => Line::from("Type to search | Esc: cancel | Enter: apply"),
            (InputMode::GenrePicker, _) => {
                Line::from("\u{2191}\u{2193}: move  Enter: select  Esc: close")
            }
            (InputMode::Normal, Some(Screen::Detail(_))) => Line::from(
                "Tab: section  \u{2191}\u{2193}: move  Enter: open  f: favorite  w: watchlist  i: IMDB  h: homepage  t: trailer  Bksp: back  q: quit",
            ),
            (InputMode::Normal, Some(Screen::Actor(_))) => Line::from(
                "\u{2191}\u{2193}: move  n/p: page  Enter: open  i: IMDB  Bksp: back  q: quit",
            ),
            (InputMode::Normal, _) => Line::from(
                "\u{2191}\u{2193}: move  n/p: page  /: search  c: category  g: genres  Enter: open  r: reload  q: quit",
            ),
        }
    };

    let footer = Paragraph::new(help_text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}
