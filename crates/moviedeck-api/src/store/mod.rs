//! Application state store.
//!
//! Holds the two shared slices (selection and session) behind an injectable,
//! cloneable handle. Readers either snapshot a slice or watch it for changes.

mod selection;
mod session;

use std::sync::Arc;

use tokio::sync::watch;

pub use selection::{Category, GenreOrCategory, Selection, SelectionAction, SelectionState};
pub use session::{SessionAction, UserSession};

/// Shared handle to the application state.
#[derive(Debug, Clone)]
pub struct AppStore {
    /// Selection slice.
    selection: Arc<watch::Sender<SelectionState>>,
    /// Session slice.
    session: Arc<watch::Sender<Option<UserSession>>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AppStore {
    /// Creates a store with no selection and the given session.
    #[must_use]
    pub fn new(session: Option<UserSession>) -> Self {
        let (selection, _) = watch::channel(SelectionState::default());
        let (session, _) = watch::channel(session);
        Self {
            selection: Arc::new(selection),
            session: Arc::new(session),
        }
    }

    /// Applies a selection action.
    pub fn dispatch_selection(&self, action: SelectionAction) {
        tracing::debug!(?action, "selection action");
        self.selection
            .send_modify(|current| *current = std::mem::take(current).reduce(action));
    }

    /// Applies a session action.
    pub fn dispatch_session(&self, action: SessionAction) {
        match action {
            SessionAction::SetUser(user) => {
                tracing::debug!(account_id = user.account_id, "session set");
                self.session.send_replace(Some(user));
            }
            SessionAction::ClearUser => {
                tracing::debug!("session cleared");
                self.session.send_replace(None);
            }
        }
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection.borrow().selection()
    }

    /// Current session, if signed in.
    #[must_use]
    pub fn session(&self) -> Option<UserSession> {
        self.session.borrow().clone()
    }

    /// Receiver notified on every selection change.
    #[must_use]
    pub fn watch_selection(&self) -> watch::Receiver<SelectionState> {
        self.selection.subscribe()
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn watch_session(&self) -> watch::Receiver<Option<UserSession>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        // Arrange & Act
        let store = AppStore::default();

        // Assert
        assert_eq!(store.selection(), Selection::NoSelection);
        assert!(store.session().is_none());
    }

    #[test]
    fn test_dispatch_selection_is_visible_through_clones() {
        // Arrange
        let store = AppStore::default();
        let other = store.clone();

        // Act
        store.dispatch_selection(SelectionAction::SelectGenreOrCategory(
            GenreOrCategory::Category(Category::Upcoming),
        ));

        // Assert
        assert_eq!(other.selection(), Selection::Category(Category::Upcoming));
    }

    #[test]
    fn test_cleared_search_falls_back_to_genre() {
        // Arrange
        let store = AppStore::default();
        store.dispatch_selection(SelectionAction::SelectGenreOrCategory(
            GenreOrCategory::Genre(28),
        ));
        store.dispatch_selection(SelectionAction::SetSearchQuery(String::from("x")));

        // Act
        store.dispatch_selection(SelectionAction::SetSearchQuery(String::new()));

        // Assert
        assert_eq!(store.selection(), Selection::Genre(28));
    }

    #[test]
    fn test_set_and_clear_user() {
        // Arrange
        let store = AppStore::default();

        // Act
        store.dispatch_session(SessionAction::SetUser(UserSession::new(7, "abc")));
        let signed_in = store.session();
        store.dispatch_session(SessionAction::ClearUser);

        // Assert
        assert_eq!(signed_in.unwrap().account_id, 7);
        assert!(store.session().is_none());
    }

    #[tokio::test]
    async fn test_watch_selection_notifies_change() {
        // Arrange
        let store = AppStore::default();
        let mut rx = store.watch_selection();

        // Act
        store.dispatch_selection(SelectionAction::SetSearchQuery(String::from("dune")));
        rx.changed().await.unwrap();

        // Assert
        assert_eq!(rx.borrow().selection(), Selection::Search(String::from("dune")));
    }
}
