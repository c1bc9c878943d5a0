//! Debounced search with dependent pagination.
//!
//! The patient list couples a search box to a pager: the raw input changes
//! on every keystroke, the committed term only after the trailing debounce
//! delay, and every commit resets the pager to page 1 so a new search
//! never starts on a page that no longer exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use medquery::{DebounceState, DebouncedValue};
use tokio::sync::watch;
use tracing::debug;

/// Search input, debounce and page state for one listing view.
///
/// Cloning shares the same state. Writes must happen inside a Tokio
/// runtime (the debounce timer is a spawned task).
#[derive(Clone)]
pub struct SearchCoordinator {
    input: DebouncedValue,
    page: Arc<AtomicU32>,
}

impl SearchCoordinator {
    /// Creates an idle coordinator on page 1 with the given debounce delay.
    pub fn new(delay: Duration) -> Self {
        let input = DebouncedValue::new(delay);
        let page = Arc::new(AtomicU32::new(1));
        let on_commit = Arc::clone(&page);
        input.on_commit(move |term| {
            debug!(term, "search committed, resetting to page 1");
            on_commit.store(1, Ordering::SeqCst);
        });
        SearchCoordinator { input, page }
    }

    /// Records a keystroke and restarts the debounce timer.
    pub fn type_ahead(&self, raw: impl Into<String>) {
        self.input.set(raw);
    }

    /// The raw input as currently typed.
    pub fn input(&self) -> String {
        self.input.raw()
    }

    /// The committed search term, `None` while nothing non-empty has been
    /// committed. This is what query keys are built from.
    pub fn search_term(&self) -> Option<String> {
        let committed = self.input.committed();
        (!committed.is_empty()).then_some(committed)
    }

    /// Phase of the debounce state machine.
    pub fn state(&self) -> DebounceState {
        self.input.state()
    }

    /// The current 1-based page.
    pub fn page(&self) -> u32 {
        self.page.load(Ordering::SeqCst)
    }

    /// Moves the pager. Pages are 1-based; 0 is clamped to 1.
    pub fn set_page(&self, page: u32) {
        self.page.store(page.max(1), Ordering::SeqCst);
    }

    /// Registers a callback invoked synchronously on every commit, after
    /// the page reset.
    pub fn on_commit<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.input.on_commit(listener);
    }

    /// Returns a channel receiving every committed term.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.input.subscribe()
    }
}

impl std::fmt::Debug for SearchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCoordinator")
            .field("input", &self.input)
            .field("page", &self.page())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn commit_resets_page_to_one() {
        let search = SearchCoordinator::new(Duration::from_millis(500));
        search.set_page(4);
        assert_eq!(search.page(), 4);

        search.type_ahead("ada");
        tokio::time::sleep(Duration::from_millis(501)).await;

        assert_eq!(search.search_term().as_deref(), Some("ada"));
        assert_eq!(search.page(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_input_does_not_touch_page_or_term() {
        let search = SearchCoordinator::new(Duration::from_millis(500));
        search.set_page(3);
        search.type_ahead("a");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(search.state(), DebounceState::Pending);
        assert_eq!(search.search_term(), None);
        assert_eq!(search.page(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_committed_input_means_no_term() {
        let search = SearchCoordinator::new(Duration::from_millis(500));
        search.type_ahead("ada");
        tokio::time::sleep(Duration::from_millis(501)).await;
        search.type_ahead("");
        tokio::time::sleep(Duration::from_millis(501)).await;

        assert_eq!(search.search_term(), None);
    }

    #[test]
    fn page_zero_clamps_to_one() {
        let search = SearchCoordinator::new(Duration::from_millis(500));
        search.set_page(0);
        assert_eq!(search.page(), 1);
    }
}
