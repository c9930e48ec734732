//! Keystroke-driven state machine of the search box.
//!
//! The controller never sleeps. It records a deadline when a keystroke arms
//! the debounce timer and the driver calls [`InputController::on_timer`]
//! once that instant has passed. Re-arming replaces the deadline, so at most
//! one search is ever pending.

use crate::config::WidgetConfig;
use crate::render::{ResultsView, SEARCH_ERROR, SEARCH_UNAVAILABLE};
use crate::widget::SearchSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq)]
pub enum InputState {
    Idle,
    Debouncing { query: String, deadline: Instant },
    Searching,
    ResultsShown,
    ResultsHidden,
}

/// Keys the controller distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

/// What the host page should do after a keydown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the browser handle the key
    Ignored,
    /// Suppress the default action (form submission)
    Suppressed,
    /// Suppress the default action and go to this URL
    Navigate(String),
}

/// Where a pointer interaction landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Input,
    Results,
    Outside,
}

pub struct InputController {
    session: Option<Arc<SearchSession>>,
    state: InputState,
    view: ResultsView,
    debounce: Duration,
    max_results: usize,
    dispatched: usize,
    last_query: Option<String>,
}

impl InputController {
    pub fn new(session: Arc<SearchSession>, config: &WidgetConfig) -> Self {
        Self {
            session: Some(session),
            state: InputState::Idle,
            view: ResultsView::default(),
            debounce: config.debounce,
            max_results: config.max_results,
            dispatched: 0,
            last_query: None,
        }
    }

    /// Controller for a widget whose initialization failed: it shows the
    /// unavailable placeholder and ignores every event.
    pub fn unavailable(config: &WidgetConfig) -> Self {
        let mut view = ResultsView::default();
        view.show_message(SEARCH_UNAVAILABLE);
        Self {
            session: None,
            state: InputState::Idle,
            view,
            debounce: config.debounce,
            max_results: config.max_results,
            dispatched: 0,
            last_query: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.session.is_some()
    }

    /// The input's value changed
    pub fn on_input(&mut self, value: &str, now: Instant) {
        if self.session.is_none() {
            return;
        }

        let query = value.trim();
        if query.is_empty() {
            self.view.clear();
            self.state = InputState::ResultsHidden;
            return;
        }

        let deadline = now + self.debounce;
        debug!(query, "debounce timer armed");
        self.state = InputState::Debouncing {
            query: query.to_string(),
            deadline,
        };
    }

    /// When the pending search should run, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            InputState::Debouncing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Run the pending search if its deadline has passed. Returns whether a
    /// search was dispatched.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        let query = match &self.state {
            InputState::Debouncing { query, deadline } if now >= *deadline => query.clone(),
            _ => return false,
        };
        let Some(session) = self.session.clone() else {
            return false;
        };

        self.state = InputState::Searching;
        self.dispatched += 1;
        debug!(query = %query, "search dispatched");

        match session.index().search(&query) {
            Ok(mut hits) => {
                hits.truncate(self.max_results);
                self.view.render(&hits, session.corpus());
            }
            Err(e) => {
                error!(query = %query, error = %e, "search error");
                self.view.show_message(SEARCH_ERROR);
            }
        }

        self.last_query = Some(query);
        self.state = if self.view.is_visible() {
            InputState::ResultsShown
        } else {
            InputState::ResultsHidden
        };
        true
    }

    pub fn on_key(&mut self, key: Key) -> KeyOutcome {
        if self.session.is_none() || key != Key::Enter {
            return KeyOutcome::Ignored;
        }
        match (&self.state, self.view.first_link()) {
            (InputState::ResultsShown, Some(href)) => KeyOutcome::Navigate(href.to_string()),
            _ => KeyOutcome::Suppressed,
        }
    }

    pub fn on_pointer(&mut self, target: PointerTarget) {
        if self.session.is_none() || target != PointerTarget::Outside {
            return;
        }
        self.view.hide();
        // A pending search still runs; only a visible list is dismissed.
        if !matches!(self.state, InputState::Debouncing { .. }) {
            self.state = InputState::ResultsHidden;
        }
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn view(&self) -> &ResultsView {
        &self.view
    }

    /// Number of searches run so far
    pub fn searches_dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }
}
