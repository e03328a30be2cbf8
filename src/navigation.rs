//! Navigation port.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session layer has navigation side effects: an unrecoverable 401 sends
//! the user to the login screen, and logout always lands there. Those effects
//! go through [`Navigator`] so the same logic drives a browser history, a
//! terminal front end, or a test recorder.

use std::sync::{Mutex, PoisonError};

/// Path of the login screen.
pub const LOGIN_PATH: &str = "/login";
/// Path of the public home page.
pub const PUBLIC_HOME: &str = "/";

pub trait Navigator: Send + Sync {
    /// Location currently displayed (path plus optional query).
    fn current_path(&self) -> String;

    /// Replace the current location with `path`.
    fn navigate(&self, path: &str);
}

/// Strip query string and fragment from a location.
#[must_use]
pub fn path_of(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or(location)
}

/// Send the user to the login screen unless they are already on it.
pub fn force_login(navigator: &dyn Navigator) {
    let current = navigator.current_path();
    if path_of(&current) == LOGIN_PATH {
        tracing::debug!("already on login screen; not navigating");
        return;
    }
    tracing::info!(from = %current, "navigating to login");
    navigator.navigate(LOGIN_PATH);
}

// =============================================================================
// HISTORY NAVIGATOR
// =============================================================================

/// Navigator that records every navigation in order.
#[derive(Debug)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    #[must_use]
    pub fn starting_at(path: &str) -> Self {
        Self { entries: Mutex::new(vec![path.to_owned()]) }
    }

    /// Every location visited, oldest first, including the starting one.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::starting_at(PUBLIC_HOME)
    }
}

impl Navigator for HistoryNavigator {
    fn current_path(&self) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| PUBLIC_HOME.to_owned())
    }

    fn navigate(&self, path: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
    }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
