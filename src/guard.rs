//! Navigation-time route gate.
//!
//! DESIGN
//! ======
//! [`RouteGuard::check`] is a pure function of the session snapshot and the
//! requested location, so every rule is testable without a navigator. Role
//! mismatches are a silent redirect to the role's home, never an error screen.
//! An unauthenticated visit remembers where it was headed so login can send
//! the user back there.

use crate::navigation::{LOGIN_PATH, Navigator, PUBLIC_HOME, path_of};
use crate::session::{Role, SessionState, User};

/// Home of the back office (admins and lawyers).
pub const ADMIN_HOME: &str = "/admin";
/// Home of the client self-service portal.
pub const PORTAL_HOME: &str = "/portal";

/// What the router should do with a requested location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still bootstrapping; show a placeholder and decide later.
    Loading,
    /// Render the requested screen.
    Allow,
    /// Go to `to` instead. `from` is the location to return to after login.
    Redirect { to: String, from: Option<String> },
}

/// Gate for one route. An empty allow-list admits any signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    allowed: Vec<Role>,
}

impl RouteGuard {
    /// Any authenticated principal.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Only principals whose role is in `roles`.
    #[must_use]
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self { allowed: roles.into_iter().collect() }
    }

    #[must_use]
    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    #[must_use]
    pub fn check(&self, state: &SessionState, requested: &str) -> GuardDecision {
        if state.loading {
            return GuardDecision::Loading;
        }
        let Some(user) = state.user.as_ref() else {
            return GuardDecision::Redirect { to: LOGIN_PATH.to_owned(), from: Some(requested.to_owned()) };
        };
        if self.allowed.is_empty() || self.allowed.contains(&user.role) {
            return GuardDecision::Allow;
        }
        tracing::debug!(role = %user.role, requested, "role not allowed; redirecting home");
        GuardDecision::Redirect { to: role_home(user.role).to_owned(), from: None }
    }

    /// Check the navigator's current location and follow any redirect.
    pub fn enforce(&self, state: &SessionState, navigator: &dyn Navigator) -> GuardDecision {
        let decision = self.check(state, &navigator.current_path());
        if let GuardDecision::Redirect { to, .. } = &decision {
            navigator.navigate(to);
        }
        decision
    }
}

/// Default landing page for a role.
#[must_use]
pub fn role_home(role: Role) -> &'static str {
    match role {
        Role::Admin | Role::Lawyer => ADMIN_HOME,
        Role::Client => PORTAL_HOME,
        Role::Unrecognized => PUBLIC_HOME,
    }
}

/// Where to go right after a successful login.
///
/// The remembered location wins when it is a same-site path other than the
/// login screen itself; anything else (absolute URLs, `//host` references,
/// empty strings) falls back to the role's home.
#[must_use]
pub fn post_login_destination(user: &User, remembered: Option<&str>) -> String {
    remembered
        .filter(|loc| is_same_site(loc) && path_of(loc) != LOGIN_PATH)
        .map_or_else(|| role_home(user.role).to_owned(), str::to_owned)
}

fn is_same_site(location: &str) -> bool {
    location.starts_with('/') && !location.starts_with("//") && !location.starts_with("/\\")
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
