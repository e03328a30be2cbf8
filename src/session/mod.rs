//! Session state and the controller that owns it.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`SessionController`] is built at startup and handed to everything that
//! needs to know who is signed in. Route guards read [`SessionState`]; pages
//! call the controller's operations and render the [`crate::Outcome`] they get
//! back.

mod controller;
mod types;

pub use controller::SessionController;
pub use types::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserId};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub const ME_ENDPOINT: &str = "/auth/me";
pub const FORGOT_PASSWORD_ENDPOINT: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_ENDPOINT: &str = "/auth/reset-password";
/// Prefix; the verification token is appended as the last path segment.
pub const VERIFY_EMAIL_ENDPOINT: &str = "/auth/verify-email";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Unauthenticated,
    Authenticated,
}

/// In-memory session. `is_authenticated` is derived from `user`, so the two
/// can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True only until the startup bootstrap finishes.
    pub loading: bool,
}

impl SessionState {
    #[must_use]
    pub fn bootstrapping() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, loading: false }
    }

    #[must_use]
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user), loading: false }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Bootstrapping
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }
}
