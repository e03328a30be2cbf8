//! Session controller: bootstrap, login, logout and account recovery.
//!
//! ERROR HANDLING
//! ==============
//! Every operation catches pipeline errors locally and returns an
//! [`Outcome`]; nothing here panics or hands an `ApiError` to page code.
//! Logout has no failure case at all: its local cleanup runs from a drop
//! guard, so it happens even if the server call errors or the logout future
//! is dropped half way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Method;
use serde_json::json;
use tokio::sync::watch;

use super::types::{EmailRequest, LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest};
use super::{
    FORGOT_PASSWORD_ENDPOINT, LOGIN_ENDPOINT, LOGOUT_ENDPOINT, ME_ENDPOINT, REGISTER_ENDPOINT,
    RESET_PASSWORD_ENDPOINT, RegisterRequest, Role, SessionPhase, SessionState, User, VERIFY_EMAIL_ENDPOINT,
};
use crate::error::{Failure, Outcome};
use crate::http::ApiClient;
use crate::navigation;

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const FORGOT_PASSWORD_FAILED: &str = "Could not send the password recovery email";
const RESET_PASSWORD_FAILED: &str = "Could not reset the password";
const VERIFY_EMAIL_FAILED: &str = "Could not verify the email address";
const INVALID_LINK: &str = "The link is invalid or incomplete";

pub struct SessionController {
    client: ApiClient,
    state: Arc<watch::Sender<SessionState>>,
    bootstrapped: AtomicBool,
}

impl SessionController {
    /// Build the controller in the bootstrapping state.
    ///
    /// Registers with `client` so a failed token refresh anywhere in the app
    /// signs the session out.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(SessionState::bootstrapping());
        let state = Arc::new(tx);

        let sink = Arc::clone(&state);
        client.on_session_expired(Arc::new(move || {
            sink.send_modify(|s| s.user = None);
        }));

        Self { client, state, bootstrapped: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// True when signed in with one of `roles`.
    #[must_use]
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.state
            .borrow()
            .role()
            .is_some_and(|role| roles.contains(&role))
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    /// Restore the session from stored credentials. Runs once; later calls
    /// return the current phase without touching the network.
    pub async fn bootstrap(&self) -> SessionPhase {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return self.phase();
        }

        if self.client.credentials().access_token().is_none() {
            tracing::debug!("no stored access token; starting signed out");
            self.state.send_replace(SessionState::signed_out());
            return SessionPhase::Unauthenticated;
        }

        match self.client.get_json::<User>(ME_ENDPOINT).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                self.state.send_replace(SessionState::signed_in(user));
            }
            Err(e) => {
                tracing::info!(error = %e, "stored session rejected; starting signed out");
                self.clear_credentials();
                self.state.send_replace(SessionState::signed_out());
            }
        }
        self.phase()
    }

    // =========================================================================
    // LOGIN / REGISTER / LOGOUT
    // =========================================================================

    /// Sign in and persist the returned token pair.
    ///
    /// # Errors
    ///
    /// Returns the server's error message, or a generic one.
    pub async fn login(&self, email: &str, password: &str) -> Outcome<User> {
        let body = LoginRequest { email, password };
        let response: LoginResponse = self
            .client
            .post_anonymous(LOGIN_ENDPOINT, &body)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "login rejected");
                Failure::from_api(&e, LOGIN_FAILED)
            })?;

        if let Err(e) = self.client.credentials().set(&response.credentials()) {
            tracing::warn!(error = %e, "could not persist credentials after login");
            return Err(Failure::new(LOGIN_FAILED));
        }

        let user = response.user;
        tracing::info!(user_id = %user.id, role = %user.role, "signed in");
        self.state.send_replace(SessionState::signed_in(user.clone()));
        Ok(user)
    }

    /// Create an account. Does not sign in: the address must be verified first.
    ///
    /// # Errors
    ///
    /// Returns the server's message plus any field-level `details` it sent.
    pub async fn register(&self, form: &RegisterRequest) -> Outcome<String> {
        self.client
            .post_anonymous::<_, MessageResponse>(REGISTER_ENDPOINT, form)
            .await
            .map(|r| r.message)
            .map_err(|e| Failure::from_api(&e, REGISTER_FAILED))
    }

    /// Sign out. The server call is best effort; local cleanup always happens.
    pub async fn logout(&self) {
        let _cleanup = LocalSignOut { controller: self };

        let Some(refresh_token) = self.client.credentials().refresh_token() else {
            return;
        };
        let body = json!({ "refreshToken": refresh_token });
        if let Err(e) = self
            .client
            .send(Method::POST, LOGOUT_ENDPOINT, Some(body))
            .await
        {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
    }

    fn sign_out_locally(&self) {
        self.clear_credentials();
        self.state.send_replace(SessionState::signed_out());
        navigation::force_login(self.client.navigator());
        tracing::info!("signed out");
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.client.credentials().clear() {
            tracing::warn!(error = %e, "failed to clear stored credentials");
        }
    }

    // =========================================================================
    // ACCOUNT RECOVERY
    // =========================================================================

    /// Ask the server to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns the server's error message, or a generic one.
    pub async fn forgot_password(&self, email: &str) -> Outcome<String> {
        self.client
            .post_anonymous::<_, MessageResponse>(FORGOT_PASSWORD_ENDPOINT, &EmailRequest { email })
            .await
            .map(|r| r.message)
            .map_err(|e| Failure::from_api(&e, FORGOT_PASSWORD_FAILED))
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Returns the server's error message, or a generic one.
    pub async fn reset_password(&self, token: &str, password: &str) -> Outcome<String> {
        if !is_link_token(token) {
            return Err(Failure::new(INVALID_LINK));
        }
        self.client
            .post_anonymous::<_, MessageResponse>(RESET_PASSWORD_ENDPOINT, &ResetPasswordRequest { token, password })
            .await
            .map(|r| r.message)
            .map_err(|e| Failure::from_api(&e, RESET_PASSWORD_FAILED))
    }

    /// Confirm an email address using the token from a verification link.
    ///
    /// # Errors
    ///
    /// Returns the server's error message, or a generic one.
    pub async fn verify_email(&self, token: &str) -> Outcome<String> {
        if !is_link_token(token) {
            return Err(Failure::new(INVALID_LINK));
        }
        let path = format!("{VERIFY_EMAIL_ENDPOINT}/{token}");
        self.client
            .get_anonymous::<MessageResponse>(&path)
            .await
            .map(|r| r.message)
            .map_err(|e| Failure::from_api(&e, VERIFY_EMAIL_FAILED))
    }
}

/// Tokens from emailed links must be safe to drop into a URL path segment.
fn is_link_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Runs local sign-out when dropped.
struct LocalSignOut<'a> {
    controller: &'a SessionController,
}

impl Drop for LocalSignOut<'_> {
    fn drop(&mut self) {
        self.controller.sign_out_locally();
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
