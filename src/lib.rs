//! Authenticated session layer for the Bufete portal API.
//!
//! ARCHITECTURE
//! ============
//! - [`credentials`]: persisted access/refresh token pair behind one lock.
//! - [`http`]: the shared [`ApiClient`]. Attaches the bearer token, renews
//!   it once on 401 through a single-flight refresh, replays the request.
//! - [`session`]: [`SessionController`] owns who is signed in and exposes
//!   login, logout, registration and account recovery.
//! - [`guard`]: decides whether a route may render for the current session.
//! - [`navigation`]: port for the navigation side effects above.
//!
//! Page-level code sees [`Outcome`] values, never raw transport errors.

pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod http;
pub mod navigation;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialPair, CredentialStore, FileStore, MemoryStore, SharedCredentials, StoreError};
pub use error::{ApiError, Failure, Outcome};
pub use guard::{GuardDecision, RouteGuard, post_login_destination, role_home};
pub use http::{ApiClient, HttpTransport, ReqwestTransport};
pub use navigation::{HistoryNavigator, Navigator};
pub use session::{Role, SessionController, SessionPhase, SessionState, User};
