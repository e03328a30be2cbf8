//! Single-flight token refresh.
//!
//! ARCHITECTURE
//! ============
//! Every request that hits a 401 at roughly the same time asks the
//! coordinator for fresh credentials. The first caller starts the refresh
//! call; later callers join the same in-flight future instead of firing their
//! own. The outcome, including its side effects (store write, or store clear
//! plus redirect to login), happens once and is shared by every waiter.
//!
//! The refresh call goes straight to the transport and never through
//! `ApiClient`, so a 401 from the refresh endpoint cannot re-enter the
//! response hook.
//!
//! Both outcomes are written with a compare-and-set against the refresh token
//! that was exchanged. If the controller logged out or signed in someone else
//! while the call was in flight, the new pair is discarded and the new session
//! is left untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Method;
use serde_json::json;

use super::transport::{ApiRequest, HttpTransport};
use crate::credentials::{CredentialPair, SharedCredentials};
use crate::error::ApiError;
use crate::navigation::{self, Navigator};

/// Refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Callback run once each time a refresh fails and the session is dropped.
pub type ExpiryListener = Arc<dyn Fn() + Send + Sync>;

type RefreshFlight = Shared<BoxFuture<'static, Result<CredentialPair, ApiError>>>;

pub(crate) struct RefreshCoordinator {
    transport: Arc<dyn HttpTransport>,
    credentials: SharedCredentials,
    navigator: Arc<dyn Navigator>,
    listeners: Arc<Mutex<Vec<ExpiryListener>>>,
    inflight: Mutex<Option<(u64, RefreshFlight)>>,
    flights: AtomicU64,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: SharedCredentials,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            credentials,
            navigator,
            listeners: Arc::new(Mutex::new(Vec::new())),
            inflight: Mutex::new(None),
            flights: AtomicU64::new(0),
        }
    }

    pub(crate) fn add_expiry_listener(&self, listener: ExpiryListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of refresh calls started so far.
    pub(crate) fn flights_started(&self) -> u64 {
        self.flights.load(Ordering::Relaxed)
    }

    /// Exchange `refresh_token` for a new pair, joining any refresh already in flight.
    pub(crate) async fn refresh(&self, refresh_token: String) -> Result<CredentialPair, ApiError> {
        let (id, flight) = self.join_or_start(refresh_token);
        let result = flight.await;
        self.finish(id);
        result
    }

    fn join_or_start(&self, refresh_token: String) -> (u64, RefreshFlight) {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, flight)) = slot.as_ref() {
            tracing::debug!(flight = id, "joining in-flight token refresh");
            return (*id, flight.clone());
        }

        let id = self.flights.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(flight = id, "starting token refresh");
        let flight = run_refresh(
            Arc::clone(&self.transport),
            self.credentials.clone(),
            Arc::clone(&self.navigator),
            Arc::clone(&self.listeners),
            refresh_token,
        )
        .boxed()
        .shared();
        *slot = Some((id, flight.clone()));
        (id, flight)
    }

    fn finish(&self, id: u64) {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
    }
}

async fn run_refresh(
    transport: Arc<dyn HttpTransport>,
    credentials: SharedCredentials,
    navigator: Arc<dyn Navigator>,
    listeners: Arc<Mutex<Vec<ExpiryListener>>>,
    refresh_token: String,
) -> Result<CredentialPair, ApiError> {
    let err = match exchange(transport.as_ref(), &refresh_token).await {
        Ok(pair) => match credentials.replace_if_current(&refresh_token, &pair) {
            Ok(true) => {
                tracing::info!("access token refreshed");
                return Ok(pair);
            }
            Ok(false) => {
                tracing::info!("session changed during token refresh; discarding refreshed pair");
                return Err(ApiError::SessionChanged);
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not store refreshed credentials");
                ApiError::from(e)
            }
        },
        Err(err) => err,
    };

    match credentials.clear_if_current(&refresh_token) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(error = %err, "token refresh failed for a session that is already gone");
            return Err(err);
        }
        Err(e) => tracing::warn!(error = %e, "failed to clear credentials after refresh failure"),
    }

    tracing::warn!(error = %err, "token refresh failed; dropping session");
    let listeners = listeners
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for listener in listeners {
        listener();
    }
    navigation::force_login(navigator.as_ref());
    Err(err)
}

async fn exchange(transport: &dyn HttpTransport, refresh_token: &str) -> Result<CredentialPair, ApiError> {
    let request = ApiRequest::new(Method::POST, REFRESH_PATH, Some(json!({ "refreshToken": refresh_token })));
    let response = transport.send(&request).await?;
    if !response.is_success() {
        return Err(response.into_error());
    }
    response.json::<CredentialPair>()
}
