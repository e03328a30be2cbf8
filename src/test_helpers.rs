//! Scripted transport and fixtures shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::http::{ApiRequest, ApiResponse, HttpTransport, REQUEST_ID_HEADER};
use crate::session::{Role, User};

type Handler = Arc<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

enum Scripted {
    Reply { delay: Option<Duration>, response: ApiResponse },
    Fail(ApiError),
}

/// One request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Option<Value>,
}

/// `HttpTransport` that answers from per-route scripts and records traffic.
///
/// Each route first drains its queue of one-shot replies, then falls back to
/// its handler, then answers 404.
#[derive(Default)]
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<Scripted>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    seen: Mutex<Vec<SeenRequest>>,
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &Method, path: &str, scripted: Scripted) {
        self.queues
            .lock()
            .expect("queue mutex should lock")
            .entry(route_key(method, path))
            .or_default()
            .push_back(scripted);
    }

    /// Queue a one-shot JSON reply.
    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        let response = ApiResponse::new(status, body.to_string());
        self.push(&method, path, Scripted::Reply { delay: None, response });
        self
    }

    /// Queue a one-shot JSON reply delivered after `delay`.
    pub fn reply_after(&self, delay: Duration, method: Method, path: &str, status: u16, body: Value) -> &Self {
        let response = ApiResponse::new(status, body.to_string());
        self.push(&method, path, Scripted::Reply { delay: Some(delay), response });
        self
    }

    /// Queue a one-shot transport failure.
    pub fn fail(&self, method: Method, path: &str, err: ApiError) -> &Self {
        self.push(&method, path, Scripted::Fail(err));
        self
    }

    /// Answer every request on a route through `handler` once its queue is empty.
    pub fn handle<F>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .expect("handler mutex should lock")
            .insert(route_key(&method, path), Arc::new(handler));
        self
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("seen mutex should lock").clone()
    }

    /// Requests seen on one route.
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<SeenRequest> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.seen
            .lock()
            .expect("seen mutex should lock")
            .push(SeenRequest {
                method: request.method.clone(),
                path: request.path.clone(),
                authorization: request.header("authorization").map(str::to_owned),
                request_id: request.header(REQUEST_ID_HEADER).map(str::to_owned),
                body: request.body.clone(),
            });

        let key = route_key(&request.method, &request.path);
        let next = self
            .queues
            .lock()
            .expect("queue mutex should lock")
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Reply { delay, response }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Scripted::Fail(err)) => Err(err),
            None => {
                let handler = self
                    .handlers
                    .lock()
                    .expect("handler mutex should lock")
                    .get(&key)
                    .cloned();
                Ok(match handler {
                    Some(handler) => handler(request),
                    None => ApiResponse::new(404, json!({ "error": format!("no script for {key}") }).to_string()),
                })
            }
        }
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// JSON body of a `/auth/me` style profile.
pub fn user_json(role: &str) -> Value {
    json!({
        "id": 7,
        "email": "a@b.com",
        "firstName": "Ana",
        "lastName": "Bermúdez",
        "role": role,
        "emailVerified": true,
    })
}

pub fn user(role: Role) -> User {
    serde_json::from_value(user_json(role.as_str())).expect("fixture user should deserialize")
}

/// Response for a route that accepts exactly one bearer token.
pub fn require_bearer(token: &'static str, ok_body: Value) -> impl Fn(&ApiRequest) -> ApiResponse {
    move |req| {
        if req.header("authorization") == Some(format!("Bearer {token}").as_str()) {
            ApiResponse::new(200, ok_body.to_string())
        } else {
            ApiResponse::new(401, json!({ "error": "Token expired" }).to_string())
        }
    }
}
